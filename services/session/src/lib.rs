//! Session token authority.
//!
//! Issues access/refresh token pairs bound to the requesting address,
//! rotates refresh tokens exactly once, and raises an out-of-band notice
//! when a refresh arrives from an unexpected address.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod directory;
pub mod error;
pub mod hasher;
pub mod http;
pub mod jwt;
pub mod metrics;
pub mod notify;
pub mod refresh;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use authority::{SessionManager, SessionTokenPair, TokenAuthority, VerifiedAccess};
pub use config::Config;
pub use error::SessionError;
