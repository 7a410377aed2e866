//! Refresh token ledger.
//!
//! Every backend must implement [`RefreshLedger::mark_used`] as one atomic
//! conditional update guarded by `used = false`. That single step is what
//! makes refresh tokens single-use under concurrent presentation, across
//! threads and across process instances sharing the same store.

pub mod memory;
pub mod postgres;
pub mod redis;

use crate::error::SessionError;
use crate::refresh::{MarkUsed, RefreshTokenRecord};
use async_trait::async_trait;

pub use memory::MemoryLedger;
pub use postgres::PostgresLedger;
pub use self::redis::RedisLedger;

/// Storage contract for refresh token records.
#[async_trait]
pub trait RefreshLedger: Send + Sync {
    /// Persist a new record. A duplicate `token_id` is a storage error.
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), SessionError>;

    /// Fetch a record by id.
    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshTokenRecord>, SessionError>;

    /// Atomically flip `used` from false to true.
    async fn mark_used(&self, token_id: &str) -> Result<MarkUsed, SessionError>;
}
