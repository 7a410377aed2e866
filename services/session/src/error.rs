//! Error taxonomy for the session token authority.

use thiserror::Error;

/// Errors produced while issuing, verifying or rotating session tokens.
///
/// `Invalid`, `Expired` and `AlreadyUsed` are kept apart for logs and metrics
/// but are surfaced to clients as one indistinguishable rejection.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown identity or ledger entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed, forged or mismatched token material
    #[error("Token invalid: {0}")]
    Invalid(String),

    /// Refresh token is past its expiry
    #[error("Refresh token expired")]
    Expired,

    /// Refresh token was already consumed - replay attempt
    #[error("Refresh token already used - replay detected")]
    AlreadyUsed,

    /// Backing store failed or is unreachable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Create an invalid-token error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Whether this is a validation failure of presented token material.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::Expired | Self::AlreadyUsed)
    }

    /// Stable code used in logs and metrics labels.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => SESSION_NOT_FOUND,
            Self::Invalid(_) => SESSION_TOKEN_INVALID,
            Self::Expired => SESSION_REFRESH_EXPIRED,
            Self::AlreadyUsed => SESSION_REFRESH_REUSED,
            Self::Storage(_) => SESSION_STORAGE_ERROR,
            Self::Config(_) => SESSION_CONFIG_ERROR,
            Self::Internal(_) => SESSION_INTERNAL_ERROR,
        }
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

// Error codes for logs and metrics
pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
pub const SESSION_TOKEN_INVALID: &str = "SESSION_TOKEN_INVALID";
pub const SESSION_REFRESH_EXPIRED: &str = "SESSION_REFRESH_EXPIRED";
pub const SESSION_REFRESH_REUSED: &str = "SESSION_REFRESH_REUSED";
pub const SESSION_STORAGE_ERROR: &str = "SESSION_STORAGE_ERROR";
pub const SESSION_CONFIG_ERROR: &str = "SESSION_CONFIG_ERROR";
pub const SESSION_INTERNAL_ERROR: &str = "SESSION_INTERNAL_ERROR";
