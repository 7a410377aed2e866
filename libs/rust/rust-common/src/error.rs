//! Error type for calls leaving the process.
//!
//! Services use [`PlatformError`] for everything that talks to a remote
//! endpoint (webhooks, HTTP collaborators). Each variant is classified as
//! retryable or not so [`crate::RetryPolicy`] can decide whether to try again.

use thiserror::Error;

/// Common error type for outbound platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Transport-level HTTP failure (connect, TLS, body)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote endpoint answered with a non-success status
    #[error("Remote endpoint rejected request with status {status}")]
    Rejected {
        /// HTTP status code returned by the endpoint
        status: u16,
    },

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Rate limit exceeded
    #[error("Rate limited")]
    RateLimited,

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// assert!(PlatformError::RateLimited.is_retryable());
    /// assert!(PlatformError::from_status(503).is_retryable());
    /// assert!(!PlatformError::from_status(400).is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::RateLimited | Self::Timeout(_) => true,
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Rejected { status } => *status >= 500,
            Self::Serialization(_) | Self::Internal(_) => false,
        }
    }

    /// Classify a non-success HTTP status code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            502..=504 => Self::Unavailable(format!("upstream returned {status}")),
            _ => Self::Rejected { status },
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
