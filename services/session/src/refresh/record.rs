use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted state of one issued refresh token.
///
/// `used` flips to `true` at most once and never back. Expiry is implicit:
/// the record is never rewritten when `expires_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_id: String,
    pub hashed_secret: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token_id: String, hashed_secret: String, expires_at: DateTime<Utc>) -> Self {
        RefreshTokenRecord {
            token_id,
            hashed_secret,
            used: false,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of the atomic consume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkUsed {
    /// This call flipped `used` from false to true
    Consumed,
    /// The record was already consumed
    AlreadyUsed,
    /// No record with that id
    NotFound,
}
