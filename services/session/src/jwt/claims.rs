use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Signed access token payload.
///
/// Binds an identity to the network address that requested the pair and to
/// the refresh ledger entry (`jti`) minted alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Identity the pair was issued for
    pub sub: Uuid,
    /// Address the pair was issued to
    pub ip: String,
    /// Refresh ledger token id
    pub jti: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl AccessClaims {
    /// Claims issued at `now` and valid for `ttl`.
    #[must_use]
    pub fn new(identity: Uuid, remote_address: &str, token_id: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp();
        AccessClaims {
            sub: identity,
            ip: remote_address.to_string(),
            jti: token_id.to_string(),
            iat,
            exp: iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    pub fn is_expired_at(&self, timestamp: i64) -> bool {
        timestamp >= self.exp
    }
}
