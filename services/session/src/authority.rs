//! Token authority: pair issuance, access verification and refresh rotation.

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::SessionError;
use crate::hasher::{CredentialHasher, Verification};
use crate::jwt::{AccessClaims, AccessTokenCodec};
use crate::metrics;
use crate::notify::{AnomalyNotifier, Notification};
use crate::refresh::{MarkUsed, RefreshSecretGenerator, RefreshTokenRecord};
use crate::storage::RefreshLedger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The only artifact handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims extracted from an access token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccess {
    pub token_id: String,
    pub identity: Uuid,
    pub bound_address: String,
}

impl From<AccessClaims> for VerifiedAccess {
    fn from(claims: AccessClaims) -> Self {
        Self {
            token_id: claims.jti,
            identity: claims.sub,
            bound_address: claims.ip,
        }
    }
}

/// Capability surface used by the HTTP layer.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Mint a fresh access/refresh pair bound to `remote_address`.
    async fn create_pair(&self, identity: Uuid, remote_address: &str) -> Result<SessionTokenPair, SessionError>;

    /// Exchange an unused refresh secret for a new pair.
    async fn refresh(
        &self,
        access: &VerifiedAccess,
        presented_secret: &str,
        remote_address: &str,
    ) -> Result<SessionTokenPair, SessionError>;

    /// Check signature, algorithm and expiry of an access token.
    ///
    /// An address mismatch is not a failure here.
    fn verify_access_token(&self, token: &str, remote_address: &str) -> Result<VerifiedAccess, SessionError>;
}

/// Default [`SessionManager`] backed by a [`RefreshLedger`].
pub struct TokenAuthority {
    codec: AccessTokenCodec,
    generator: RefreshSecretGenerator,
    hasher: CredentialHasher,
    ledger: Arc<dyn RefreshLedger>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn AnomalyNotifier>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenAuthority {
    /// Build an authority from configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the hash cost is out of range.
    pub fn new(
        config: &Config,
        ledger: Arc<dyn RefreshLedger>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn AnomalyNotifier>,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            codec: AccessTokenCodec::new(config.jwt_algorithm, &config.signing_secret),
            generator: RefreshSecretGenerator::new(config.secret_mode, &config.signing_secret),
            hasher: CredentialHasher::new(config.hash_cost)?,
            ledger,
            directory,
            notifier,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        })
    }

    async fn hash_secret(&self, secret: String) -> Result<String, SessionError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| SessionError::internal(format!("hash task failed: {e}")))?
    }

    async fn verify_secret(&self, secret: &str, digest: String) -> Result<Verification, SessionError> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &digest))
            .await
            .map_err(|e| SessionError::internal(format!("verify task failed: {e}")))?
    }

    async fn mint(&self, identity: Uuid, remote_address: &str) -> Result<SessionTokenPair, SessionError> {
        let now = Utc::now();
        let token_id = RefreshSecretGenerator::generate_token_id();
        let secret = self.generator.generate(&token_id, self.refresh_ttl);
        let hashed_secret = self.hash_secret(secret.clone()).await?;

        let record = RefreshTokenRecord::new(token_id.clone(), hashed_secret, expiry_after(now, self.refresh_ttl));
        self.ledger.create(&record).await?;

        let claims = AccessClaims::new(identity, remote_address, &token_id, now, self.access_ttl);
        let access_token = self.codec.sign(&claims)?;

        Ok(SessionTokenPair {
            access_token,
            refresh_token: secret,
        })
    }

    async fn rotate(
        &self,
        access: &VerifiedAccess,
        presented_secret: &str,
        remote_address: &str,
    ) -> Result<SessionTokenPair, SessionError> {
        let record = self
            .ledger
            .lookup(&access.token_id)
            .await?
            .ok_or_else(|| SessionError::invalid("unknown refresh token"))?;

        if record.is_expired_at(Utc::now()) {
            warn!(token_id = %access.token_id, identity = %access.identity, "Expired refresh token presented");
            return Err(SessionError::Expired);
        }

        if self.verify_secret(presented_secret, record.hashed_secret).await? == Verification::Mismatch {
            return Err(SessionError::invalid("refresh secret mismatch"));
        }

        match self.ledger.mark_used(&access.token_id).await? {
            MarkUsed::Consumed => {}
            MarkUsed::AlreadyUsed => {
                warn!(
                    token_id = %access.token_id,
                    identity = %access.identity,
                    remote_address = %remote_address,
                    "Refresh token reuse detected"
                );
                metrics::record_security_event("refresh_reuse");
                return Err(SessionError::AlreadyUsed);
            }
            MarkUsed::NotFound => return Err(SessionError::invalid("unknown refresh token")),
        }

        // The old entry is consumed from here on; any failure leaves it unreplaced.
        let pair = self.mint(access.identity, remote_address).await.map_err(|e| {
            error!(
                token_id = %access.token_id,
                identity = %access.identity,
                error = %e,
                "Refresh token consumed but replacement pair was not issued"
            );
            match e {
                SessionError::Storage(_) => e,
                other => SessionError::storage(other.to_string()),
            }
        })?;

        if remote_address != access.bound_address {
            self.signal_address_change(access.identity, remote_address);
        }

        Ok(pair)
    }

    fn signal_address_change(&self, identity: Uuid, remote_address: &str) {
        warn!(
            identity = %identity,
            remote_address = %remote_address,
            "Refresh from an address other than the bound one"
        );
        metrics::record_security_event("address_change");

        let directory = Arc::clone(&self.directory);
        let notifier = Arc::clone(&self.notifier);
        let remote_address = remote_address.to_string();
        tokio::spawn(async move {
            let user = match directory.find_by_id(identity).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(identity = %identity, "No contact for anomaly notice");
                    metrics::record_notification("no_contact");
                    return;
                }
                Err(e) => {
                    warn!(identity = %identity, error = %e, "Contact lookup failed");
                    metrics::record_notification("failed");
                    return;
                }
            };

            let notice = Notification::address_change(user.email, &remote_address);
            match notifier.notify(&notice).await {
                Ok(()) => metrics::record_notification("sent"),
                Err(e) => {
                    warn!(identity = %identity, error = %e, "Anomaly notice delivery failed");
                    metrics::record_notification("failed");
                }
            }
        });
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl SessionManager for TokenAuthority {
    async fn create_pair(&self, identity: Uuid, remote_address: &str) -> Result<SessionTokenPair, SessionError> {
        let pair = self.mint(identity, remote_address).await?;
        metrics::record_pair_issued("issue");
        info!(identity = %identity, remote_address = %remote_address, "Issued session token pair");
        Ok(pair)
    }

    async fn refresh(
        &self,
        access: &VerifiedAccess,
        presented_secret: &str,
        remote_address: &str,
    ) -> Result<SessionTokenPair, SessionError> {
        match self.rotate(access, presented_secret, remote_address).await {
            Ok(pair) => {
                metrics::record_refresh("success");
                metrics::record_pair_issued("rotation");
                info!(
                    identity = %access.identity,
                    previous_token_id = %access.token_id,
                    "Rotated refresh token"
                );
                Ok(pair)
            }
            Err(e) => {
                metrics::record_refresh(e.code());
                if e.is_rejection() {
                    info!(token_id = %access.token_id, reason = %e.code(), "Refresh rejected");
                }
                Err(e)
            }
        }
    }

    fn verify_access_token(&self, token: &str, remote_address: &str) -> Result<VerifiedAccess, SessionError> {
        let access = VerifiedAccess::from(self.codec.verify(token)?);
        if access.bound_address != remote_address {
            debug!(
                token_id = %access.token_id,
                bound_address = %access.bound_address,
                remote_address = %remote_address,
                "Access token presented from a different address"
            );
        }
        Ok(access)
    }
}
