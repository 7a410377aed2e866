//! One-way hashing of refresh secrets.
//!
//! Digests are Argon2id PHC strings with a per-secret random salt, so a leaked
//! ledger does not yield usable refresh tokens without an offline attack
//! against an intentionally slow function.

use crate::config::HashCost;
use crate::error::SessionError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Outcome of comparing a presented secret with a stored digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Secret hashes to the digest
    Match,
    /// Secret does not hash to the digest
    Mismatch,
}

/// Salted adaptive hasher for opaque secrets.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher with the given Argon2id cost.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parameters are out of range.
    pub fn new(cost: HashCost) -> Result<Self, SessionError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| SessionError::config(format!("Invalid hash parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a secret into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns an internal error if hashing fails.
    pub fn hash(&self, secret: &str) -> Result<String, SessionError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| SessionError::internal(format!("Hashing failed: {e}")))
    }

    /// Compare a secret with a stored digest.
    ///
    /// The digest's own embedded parameters are used, so digests written with
    /// an older cost keep verifying after the cost is raised.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the stored digest cannot be parsed.
    pub fn verify(&self, secret: &str, digest: &str) -> Result<Verification, SessionError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| SessionError::internal(format!("Stored digest unreadable: {e}")))?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(Verification::Match),
            Err(argon2::password_hash::Error::Password) => Ok(Verification::Mismatch),
            Err(e) => Err(SessionError::internal(format!("Verification failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> CredentialHasher {
        CredentialHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_verify_match() {
        let hasher = cheap();
        let digest = hasher.hash("refresh-secret").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert_eq!(hasher.verify("refresh-secret", &digest).unwrap(), Verification::Match);
    }

    #[test]
    fn test_mismatch_is_not_an_error() {
        let hasher = cheap();
        let digest = hasher.hash("refresh-secret").unwrap();
        assert_eq!(hasher.verify("refresh-secreT", &digest).unwrap(), Verification::Mismatch);
        assert_eq!(hasher.verify("refresh-secret1", &digest).unwrap(), Verification::Mismatch);
    }

    #[test]
    fn test_salted_digests_differ() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_corrupt_digest_is_internal_error() {
        let hasher = cheap();
        assert!(matches!(
            hasher.verify("secret", "not-a-phc-string"),
            Err(SessionError::Internal(_))
        ));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let result = CredentialHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
