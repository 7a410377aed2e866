use crate::config::{SecretMode, SigningSecret};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use ring::hmac;
use std::time::Duration;

/// Produces opaque refresh secrets.
///
/// In `Derived` mode the secret is `HMAC-SHA256(key, "<token_id>:<ttl_nanos>")`,
/// which is reproducible by anyone holding the signing key. `Random` mode
/// draws 32 fresh bytes per token.
pub struct RefreshSecretGenerator {
    mode: SecretMode,
    key: hmac::Key,
}

impl RefreshSecretGenerator {
    pub fn new(mode: SecretMode, secret: &SigningSecret) -> Self {
        RefreshSecretGenerator {
            mode,
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose()),
        }
    }

    pub fn generate(&self, token_id: &str, refresh_ttl: Duration) -> String {
        match self.mode {
            SecretMode::Random => {
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                URL_SAFE_NO_PAD.encode(bytes)
            }
            SecretMode::Derived => {
                let data = format!("{}:{}", token_id, refresh_ttl.as_nanos());
                let tag = hmac::sign(&self.key, data.as_bytes());
                URL_SAFE_NO_PAD.encode(tag.as_ref())
            }
        }
    }

    pub fn generate_token_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
