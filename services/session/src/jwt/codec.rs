use crate::config::{JwtAlgorithm, SigningSecret};
use crate::error::SessionError;
use crate::jwt::claims::AccessClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// Signs and verifies access tokens with a single fixed HMAC algorithm.
///
/// Verification only accepts tokens whose header names the configured
/// algorithm; anything else is rejected before the signature is checked.
pub struct AccessTokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    /// Create a codec for `algorithm` keyed with `secret`.
    #[must_use]
    pub fn new(algorithm: JwtAlgorithm, secret: &SigningSecret) -> Self {
        let algorithm = match algorithm {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        AccessTokenCodec {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
            validation,
        }
    }

    /// Sign claims into a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns an internal error if encoding fails.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, SessionError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| SessionError::internal(format!("JWT encoding failed: {e}")))
    }

    /// Verify a compact JWT and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Invalid` for a foreign algorithm, bad signature,
    /// malformed structure or an `exp` that is not in the future.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, SessionError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "access token expired",
                ErrorKind::InvalidAlgorithm => "unexpected signing algorithm",
                ErrorKind::InvalidSignature => "signature mismatch",
                _ => "malformed access token",
            };
            SessionError::invalid(reason)
        })?;

        if data.claims.is_expired_at(chrono::Utc::now().timestamp()) {
            return Err(SessionError::invalid("access token expired"));
        }

        Ok(data.claims)
    }
}
