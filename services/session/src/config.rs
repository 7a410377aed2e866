//! Centralized configuration for the Session Service.
//!
//! All configuration is loaded from environment variables (optionally seeded
//! from a `.env` file) and validated at startup. The signing key and TTLs are
//! read-only for the life of the process.

use crate::error::SessionError;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// HMAC algorithm used for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
}

impl JwtAlgorithm {
    /// Algorithm name for the JWT header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl FromStr for JwtAlgorithm {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            _ => Err(SessionError::config(format!("Invalid JWT algorithm: {s}"))),
        }
    }
}

/// How the opaque refresh secret is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    /// Independent random bytes per token
    Random,
    /// Keyed HMAC over the token id and refresh TTL
    Derived,
}

impl FromStr for SecretMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "derived" => Ok(Self::Derived),
            _ => Err(SessionError::config(format!("Invalid REFRESH_SECRET_MODE: {s}"))),
        }
    }
}

/// Refresh ledger backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Process-local map
    Memory,
    /// PostgreSQL table `refresh_tokens`
    Postgres {
        /// Connection URL
        url: String,
    },
    /// Redis hashes keyed by token id
    Redis {
        /// Connection URL
        url: String,
    },
}

/// Anomaly notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierKind {
    /// Emit a warning through tracing only
    Log,
    /// POST a JSON message to a webhook
    Webhook {
        /// Target URL
        url: url::Url,
    },
}

/// Argon2id cost parameters for refresh secret digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Access token signing key.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Borrow the raw key bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {}])", self.0.len())
    }
}

/// Session Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
    /// Upper bound for graceful shutdown
    pub shutdown_timeout: Duration,

    // Token settings
    /// Access token signing key
    pub signing_secret: SigningSecret,
    /// Access token signing algorithm
    pub jwt_algorithm: JwtAlgorithm,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh token TTL
    pub refresh_token_ttl: Duration,
    /// Refresh secret source
    pub secret_mode: SecretMode,
    /// Argon2id cost
    pub hash_cost: HashCost,

    // Collaborators
    /// Refresh ledger backend
    pub ledger: LedgerBackend,
    /// Insert the demo identities at startup
    pub seed_demo_users: bool,
    /// Anomaly notification channel
    pub notifier: NotifierKind,
    /// Sender address used in notifications
    pub notify_from: String,
}

impl Config {
    /// Configuration with defaults and the given signing secret.
    #[must_use]
    pub fn new(signing_secret: SigningSecret) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            trust_forwarded_for: false,
            shutdown_timeout: Duration::from_secs(10),
            signing_secret,
            jwt_algorithm: JwtAlgorithm::HS512,
            access_token_ttl: Duration::from_secs(60 * 60 * 24),
            refresh_token_ttl: Duration::from_secs(60 * 60 * 24 * 30),
            secret_mode: SecretMode::Random,
            hash_cost: HashCost::default(),
            ledger: LedgerBackend::Memory,
            seed_demo_users: true,
            notifier: NotifierKind::Log,
            notify_from: "security@localhost".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, SessionError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = match lookup("SESSION_SIGNING_SECRET") {
            Some(secret) if !secret.is_empty() => SigningSecret::new(secret.into_bytes()),
            Some(_) => return Err(SessionError::config("SESSION_SIGNING_SECRET must not be empty")),
            None => {
                tracing::warn!("SESSION_SIGNING_SECRET not set, using an ephemeral random key");
                random_signing_secret()
            }
        };

        let mut config = Self::new(signing_secret);

        config.host = lookup("HOST").unwrap_or(config.host);
        config.port = parse_var(&lookup, "PORT", config.port)?;
        config.trust_forwarded_for = parse_var(&lookup, "TRUST_FORWARDED_FOR", false)?;
        config.shutdown_timeout = Duration::from_secs(parse_var(&lookup, "SHUTDOWN_TIMEOUT", 10)?);

        if let Some(alg) = lookup("JWT_ALGORITHM") {
            config.jwt_algorithm = alg.parse()?;
        }
        config.access_token_ttl = Duration::from_secs(parse_var(&lookup, "ACCESS_TOKEN_TTL", 86_400)?);
        config.refresh_token_ttl = Duration::from_secs(parse_var(&lookup, "REFRESH_TOKEN_TTL", 2_592_000)?);
        if let Some(mode) = lookup("REFRESH_SECRET_MODE") {
            config.secret_mode = mode.parse()?;
        }

        let defaults = HashCost::default();
        config.hash_cost = HashCost {
            memory_kib: parse_var(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_var(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_var(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
        };

        config.ledger = match lookup("LEDGER_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => LedgerBackend::Memory,
            "postgres" => LedgerBackend::Postgres {
                url: required(&lookup, "DATABASE_URL")?,
            },
            "redis" => LedgerBackend::Redis {
                url: required(&lookup, "REDIS_URL")?,
            },
            other => return Err(SessionError::config(format!("Invalid LEDGER_BACKEND: {other}"))),
        };
        config.seed_demo_users = parse_var(&lookup, "SEED_DEMO_USERS", true)?;

        config.notifier = match lookup("NOTIFIER")
            .unwrap_or_else(|| "log".to_string())
            .to_lowercase()
            .as_str()
        {
            "log" => NotifierKind::Log,
            "webhook" => {
                let raw = required(&lookup, "NOTIFY_WEBHOOK_URL")?;
                let url = raw
                    .parse()
                    .map_err(|e| SessionError::config(format!("Invalid NOTIFY_WEBHOOK_URL: {e}")))?;
                NotifierKind::Webhook { url }
            }
            other => return Err(SessionError::config(format!("Invalid NOTIFIER: {other}"))),
        };
        config.notify_from = lookup("NOTIFY_FROM").unwrap_or(config.notify_from);

        Ok(config)
    }

    /// Set the access token TTL.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set the refresh token TTL.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the refresh secret source.
    #[must_use]
    pub const fn with_secret_mode(mut self, mode: SecretMode) -> Self {
        self.secret_mode = mode;
        self
    }

    /// Set the signing algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.jwt_algorithm = algorithm;
        self
    }

    /// Set the Argon2id cost.
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Listen address in `host:port` form.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, SessionError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| SessionError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, SessionError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SessionError::config(format!("{name} is required")))
}

fn random_signing_secret() -> SigningSecret {
    use rand::RngCore;
    let mut key = vec![0u8; 64];
    rand::thread_rng().fill_bytes(&mut key);
    SigningSecret::new(key)
}
