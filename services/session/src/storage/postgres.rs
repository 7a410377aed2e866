//! PostgreSQL refresh ledger.

use super::RefreshLedger;
use crate::error::SessionError;
use crate::refresh::{MarkUsed, RefreshTokenRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{Instrument, info_span};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS refresh_tokens (
    token_id TEXT PRIMARY KEY,
    hashed_secret TEXT NOT NULL,
    used BOOLEAN NOT NULL DEFAULT FALSE,
    expires_at TIMESTAMPTZ NOT NULL
)";

/// Ledger stored in the `refresh_tokens` table.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, SessionError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the table when missing.
    pub async fn migrate(&self) -> Result<(), SessionError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = CREATE_TABLE
        );
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshLedger for PostgresLedger {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), SessionError> {
        let query = "INSERT INTO refresh_tokens (token_id, hashed_secret, used, expires_at) VALUES ($1, $2, $3, $4)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&record.token_id)
            .bind(&record.hashed_secret)
            .bind(record.used)
            .bind(record.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshTokenRecord>, SessionError> {
        let query = "SELECT token_id, hashed_secret, used, expires_at FROM refresh_tokens WHERE token_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(RefreshTokenRecord {
            token_id: row.try_get("token_id")?,
            hashed_secret: row.try_get("hashed_secret")?,
            used: row.try_get("used")?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
        }))
    }

    async fn mark_used(&self, token_id: &str) -> Result<MarkUsed, SessionError> {
        let query = "UPDATE refresh_tokens SET used = TRUE WHERE token_id = $1 AND used = FALSE";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        if result.rows_affected() == 1 {
            return Ok(MarkUsed::Consumed);
        }

        // Lost the race or never existed; the update above already decided.
        let query = "SELECT EXISTS (SELECT 1 FROM refresh_tokens WHERE token_id = $1)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let exists: bool = sqlx::query_scalar(query)
            .bind(token_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(if exists {
            MarkUsed::AlreadyUsed
        } else {
            MarkUsed::NotFound
        })
    }
}
