use super::{User, UserDirectory};
use crate::error::SessionError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{Instrument, info_span};
use uuid::Uuid;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL
)";

/// User directory stored in the `users` table.
#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
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
impl UserDirectory for PostgresDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, SessionError> {
        let query = "SELECT id, email FROM users WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        match row {
            Some(row) => Ok(Some(User {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_if_absent(&self, user: &User) -> Result<(), SessionError> {
        let query = "INSERT INTO users (id, email) VALUES ($1, $2) ON CONFLICT DO NOTHING";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user.id)
            .bind(&user.email)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}
