//! Identity directory used to resolve notification contacts.

pub mod memory;
pub mod postgres;

use crate::error::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use memory::MemoryDirectory;
pub use postgres::PostgresDirectory;

/// Identity id seeded on startup so the service is usable out of the box.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0xbb05_4e96_8735_413b_8214_848b_f0e6_7ee2);

/// A known identity and its contact address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

impl User {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, SessionError>;

    /// Insert a user unless one with the same id exists.
    async fn insert_if_absent(&self, user: &User) -> Result<(), SessionError>;
}

/// The fixed demo user plus one with a fresh random id.
#[must_use]
pub fn demo_users() -> Vec<User> {
    vec![
        User::new(DEMO_USER_ID, "primary@example.com"),
        User::new(Uuid::new_v4(), "secondary@example.com"),
    ]
}

/// Seed [`demo_users`] into `directory`, skipping existing ids.
pub async fn seed_demo_users(directory: &dyn UserDirectory) -> Result<Vec<User>, SessionError> {
    let users = demo_users();
    for user in &users {
        directory.insert_if_absent(user).await?;
    }
    tracing::info!(count = users.len(), "Seeded demo users");
    Ok(users)
}
