use super::{User, UserDirectory};
use crate::error::SessionError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// In-process user directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: RwLock::new(users),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, SessionError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn insert_if_absent(&self, user: &User) -> Result<(), SessionError> {
        self.users.write().entry(user.id).or_insert_with(|| user.clone());
        Ok(())
    }
}
