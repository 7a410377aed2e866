//! Process-local ledger for development and tests.

use super::RefreshLedger;
use crate::error::SessionError;
use crate::refresh::{MarkUsed, RefreshTokenRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Ledger backed by a mutex-guarded map.
///
/// The lock is never held across an await point, so `mark_used` is a single
/// critical section.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshLedger for MemoryLedger {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), SessionError> {
        match self.records.lock().entry(record.token_id.clone()) {
            Entry::Occupied(_) => Err(SessionError::storage(format!(
                "duplicate refresh token id {}",
                record.token_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshTokenRecord>, SessionError> {
        Ok(self.records.lock().get(token_id).cloned())
    }

    async fn mark_used(&self, token_id: &str) -> Result<MarkUsed, SessionError> {
        let mut records = self.records.lock();
        Ok(match records.get_mut(token_id) {
            None => MarkUsed::NotFound,
            Some(record) if record.used => MarkUsed::AlreadyUsed,
            Some(record) => {
                record.used = true;
                MarkUsed::Consumed
            }
        })
    }
}
