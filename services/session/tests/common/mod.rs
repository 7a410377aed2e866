//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_common::PlatformError;
use session_service::config::{HashCost, SigningSecret};
use session_service::directory::{DEMO_USER_ID, MemoryDirectory, User};
use session_service::error::SessionError;
use session_service::notify::{AnomalyNotifier, Notification};
use session_service::refresh::{MarkUsed, RefreshTokenRecord};
use session_service::storage::{MemoryLedger, RefreshLedger};
use session_service::{Config, TokenAuthority};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEMO_EMAIL: &str = "owner@example.com";
pub const HOME: &str = "198.51.100.7";
pub const ELSEWHERE: &str = "203.0.113.99";

/// Fast Argon2 parameters so tests are not dominated by hashing.
pub fn cheap_config() -> Config {
    Config::new(SigningSecret::new(b"integration-test-signing-key".to_vec())).with_hash_cost(HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
}

/// Forwards every notice into a channel.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

#[async_trait]
impl AnomalyNotifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), PlatformError> {
        let _ = self.tx.send(notification.clone());
        Ok(())
    }
}

/// Always fails delivery.
pub struct BrokenNotifier;

#[async_trait]
impl AnomalyNotifier for BrokenNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), PlatformError> {
        Err(PlatformError::unavailable("relay down"))
    }
}

/// Memory ledger whose `create` can be switched to fail.
#[derive(Default)]
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    pub fail_creates: AtomicBool,
}

#[async_trait]
impl RefreshLedger for FlakyLedger {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), SessionError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(SessionError::storage("connection reset"));
        }
        self.inner.create(record).await
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshTokenRecord>, SessionError> {
        self.inner.lookup(token_id).await
    }

    async fn mark_used(&self, token_id: &str) -> Result<MarkUsed, SessionError> {
        self.inner.mark_used(token_id).await
    }
}

pub fn directory() -> Arc<MemoryDirectory> {
    Arc::new(MemoryDirectory::with_users([User::new(DEMO_USER_ID, DEMO_EMAIL)]))
}

pub struct Harness {
    pub authority: Arc<TokenAuthority>,
    pub ledger: Arc<MemoryLedger>,
    pub notices: mpsc::UnboundedReceiver<Notification>,
}

pub fn harness(config: &Config) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let (tx, notices) = mpsc::unbounded_channel();
    let authority = TokenAuthority::new(
        config,
        Arc::clone(&ledger) as Arc<dyn RefreshLedger>,
        directory(),
        Arc::new(RecordingNotifier { tx }),
    )
    .unwrap();

    Harness {
        authority: Arc::new(authority),
        ledger,
        notices,
    }
}

/// Wait briefly for a detached notification task.
pub async fn next_notice(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Option<Notification> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.ok().flatten()
}
