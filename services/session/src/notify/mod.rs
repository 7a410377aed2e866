//! Out-of-band delivery of refresh anomaly notices.
//!
//! Delivery is best effort. Callers run it detached from the request path
//! and only log failures.

pub mod webhook;

use async_trait::async_trait;
use rust_common::PlatformError;
use serde::Serialize;

pub use webhook::WebhookNotifier;

/// Subject line used for every anomaly notice.
pub const ANOMALY_SUBJECT: &str = "Your token was refreshed";

/// A message addressed to one identity's contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Notice sent when a refresh arrives from a different address than
    /// the one the access token was issued to.
    #[must_use]
    pub fn address_change(contact: impl Into<String>, remote_address: &str) -> Self {
        Self {
            to: contact.into(),
            subject: ANOMALY_SUBJECT.to_string(),
            body: format!("Someone tried to refresh your tokens from address {remote_address}"),
        }
    }
}

#[async_trait]
pub trait AnomalyNotifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), PlatformError>;
}

/// Writes notices to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AnomalyNotifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), PlatformError> {
        tracing::warn!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "anomaly notice (log only)"
        );
        Ok(())
    }
}
