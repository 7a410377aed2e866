use super::{AnomalyNotifier, Notification};
use async_trait::async_trait;
use reqwest::Client;
use rust_common::{HttpConfig, PlatformError, RetryPolicy, build_http_client};
use serde::Serialize;
use url::Url;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Delivers notices as a JSON POST to a mail relay or chat webhook.
///
/// 429 and every 5xx status are retried with backoff, as are transport
/// timeouts and refused connections. Other 4xx statuses fail immediately.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: Url,
    from: String,
    retry: RetryPolicy,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url, from: impl Into<String>, retry: RetryPolicy) -> Result<Self, PlatformError> {
        let client = build_http_client(&HttpConfig::default().with_user_agent(concat!(
            "session-service/",
            env!("CARGO_PKG_VERSION")
        )))?;

        Ok(Self {
            client,
            endpoint,
            from: from.into(),
            retry,
        })
    }

    async fn post_once(&self, notification: &Notification) -> Result<(), PlatformError> {
        let payload = WebhookPayload {
            from: &self.from,
            to: &notification.to,
            subject: &notification.subject,
            body: &notification.body,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PlatformError::from_status(status.as_u16()))
        }
    }
}

#[async_trait]
impl AnomalyNotifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), PlatformError> {
        let this = self;
        self.retry.execute(move || this.post_once(notification)).await
    }
}
