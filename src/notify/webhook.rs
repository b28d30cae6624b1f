//! Webhook notifier
//!
//! Every notification is POSTed as JSON to a single endpoint which takes
//! care of rendering and delivering the actual email.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Posts notifications to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("a11y-crawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            "Delivered {} notification for scan {}",
            notification.kind,
            notification.payload.scan_id
        );
        Ok(())
    }
}
