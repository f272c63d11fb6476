//! Notification adapters.
//!
//! Pushes are fire-and-forget: a failed delivery is logged and swallowed
//! so notification problems never fail the lifecycle operation that
//! triggered them.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::ports::{Notification, Notifier};

/// Notifier that POSTs events to a configured webhook URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: Notification) {
        match self.client.post(&self.url).json(&notification).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(task_id = %notification.task_id, "Notification delivered");
            }
            Ok(response) => {
                warn!(
                    task_id = %notification.task_id,
                    status = %response.status(),
                    "Notification endpoint rejected the push"
                );
            }
            Err(e) => {
                warn!(task_id = %notification.task_id, error = %e, "Notification failed");
            }
        }
    }
}

/// Notifier that drops everything; used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, notification: Notification) {
        debug!(task_id = %notification.task_id, kind = ?notification.kind, "Notification dropped (no channel configured)");
    }
}
