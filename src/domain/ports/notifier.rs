//! Port for the push-notification channel.
//!
//! Notifications are fire-and-forget: delivery failures are logged by the
//! adapter and swallowed, never propagated to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of terminal event being pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Completed,
    Error,
}

/// One push to subscribers about a terminal generation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub task_id: Uuid,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn completed(task_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            kind: NotificationKind::Completed,
            task_id,
            payload,
        }
    }

    pub fn error(task_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            task_id,
            payload: serde_json::json!({ "error": reason.into() }),
        }
    }
}

/// Capability interface for pushing terminal events to subscribers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}
