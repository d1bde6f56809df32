//! Realtime publisher.
//!
//! Workflows push events to users through this trait. The in-process SSE
//! broadcaster lives in the api crate and the Redis backplane in the
//! realtime crate.

use std::sync::Arc;

use asrama_common::AppResult;
use asrama_db::entities::notification::{self, NotificationType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload pushed when a notification is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: i32,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<&notification::Model> for NotificationEvent {
    fn from(model: &notification::Model) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            message: model.message.clone(),
            notification_type: model.notification_type,
            reference_id: model.reference_id.clone(),
            created_at: model.created_at,
            read: model.is_read,
        }
    }
}

/// Events delivered on a user's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A new notification for the user.
    Notification(NotificationEvent),
}

impl RealtimeEvent {
    /// Event name used on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
        }
    }
}

/// Trait for publishing events to a single user.
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Publish an event to the user's channel.
    async fn publish(&self, user_id: i32, event: &RealtimeEvent) -> AppResult<()>;
}

/// A no-op publisher for when realtime delivery is disabled.
#[derive(Clone, Default)]
pub struct NoOpRealtimePublisher;

#[async_trait]
impl RealtimePublisher for NoOpRealtimePublisher {
    async fn publish(&self, _user_id: i32, _event: &RealtimeEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Shared publisher handle.
pub type RealtimePublisherService = Arc<dyn RealtimePublisher>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = RealtimeEvent::Notification(NotificationEvent {
            id: 3,
            title: "Judul".to_string(),
            message: "Pesan".to_string(),
            notification_type: NotificationType::ExitPermit,
            reference_id: Some("8".to_string()),
            created_at: Utc::now(),
            read: false,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "notification");
        assert_eq!(json["data"]["type"], "izin_keluar");
        assert_eq!(json["data"]["referenceId"], "8");
        assert_eq!(json["data"]["read"], false);

        let back: RealtimeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
