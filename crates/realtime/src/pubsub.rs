//! Redis Pub/Sub for cross-instance event distribution.

use std::sync::Arc;

use asrama_common::{AppError, AppResult};
use asrama_core::services::{RealtimeEvent, RealtimePublisher};
use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Channel carrying one user's events: `{prefix}:user:{id}`.
#[must_use]
pub fn user_channel(prefix: &str, user_id: i32) -> String {
    format!("{prefix}:user:{user_id}")
}

/// Pattern matching every user channel under `prefix`.
#[must_use]
pub fn user_pattern(prefix: &str) -> String {
    format!("{prefix}:user:*")
}

/// Message body on a user channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEnvelope {
    pub user_id: i32,
    #[serde(flatten)]
    pub event: RealtimeEvent,
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    prefix: String,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<UserEnvelope>,
}

impl RedisPubSub {
    /// Connect both the publishing and the subscribing client.
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!(prefix, "Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            prefix: prefix.to_string(),
            local_tx,
        })
    }

    /// Subscribe to every user channel and start the receive loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        let pattern = user_pattern(&self.prefix);
        self.subscriber.psubscribe(pattern.as_str()).await?;

        info!(pattern, "Subscribed to user channels");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                let Some(payload) = message.value.as_string() else {
                    continue;
                };
                match serde_json::from_str::<UserEnvelope>(&payload) {
                    Ok(envelope) => {
                        debug!(
                            user_id = envelope.user_id,
                            event = envelope.event.name(),
                            "Received Pub/Sub event"
                        );
                        // No receivers just means nobody on this instance is listening
                        let _ = local_tx.send(envelope);
                    }
                    Err(e) => {
                        warn!(channel = ?message.channel, "Failed to parse Pub/Sub message: {}", e);
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event on the user's channel.
    pub async fn publish_to_user(
        &self,
        user_id: i32,
        event: &RealtimeEvent,
    ) -> Result<(), RedisError> {
        let envelope = UserEnvelope {
            user_id,
            event: event.clone(),
        };
        let payload = serde_json::to_string(&envelope).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let channel = user_channel(&self.prefix, user_id);
        let _: () = self.publisher.publish(channel.as_str(), payload).await?;
        debug!(channel, event = event.name(), "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for events received from Redis.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<UserEnvelope> {
        self.local_tx.subscribe()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

#[async_trait]
impl RealtimePublisher for RedisPubSub {
    async fn publish(&self, user_id: i32, event: &RealtimeEvent) -> AppResult<()> {
        self.publish_to_user(user_id, event)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}

/// Bridge between Redis Pub/Sub and the local SSE broadcaster.
pub struct PubSubSseBridge {
    pubsub: Arc<RedisPubSub>,
}

impl PubSubSseBridge {
    /// Create a new bridge.
    #[must_use]
    pub const fn new(pubsub: Arc<RedisPubSub>) -> Self {
        Self { pubsub }
    }

    /// Forward every event received from Redis to `on_event`.
    pub fn start<F>(&self, on_event: F)
    where
        F: Fn(UserEnvelope) + Send + Sync + 'static,
    {
        let rx = self.pubsub.subscribe_local();
        tokio::spawn(forward(rx, on_event));
    }
}

async fn forward<F>(mut rx: broadcast::Receiver<UserEnvelope>, on_event: F)
where
    F: Fn(UserEnvelope) + Send + Sync + 'static,
{
    loop {
        match rx.recv().await {
            Ok(envelope) => on_event(envelope),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("SSE bridge lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("SSE bridge channel closed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use asrama_core::services::NotificationEvent;
    use asrama_db::entities::notification::NotificationType;
    use std::sync::Mutex;

    fn event() -> RealtimeEvent {
        RealtimeEvent::Notification(NotificationEvent {
            id: 11,
            title: "Status Izin Keluar".to_string(),
            message: "Pengajuan izin keluar Anda disetujui".to_string(),
            notification_type: NotificationType::ExitPermit,
            reference_id: Some("4".to_string()),
            created_at: chrono::Utc::now(),
            read: false,
        })
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(user_channel("asrama", 42), "asrama:user:42");
        assert_eq!(user_pattern("asrama"), "asrama:user:*");
    }

    #[test]
    fn test_envelope_wire_format() {
        let envelope = UserEnvelope {
            user_id: 42,
            event: event(),
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["userId"], 42);
        assert_eq!(json["event"], "notification");
        assert_eq!(json["data"]["type"], "izin_keluar");

        let parsed: UserEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[tokio::test]
    async fn test_forward_delivers_until_closed() {
        let (tx, rx) = broadcast::channel(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let task = tokio::spawn(forward(rx, move |envelope: UserEnvelope| {
            sink.lock().unwrap().push(envelope.user_id);
        }));

        tx.send(UserEnvelope { user_id: 1, event: event() }).unwrap();
        tx.send(UserEnvelope { user_id: 2, event: event() }).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
