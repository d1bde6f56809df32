//! Redis integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test --test redis_integration -- --ignored`
//!
//! Set `REDIS_URL` environment variable to point to your Redis instance.
//! Default: <redis://localhost:6379>

use std::sync::Arc;
use std::time::Duration;

use asrama_core::services::{NotificationEvent, RealtimeEvent, RealtimePublisher};
use asrama_db::entities::notification::NotificationType;
use asrama_realtime::RedisPubSub;

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

fn event(id: i32) -> RealtimeEvent {
    RealtimeEvent::Notification(NotificationEvent {
        id,
        title: "Pengumuman: Rapat".to_string(),
        message: "Rapat penghuni asrama".to_string(),
        notification_type: NotificationType::Announcement,
        reference_id: Some("1".to_string()),
        created_at: chrono::Utc::now(),
        read: false,
    })
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_redis_connection() {
    let pubsub = RedisPubSub::new(&get_redis_url(), "asrama-test").await;
    assert!(pubsub.is_ok(), "Failed to connect to Redis: {:?}", pubsub.err());
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_published_event_comes_back_locally() {
    let pubsub = Arc::new(
        RedisPubSub::new(&get_redis_url(), "asrama-test")
            .await
            .expect("Failed to connect to Redis"),
    );
    pubsub.start().await.expect("Failed to subscribe");
    let mut rx = pubsub.subscribe_local();

    // Give the subscription a moment to register
    tokio::time::sleep(Duration::from_millis(100)).await;
    pubsub.publish(7, &event(99)).await.expect("Failed to publish");

    let envelope = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Channel closed");
    assert_eq!(envelope.user_id, 7);
    let RealtimeEvent::Notification(notification) = envelope.event;
    assert_eq!(notification.id, 99);

    pubsub.shutdown().await.expect("Failed to shutdown");
}
