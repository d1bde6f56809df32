//! Server-Sent Events for realtime notifications.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use asrama_common::AppResult;
use asrama_core::{RealtimeEvent, RealtimePublisher};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::{extractors::AuthUser, middleware::AppState};

/// Per-user broadcast channels for connected SSE clients.
#[derive(Clone, Default)]
pub struct SseBroadcaster {
    user_channels: Arc<RwLock<HashMap<i32, broadcast::Sender<RealtimeEvent>>>>,
}

impl SseBroadcaster {
    /// Create a new SSE broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a user-specific channel.
    pub async fn user_channel(&self, user_id: i32) -> broadcast::Sender<RealtimeEvent> {
        let mut channels = self.user_channels.write().await;

        if let Some(sender) = channels.get(&user_id)
            && sender.receiver_count() > 0
        {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(100);
        channels.insert(user_id, sender.clone());
        sender
    }

    /// Deliver an event to a user's open streams, if any.
    pub async fn broadcast_to_user(&self, user_id: i32, event: RealtimeEvent) {
        let channels = self.user_channels.read().await;
        if let Some(sender) = channels.get(&user_id)
            && sender.send(event).is_ok()
        {
            debug!(user_id, "Delivered SSE event");
        }
    }

    /// Clean up inactive user channels.
    pub async fn cleanup(&self) {
        let mut channels = self.user_channels.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

/// In-process delivery, used when no Redis backplane is configured.
#[async_trait]
impl RealtimePublisher for SseBroadcaster {
    async fn publish(&self, user_id: i32, event: &RealtimeEvent) -> AppResult<()> {
        self.broadcast_to_user(user_id, event.clone()).await;
        Ok(())
    }
}

fn to_sse(event: &RealtimeEvent) -> Event {
    let RealtimeEvent::Notification(data) = event;
    Event::default()
        .event(event.name())
        .json_data(data)
        .unwrap_or_else(|_| Event::default().data("error"))
}

/// The authenticated user's notification stream.
pub async fn notification_stream(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let sender = state.sse_broadcaster.user_channel(user.id).await;
    let rx = sender.subscribe();

    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok().map(|event| Ok(to_sse(&event))));

    let initial = stream::once(async { Ok(Event::default().event("connected").data("ok")) });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
