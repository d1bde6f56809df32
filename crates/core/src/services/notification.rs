//! Notification service.
//!
//! Every workflow notifies through here: one row per recipient, then a
//! realtime push on the recipient's channel. Fan-out to many recipients is
//! best-effort and never fails the operation that triggered it.

use std::sync::Arc;

use asrama_common::{AppError, AppResult};
use asrama_db::entities::notification::{self, NotificationType};
use asrama_db::{DirectoryStore, NewNotification, NotificationStore};
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::services::realtime::{NotificationEvent, RealtimeEvent, RealtimePublisherService};

/// How far back the notification feed reaches.
const FEED_WINDOW_DAYS: i64 = 7;

/// Content of a notification, independent of its recipient.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub reference_id: Option<String>,
}

impl NotificationDraft {
    /// Draft referencing an entity by its numeric id.
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: i32,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            reference_id: Some(reference_id.to_string()),
        }
    }
}

/// Result of notifying several recipients.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Notifications persisted.
    pub delivered: Vec<notification::Model>,
    /// Recipients whose notification could not be stored.
    pub failed: Vec<(i32, AppError)>,
}

impl FanOutReport {
    /// Whether every recipient was notified.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A user's recent notifications split by read state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub unread: Vec<notification::Model>,
    pub read: Vec<notification::Model>,
    pub unread_count: usize,
    pub read_count: usize,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn DirectoryStore>,
    publisher: RealtimePublisherService,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn DirectoryStore>,
        publisher: RealtimePublisherService,
    ) -> Self {
        Self {
            store,
            directory,
            publisher,
        }
    }

    /// Persist a notification for one user and push it to their channel.
    ///
    /// Storage failures are returned; a failed push is only logged since the
    /// notification is already visible in the feed.
    pub async fn create_notification(
        &self,
        user_id: i32,
        draft: &NotificationDraft,
    ) -> AppResult<notification::Model> {
        let model = self
            .store
            .create(NewNotification {
                user_id,
                title: draft.title.clone(),
                message: draft.message.clone(),
                notification_type: draft.notification_type,
                reference_id: draft.reference_id.clone(),
                created_at: Utc::now(),
            })
            .await?;

        let event = RealtimeEvent::Notification(NotificationEvent::from(&model));
        if let Err(e) = self.publisher.publish(user_id, &event).await {
            warn!(
                error = %e,
                user_id,
                notification_id = model.id,
                "Failed to publish notification"
            );
        }

        debug!(
            user_id,
            notification_id = model.id,
            kind = draft.notification_type.as_str(),
            "Created notification"
        );
        Ok(model)
    }

    /// Notify several users concurrently. Failures are collected, not raised.
    pub async fn notify_many(&self, user_ids: &[i32], draft: &NotificationDraft) -> FanOutReport {
        let results = join_all(user_ids.iter().map(|&user_id| async move {
            (user_id, self.create_notification(user_id, draft).await)
        }))
        .await;

        let mut report = FanOutReport::default();
        for (user_id, result) in results {
            match result {
                Ok(model) => report.delivered.push(model),
                Err(e) => {
                    warn!(error = %e, user_id, "Failed to store notification");
                    report.failed.push((user_id, e));
                }
            }
        }
        report
    }

    /// Notify every manager account.
    pub async fn notify_managers(&self, draft: &NotificationDraft) -> FanOutReport {
        match self.directory.manager_user_ids().await {
            Ok(ids) => self.notify_many(&ids, draft).await,
            Err(e) => {
                warn!(error = %e, "Failed to load manager accounts for notification");
                FanOutReport::default()
            }
        }
    }

    /// Notify every student account.
    pub async fn notify_students(&self, draft: &NotificationDraft) -> FanOutReport {
        match self.directory.student_user_ids().await {
            Ok(ids) => self.notify_many(&ids, draft).await,
            Err(e) => {
                warn!(error = %e, "Failed to load student accounts for notification");
                FanOutReport::default()
            }
        }
    }

    /// Notify the account owning a student profile.
    pub async fn notify_student(&self, student_id: i32, draft: &NotificationDraft) -> FanOutReport {
        match self.directory.find_student(student_id).await {
            Ok(Some(student)) => self.notify_many(&[student.user.id], draft).await,
            Ok(None) => {
                warn!(student_id, "Student to notify no longer exists");
                FanOutReport::default()
            }
            Err(e) => {
                warn!(error = %e, student_id, "Failed to load student for notification");
                FanOutReport::default()
            }
        }
    }

    /// Notifications of the last seven days, split into unread and read.
    pub async fn get_for_user(&self, user_id: i32) -> AppResult<NotificationFeed> {
        let since = Utc::now() - Duration::days(FEED_WINDOW_DAYS);
        let (read, unread): (Vec<_>, Vec<_>) = self
            .store
            .list_since(user_id, since)
            .await?
            .into_iter()
            .partition(|n| n.is_read);

        Ok(NotificationFeed {
            unread_count: unread.len(),
            read_count: read.len(),
            unread,
            read,
        })
    }

    /// Mark one of the user's notifications read.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<()> {
        if self.store.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notifikasi tidak ditemukan".to_string()))
        }
    }

    /// Mark all of the user's notifications read.
    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        self.store.mark_all_read(user_id).await
    }
}
