//! Announcement service.

use std::sync::Arc;

use asrama_common::{AppError, AppResult};
use asrama_db::entities::announcement;
use asrama_db::entities::notification::NotificationType;
use asrama_db::{AnnouncementStore, NewAnnouncement};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::notification::{NotificationDraft, NotificationService};

/// Input for a new announcement.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnnouncementInput {
    #[validate(length(min = 3, max = 256, message = "Judul minimal 3 karakter"))]
    pub title: String,

    #[validate(length(min = 10, message = "Isi pengumuman minimal 10 karakter"))]
    pub content: String,
}

/// Announcements broadcast by managers to every student.
#[derive(Clone)]
pub struct AnnouncementService {
    store: Arc<dyn AnnouncementStore>,
    notifications: NotificationService,
}

impl AnnouncementService {
    /// Create a new announcement service.
    #[must_use]
    pub fn new(store: Arc<dyn AnnouncementStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Publish an announcement and notify all students.
    pub async fn create(
        &self,
        manager_id: i32,
        input: CreateAnnouncementInput,
    ) -> AppResult<announcement::Model> {
        let input = CreateAnnouncementInput {
            title: input.title.trim().to_string(),
            content: input.content.trim().to_string(),
        };
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let announcement = self
            .store
            .create(NewAnnouncement {
                manager_id,
                title: input.title,
                content: input.content,
                created_at: Utc::now(),
            })
            .await?;

        let report = self
            .notifications
            .notify_students(&NotificationDraft::new(
                NotificationType::Announcement,
                format!("Pengumuman: {}", announcement.title),
                excerpt(&announcement.content),
                announcement.id,
            ))
            .await;

        info!(
            announcement_id = announcement.id,
            manager_id,
            recipients = report.delivered.len(),
            failed = report.failed.len(),
            "Announcement published"
        );

        Ok(announcement)
    }

    /// Get an announcement by id.
    pub async fn get(&self, id: i32) -> AppResult<announcement::Model> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pengumuman tidak ditemukan".to_string()))
    }

    /// All announcements, newest first.
    pub async fn list(&self) -> AppResult<Vec<announcement::Model>> {
        self.store.list().await
    }

    /// Delete an announcement together with the notifications it produced.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let removed = self.store.delete_with_notifications(id).await?;
        info!(announcement_id = id, notifications_removed = removed, "Announcement deleted");
        Ok(())
    }
}

/// Notification body: the first 100 characters of the content.
fn excerpt(content: &str) -> String {
    const MAX_CHARS: usize = 100;
    if content.chars().count() <= MAX_CHARS {
        return content.to_string();
    }
    let mut short: String = content.chars().take(MAX_CHARS).collect();
    short.push_str("...");
    short
}
