//! Announcement repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{Announcement, Notification, announcement, notification};
use crate::store::{AnnouncementStore, NewAnnouncement};

/// Announcement repository for database operations.
#[derive(Clone)]
pub struct AnnouncementRepository {
    db: Arc<DatabaseConnection>,
}

impl AnnouncementRepository {
    /// Create a new announcement repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnnouncementStore for AnnouncementRepository {
    async fn create(&self, new: NewAnnouncement) -> AppResult<announcement::Model> {
        announcement::ActiveModel {
            manager_id: Set(Some(new.manager_id)),
            title: Set(new.title),
            content: Set(new.content),
            created_at: Set(new.created_at),
            updated_at: Set(new.created_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<announcement::Model>> {
        Announcement::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self) -> AppResult<Vec<announcement::Model>> {
        Announcement::find()
            .order_by_desc(announcement::Column::CreatedAt)
            .order_by_desc(announcement::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_with_notifications(&self, id: i32) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = Notification::delete_many()
            .filter(
                notification::Column::NotificationType
                    .eq(notification::NotificationType::Announcement),
            )
            .filter(notification::Column::ReferenceId.eq(id.to_string()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = Announcement::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound("Pengumuman tidak ditemukan".to_string()));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(removed.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_announcement(id: i32, title: &str) -> announcement::Model {
        announcement::Model {
            id,
            manager_id: Some(1),
            title: title.to_string(),
            content: "Pemadaman listrik hari Sabtu".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_returns_announcements() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_announcement(2, "Kerja bakti"),
                    create_test_announcement(1, "Listrik padam"),
                ]])
                .into_connection(),
        );

        let repo = AnnouncementRepository::new(db);
        let results = repo.list().await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Kerja bakti");
    }

    #[tokio::test]
    async fn test_delete_with_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 12,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = AnnouncementRepository::new(db);
        assert_eq!(repo.delete_with_notifications(1).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_delete_missing_announcement_rolls_back() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = AnnouncementRepository::new(db);
        assert!(matches!(
            repo.delete_with_notifications(42).await,
            Err(AppError::NotFound(_))
        ));
    }
}
