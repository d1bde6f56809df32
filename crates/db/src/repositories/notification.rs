//! Notification repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    UpdateResult,
};

use crate::entities::{Notification, notification};
use crate::store::{NewNotification, NotificationStore};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, new: NewNotification) -> AppResult<notification::Model> {
        notification::ActiveModel {
            user_id: Set(new.user_id),
            title: Set(new.title),
            message: Set(new.message),
            notification_type: Set(new.notification_type),
            reference_id: Set(new.reference_id),
            is_read: Set(false),
            created_at: Set(new.created_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_since(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::CreatedAt.gte(since))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let result: UpdateResult = Notification::update_many()
            .col_expr(notification::Column::IsRead, true.into())
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result: UpdateResult = Notification::update_many()
            .col_expr(notification::Column::IsRead, true.into())
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: i32, user_id: i32, is_read: bool) -> notification::Model {
        notification::Model {
            id,
            user_id,
            title: "Pengajuan Bebas Asrama Baru".to_string(),
            message: "Ada pengajuan baru".to_string(),
            notification_type: NotificationType::Clearance,
            reference_id: Some("1".to_string()),
            is_read,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_notification() {
        let created = create_test_notification(1, 5, false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created.clone()]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .create(NewNotification {
                user_id: 5,
                title: created.title.clone(),
                message: created.message.clone(),
                notification_type: NotificationType::Clearance,
                reference_id: Some("1".to_string()),
                created_at: created.created_at,
            })
            .await
            .unwrap();

        assert_eq!(result, created);
    }

    #[tokio::test]
    async fn test_list_since() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_notification(2, 5, false),
                    create_test_notification(1, 5, true),
                ]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let results = repo
            .list_since(5, Utc::now() - chrono::Duration::days(7))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 2);
    }

    #[tokio::test]
    async fn test_mark_read_other_users_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert!(!repo.mark_read(1, 99).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert_eq!(repo.mark_all_read(5).await.unwrap(), 3);
    }
}
