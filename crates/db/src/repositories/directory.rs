//! Student and manager directory repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::{Manager, Student, User, manager, user};
use crate::store::{DirectoryStore, StudentWithUser};

/// Read-only view over user, student and manager tables.
#[derive(Clone)]
pub struct DirectoryRepository {
    db: Arc<DatabaseConnection>,
}

impl DirectoryRepository {
    /// Create a new directory repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn user_ids_with_role(&self, role: user::UserRole) -> AppResult<Vec<i32>> {
        User::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::Role.eq(role))
            .order_by_asc(user::Column::Id)
            .into_tuple::<i32>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl DirectoryStore for DirectoryRepository {
    async fn find_student(&self, student_id: i32) -> AppResult<Option<StudentWithUser>> {
        let row = Student::find_by_id(student_id)
            .find_also_related(User)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.and_then(|(student, user)| user.map(|user| StudentWithUser { student, user })))
    }

    async fn find_manager(&self, manager_id: i32) -> AppResult<Option<manager::Model>> {
        Manager::find_by_id(manager_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn manager_user_ids(&self) -> AppResult<Vec<i32>> {
        self.user_ids_with_role(user::UserRole::Manager).await
    }

    async fn student_user_ids(&self) -> AppResult<Vec<i32>> {
        self.user_ids_with_role(user::UserRole::Student).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_manager_user_ids() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! { "id" => sea_orm::Value::Int(Some(4)) },
                    maplit::btreemap! { "id" => sea_orm::Value::Int(Some(9)) },
                ]])
                .into_connection(),
        );

        let repo = DirectoryRepository::new(db);
        let ids = repo.manager_user_ids().await.unwrap();

        assert_eq!(ids, vec![4, 9]);
    }

    #[tokio::test]
    async fn test_find_manager_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<manager::Model>::new()])
                .into_connection(),
        );

        let repo = DirectoryRepository::new(db);
        assert!(repo.find_manager(1).await.unwrap().is_none());
    }
}
