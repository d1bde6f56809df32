//! Exit permit repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{ExitPermit, exit_permit};
use crate::store::{ExitPermitStore, NewExitPermit, PermitChange, permit_moved_on};
use exit_permit::PermitStatus;

/// Exit permit repository for database operations.
#[derive(Clone)]
pub struct ExitPermitRepository {
    db: Arc<DatabaseConnection>,
}

impl ExitPermitRepository {
    /// Create a new exit permit repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExitPermitStore for ExitPermitRepository {
    async fn create(&self, new: NewExitPermit) -> AppResult<exit_permit::Model> {
        exit_permit::ActiveModel {
            student_id: Set(new.student_id),
            manager_id: Set(None),
            reason: Set(new.reason),
            requested_at: Set(new.requested_at),
            out_at: Set(new.out_at),
            return_at: Set(new.return_at),
            document_path: Set(new.document_path),
            status: Set(PermitStatus::Pending),
            notes: Set(None),
            updated_at: Set(new.requested_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<exit_permit::Model>> {
        ExitPermit::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<exit_permit::Model>> {
        ExitPermit::find()
            .filter(exit_permit::Column::StudentId.eq(student_id))
            .order_by_desc(exit_permit::Column::RequestedAt)
            .order_by_desc(exit_permit::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self, status: Option<PermitStatus>) -> AppResult<Vec<exit_permit::Model>> {
        let mut query = ExitPermit::find()
            .order_by_desc(exit_permit::Column::RequestedAt)
            .order_by_desc(exit_permit::Column::Id);

        if let Some(status) = status {
            query = query.filter(exit_permit::Column::Status.eq(status));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn transition(
        &self,
        id: i32,
        from: &[PermitStatus],
        change: PermitChange,
    ) -> AppResult<exit_permit::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let permit = ExitPermit::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Izin keluar tidak ditemukan".to_string()))?;

        if !from.contains(&permit.status) {
            return Err(permit_moved_on(permit.status));
        }

        let mut active = permit.into_active_model();
        active.manager_id = Set(change.manager_id);
        active.status = Set(change.status);
        active.notes = Set(change.notes);
        active.updated_at = Set(change.updated_at);
        let permit = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(permit)
    }

    async fn delete_pending(&self, id: i32) -> AppResult<()> {
        let deleted = ExitPermit::delete_many()
            .filter(exit_permit::Column::Id.eq(id))
            .filter(exit_permit::Column::Status.eq(PermitStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if deleted.rows_affected > 0 {
            return Ok(());
        }

        match self.find_by_id(id).await? {
            Some(permit) => Err(permit_moved_on(permit.status)),
            None => Err(AppError::NotFound("Izin keluar tidak ditemukan".to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn permit(id: i32, status: PermitStatus) -> exit_permit::Model {
        let now = Utc::now();
        exit_permit::Model {
            id,
            student_id: 1,
            manager_id: None,
            reason: "Pulang kampung".to_string(),
            requested_at: now,
            out_at: now + chrono::Duration::hours(2),
            return_at: now + chrono::Duration::days(2),
            document_path: "/uploads/permits/surat.pdf".to_string(),
            status,
            notes: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[permit(2, PermitStatus::Pending)]])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let results = repo.list(Some(PermitStatus::Pending)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, PermitStatus::Pending);
    }

    fn approval() -> PermitChange {
        PermitChange {
            status: PermitStatus::Approved,
            manager_id: Some(3),
            notes: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_transition_returns_new_state() {
        let mut approved = permit(1, PermitStatus::Approved);
        approved.manager_id = Some(3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[permit(1, PermitStatus::Pending)]])
                .append_query_results([[approved]])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let result = repo
            .transition(1, &[PermitStatus::Pending], approval())
            .await
            .unwrap();

        assert_eq!(result.status, PermitStatus::Approved);
        assert_eq!(result.manager_id, Some(3));
    }

    #[tokio::test]
    async fn test_transition_from_decided_status_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[permit(1, PermitStatus::Rejected)]])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let result = repo.transition(1, &[PermitStatus::Pending], approval()).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_transition_missing_permit_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<exit_permit::Model>::new()])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let result = repo.transition(42, &[PermitStatus::Pending], approval()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_pending_after_decision_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([[permit(1, PermitStatus::Approved)]])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let result = repo.delete_pending(1).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_pending_missing_permit_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([Vec::<exit_permit::Model>::new()])
                .into_connection(),
        );

        let repo = ExitPermitRepository::new(db);
        let result = repo.delete_pending(42).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
