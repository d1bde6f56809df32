//! Damage report repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::{DamageReport, damage_report};
use crate::store::{DamageReportStore, NewDamageReport};
use damage_report::ReportStatus;

/// Damage report repository for database operations.
#[derive(Clone)]
pub struct DamageReportRepository {
    db: Arc<DatabaseConnection>,
}

impl DamageReportRepository {
    /// Create a new damage report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DamageReportStore for DamageReportRepository {
    async fn create(&self, new: NewDamageReport) -> AppResult<damage_report::Model> {
        damage_report::ActiveModel {
            student_id: Set(new.student_id),
            description: Set(new.description),
            location: Set(new.location),
            category: Set(new.category),
            photo_path: Set(new.photo_path),
            status: Set(ReportStatus::UnderReview),
            created_at: Set(new.created_at),
            updated_at: Set(new.created_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<damage_report::Model>> {
        DamageReport::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<damage_report::Model>> {
        DamageReport::find()
            .filter(damage_report::Column::StudentId.eq(student_id))
            .order_by_desc(damage_report::Column::CreatedAt)
            .order_by_desc(damage_report::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self, status: Option<ReportStatus>) -> AppResult<Vec<damage_report::Model>> {
        let mut query = DamageReport::find()
            .order_by_desc(damage_report::Column::CreatedAt)
            .order_by_desc(damage_report::Column::Id);

        if let Some(status) = status {
            query = query.filter(damage_report::Column::Status.eq(status));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_status(
        &self,
        id: i32,
        status: ReportStatus,
        at: DateTime<Utc>,
    ) -> AppResult<damage_report::Model> {
        damage_report::ActiveModel {
            id: Set(id),
            status: Set(status),
            updated_at: Set(at),
            ..Default::default()
        }
        .update(self.db.as_ref())
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Laporan tidak ditemukan".to_string()),
            e => AppError::Database(e.to_string()),
        })
    }
}
