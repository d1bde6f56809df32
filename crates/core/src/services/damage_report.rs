//! Damage report ("pelaporan kerusakan") workflow.

use std::str::FromStr;
use std::sync::Arc;

use asrama_common::{AppError, AppResult, FileStore, UploadCategory, UploadedFile};
use asrama_db::entities::damage_report::{self, ReportStatus};
use asrama_db::entities::notification::NotificationType;
use asrama_db::{DamageReportStore, DirectoryStore, NewDamageReport};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::notification::{NotificationDraft, NotificationService};

/// Form fields of a damage report.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmitReportInput {
    #[validate(length(min = 3, message = "Kategori minimal 3 karakter"))]
    pub category: String,

    #[validate(length(min = 10, message = "Deskripsi minimal 10 karakter"))]
    pub description: String,

    #[validate(length(min = 2, message = "Lokasi minimal 2 karakter"))]
    pub location: String,
}

impl SubmitReportInput {
    fn trimmed(self) -> Self {
        Self {
            category: self.category.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
        }
    }
}

/// Service for damage reports.
#[derive(Clone)]
pub struct DamageReportService {
    store: Arc<dyn DamageReportStore>,
    directory: Arc<dyn DirectoryStore>,
    notifications: NotificationService,
    files: Arc<dyn FileStore>,
}

impl DamageReportService {
    /// Create a new damage report service.
    #[must_use]
    pub fn new(
        store: Arc<dyn DamageReportStore>,
        directory: Arc<dyn DirectoryStore>,
        notifications: NotificationService,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            store,
            directory,
            notifications,
            files,
        }
    }

    /// File a report with a photo of the damage.
    pub async fn submit(
        &self,
        student_id: i32,
        input: SubmitReportInput,
        photo: Option<UploadedFile>,
    ) -> AppResult<damage_report::Model> {
        let input = input.trimmed();
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let photo =
            photo.ok_or_else(|| AppError::BadRequest("Foto kerusakan wajib diunggah".to_string()))?;

        let student = self
            .directory
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Data mahasiswa tidak ditemukan".to_string()))?;

        let stored = self.files.save(UploadCategory::ReportPhoto, &photo).await?;
        let report = self
            .store
            .create(NewDamageReport {
                student_id,
                description: input.description,
                location: input.location,
                category: input.category,
                photo_path: stored.path,
                created_at: Utc::now(),
            })
            .await?;

        info!(report_id = report.id, student_id, "Damage report submitted");

        self.notifications
            .notify_managers(&NotificationDraft::new(
                NotificationType::DamageReport,
                "Laporan Kerusakan Baru",
                format!(
                    "{} melaporkan kerusakan {} di {}",
                    student.student.name, report.category, report.location
                ),
                report.id,
            ))
            .await;

        Ok(report)
    }

    /// Set a report's status. Any of the three labels may follow any other.
    pub async fn update_status(
        &self,
        report_id: i32,
        status: &str,
    ) -> AppResult<damage_report::Model> {
        let status = ReportStatus::from_str(status.trim()).map_err(AppError::BadRequest)?;
        let report = self.store.update_status(report_id, status, Utc::now()).await?;

        info!(report_id, status = status.as_str(), "Damage report status updated");

        self.notifications
            .notify_student(
                report.student_id,
                &NotificationDraft::new(
                    NotificationType::DamageReport,
                    "Status Laporan Kerusakan",
                    format!(
                        "Status laporan kerusakan {} Anda diperbarui menjadi {}",
                        report.category,
                        status.as_str()
                    ),
                    report.id,
                ),
            )
            .await;

        Ok(report)
    }

    /// Get a report by id.
    pub async fn get(&self, report_id: i32) -> AppResult<damage_report::Model> {
        self.store
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Laporan tidak ditemukan".to_string()))
    }

    /// Get one of the student's reports.
    pub async fn get_for_student(
        &self,
        student_id: i32,
        report_id: i32,
    ) -> AppResult<damage_report::Model> {
        let report = self.get(report_id).await?;
        if report.student_id != student_id {
            return Err(AppError::NotFound("Laporan tidak ditemukan".to_string()));
        }
        Ok(report)
    }

    /// A student's reports, newest first.
    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<damage_report::Model>> {
        self.store.list_for_student(student_id).await
    }

    /// All reports, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<ReportStatus>) -> AppResult<Vec<damage_report::Model>> {
        self.store.list(status).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{Harness, image, pdf};

    fn valid() -> SubmitReportInput {
        SubmitReportInput {
            category: "Listrik".to_string(),
            description: "Lampu kamar mati sejak kemarin".to_string(),
            location: "A-12".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_notifies_managers() {
        let h = Harness::new(2).await;
        let report = h
            .reports
            .submit(h.fixture.student.student.id, valid(), Some(image("lampu.jpg")))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::UnderReview);
        assert!(report.photo_path.starts_with("/uploads/reports/"));
        for (user, _) in &h.fixture.managers {
            let notifications = h.fixture.store.notifications_for(user.id).await;
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].notification_type, NotificationType::DamageReport);
            assert_eq!(
                notifications[0].reference_id.as_deref(),
                Some(report.id.to_string().as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_submit_length_rules_apply_after_trim() {
        let h = Harness::new(1).await;
        let student_id = h.fixture.student.student.id;

        let mut short_category = valid();
        short_category.category = "  AC   ".to_string();
        let mut short_description = valid();
        short_description.description = "rusak".to_string();
        let mut short_location = valid();
        short_location.location = " A ".to_string();

        for bad in [short_category, short_description, short_location] {
            assert!(matches!(
                h.reports.submit(student_id, bad, Some(image("x.jpg"))).await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(h.files.saved().is_empty());
    }

    #[tokio::test]
    async fn test_submit_requires_image() {
        let h = Harness::new(1).await;
        let student_id = h.fixture.student.student.id;

        assert!(matches!(
            h.reports.submit(student_id, valid(), None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            h.reports.submit(student_id, valid(), Some(pdf("x.pdf"))).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_any_order() {
        let h = Harness::new(1).await;
        let report = h
            .reports
            .submit(h.fixture.student.student.id, valid(), Some(image("lampu.jpg")))
            .await
            .unwrap();

        let done = h.reports.update_status(report.id, "selesai").await.unwrap();
        assert_eq!(done.status, ReportStatus::Done);
        let back = h.reports.update_status(report.id, "ditinjau").await.unwrap();
        assert_eq!(back.status, ReportStatus::UnderReview);

        let notifications = h
            .fixture
            .store
            .notifications_for(h.fixture.student.user.id)
            .await;
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().any(|n| n.message.contains("selesai")));
    }

    #[tokio::test]
    async fn test_update_status_errors() {
        let h = Harness::new(1).await;
        let report = h
            .reports
            .submit(h.fixture.student.student.id, valid(), Some(image("lampu.jpg")))
            .await
            .unwrap();

        assert!(matches!(
            h.reports.update_status(report.id, "diperbaiki").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            h.reports.update_status(999, "selesai").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(
            h.reports.get(report.id).await.unwrap().status,
            ReportStatus::UnderReview
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let h = Harness::new(1).await;
        let student_id = h.fixture.student.student.id;
        let first = h
            .reports
            .submit(student_id, valid(), Some(image("a.jpg")))
            .await
            .unwrap();
        h.reports
            .submit(student_id, valid(), Some(image("b.jpg")))
            .await
            .unwrap();
        h.reports.update_status(first.id, "ditangani").await.unwrap();

        assert_eq!(h.reports.list(None).await.unwrap().len(), 2);
        let handling = h.reports.list(Some(ReportStatus::InProgress)).await.unwrap();
        assert_eq!(handling.len(), 1);
        assert_eq!(handling[0].id, first.id);
        assert_eq!(h.reports.list_for_student(student_id).await.unwrap().len(), 2);
    }
}
