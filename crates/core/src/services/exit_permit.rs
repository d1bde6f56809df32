//! Exit permit ("izin keluar") workflow.
//!
//! `pending -> approved | rejected`, and a manual reset back to `pending`.

use std::sync::Arc;

use asrama_common::{AppError, AppResult, FileStore, UploadCategory, UploadedFile};
use asrama_db::entities::exit_permit::{self, PermitStatus};
use asrama_db::entities::notification::NotificationType;
use asrama_db::{DirectoryStore, ExitPermitStore, NewExitPermit, PermitChange};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Jakarta;
use serde::Deserialize;
use tracing::info;

use crate::services::notification::{NotificationDraft, NotificationService};

/// Form fields of a permit submission. Dates are `YYYY-MM-DD`, times `HH:MM`,
/// both in dormitory local time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPermitInput {
    pub reason: Option<String>,
    pub out_date: Option<String>,
    pub out_time: Option<String>,
    pub return_date: Option<String>,
    pub return_time: Option<String>,
}

/// Service for exit permits.
#[derive(Clone)]
pub struct ExitPermitService {
    store: Arc<dyn ExitPermitStore>,
    directory: Arc<dyn DirectoryStore>,
    notifications: NotificationService,
    files: Arc<dyn FileStore>,
}

impl ExitPermitService {
    /// Create a new exit permit service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExitPermitStore>,
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

    /// Submit a permit with its supporting document.
    pub async fn submit(
        &self,
        student_id: i32,
        input: SubmitPermitInput,
        document: Option<UploadedFile>,
    ) -> AppResult<exit_permit::Model> {
        let reason = required(input.reason, "Alasan")?;
        let out_at = compose_local(
            &required(input.out_date, "Tanggal keluar")?,
            &required(input.out_time, "Jam keluar")?,
        )?;
        let return_at = compose_local(
            &required(input.return_date, "Tanggal kembali")?,
            &required(input.return_time, "Jam kembali")?,
        )?;
        let document = document
            .ok_or_else(|| AppError::BadRequest("Dokumen pendukung wajib diunggah".to_string()))?;

        if return_at <= out_at {
            return Err(AppError::BadRequest(
                "Waktu kembali harus setelah waktu keluar".to_string(),
            ));
        }

        let student = self
            .directory
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Data mahasiswa tidak ditemukan".to_string()))?;

        let stored = self
            .files
            .save(UploadCategory::PermitDocument, &document)
            .await?;

        let permit = self
            .store
            .create(NewExitPermit {
                student_id,
                reason,
                out_at,
                return_at,
                document_path: stored.path,
                requested_at: Utc::now(),
            })
            .await?;

        info!(permit_id = permit.id, student_id, "Exit permit submitted");

        self.notifications
            .notify_managers(&NotificationDraft::new(
                NotificationType::ExitPermit,
                "Pengajuan Izin Keluar Baru",
                format!(
                    "{} ({}) mengajukan izin keluar asrama",
                    student.student.name, student.student.nim
                ),
                permit.id,
            ))
            .await;

        Ok(permit)
    }

    /// Approve a pending permit.
    pub async fn approve(&self, manager_id: i32, permit_id: i32) -> AppResult<exit_permit::Model> {
        let permit = self
            .store
            .transition(
                permit_id,
                &[PermitStatus::Pending],
                PermitChange {
                    status: PermitStatus::Approved,
                    manager_id: Some(manager_id),
                    notes: None,
                    updated_at: Utc::now(),
                },
            )
            .await?;

        info!(permit_id, manager_id, "Exit permit approved");
        self.notify_decision(&permit).await;
        Ok(permit)
    }

    /// Reject a pending permit with a reason for the student.
    pub async fn reject(
        &self,
        manager_id: i32,
        permit_id: i32,
        notes: Option<String>,
    ) -> AppResult<exit_permit::Model> {
        let notes = required_notes(notes)?;
        let permit = self
            .store
            .transition(
                permit_id,
                &[PermitStatus::Pending],
                PermitChange {
                    status: PermitStatus::Rejected,
                    manager_id: Some(manager_id),
                    notes: Some(notes),
                    updated_at: Utc::now(),
                },
            )
            .await?;

        info!(permit_id, manager_id, "Exit permit rejected");
        self.notify_decision(&permit).await;
        Ok(permit)
    }

    /// Put a decided permit back to pending.
    pub async fn reset(&self, permit_id: i32) -> AppResult<exit_permit::Model> {
        let permit = self
            .store
            .transition(
                permit_id,
                &[PermitStatus::Approved, PermitStatus::Rejected],
                PermitChange {
                    status: PermitStatus::Pending,
                    manager_id: None,
                    notes: None,
                    updated_at: Utc::now(),
                },
            )
            .await?;

        info!(permit_id, "Exit permit reset to pending");
        Ok(permit)
    }

    /// Edit the rejection notes of a rejected permit.
    pub async fn update_notes(
        &self,
        permit_id: i32,
        notes: Option<String>,
    ) -> AppResult<exit_permit::Model> {
        let notes = required_notes(notes)?;
        let permit = self.get(permit_id).await?;
        if permit.status != PermitStatus::Rejected {
            return Err(AppError::Conflict(
                "Catatan hanya dapat diubah pada izin yang ditolak".to_string(),
            ));
        }

        self.store
            .transition(
                permit_id,
                &[PermitStatus::Rejected],
                PermitChange {
                    status: PermitStatus::Rejected,
                    manager_id: permit.manager_id,
                    notes: Some(notes),
                    updated_at: Utc::now(),
                },
            )
            .await
    }

    /// Withdraw one of the student's pending permits.
    pub async fn cancel(&self, student_id: i32, permit_id: i32) -> AppResult<()> {
        let permit = self.get_for_student(student_id, permit_id).await?;
        self.store.delete_pending(permit.id).await?;
        info!(permit_id, student_id, "Exit permit cancelled");
        Ok(())
    }

    /// Get a permit by id.
    pub async fn get(&self, permit_id: i32) -> AppResult<exit_permit::Model> {
        self.store
            .find_by_id(permit_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Izin keluar tidak ditemukan".to_string()))
    }

    /// Get one of the student's permits.
    pub async fn get_for_student(
        &self,
        student_id: i32,
        permit_id: i32,
    ) -> AppResult<exit_permit::Model> {
        let permit = self.get(permit_id).await?;
        if permit.student_id != student_id {
            return Err(AppError::NotFound("Izin keluar tidak ditemukan".to_string()));
        }
        Ok(permit)
    }

    /// A student's permits, newest first.
    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<exit_permit::Model>> {
        self.store.list_for_student(student_id).await
    }

    /// All permits, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<PermitStatus>) -> AppResult<Vec<exit_permit::Model>> {
        self.store.list(status).await
    }

    async fn notify_decision(&self, permit: &exit_permit::Model) {
        let label = permit.status.label();
        let message = match &permit.notes {
            Some(notes) => format!("Pengajuan izin keluar Anda {label}. Catatan: {notes}"),
            None => format!("Pengajuan izin keluar Anda {label}"),
        };
        self.notifications
            .notify_student(
                permit.student_id,
                &NotificationDraft::new(
                    NotificationType::ExitPermit,
                    "Status Izin Keluar",
                    message,
                    permit.id,
                ),
            )
            .await;
    }
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} wajib diisi")))
}

fn required_notes(notes: Option<String>) -> AppResult<String> {
    required(notes, "Catatan penolakan")
}

/// Combine a local date and time into an instant.
fn compose_local(date: &str, time: &str) -> AppResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Format tanggal tidak valid: {date}")))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("Format jam tidak valid: {time}")))?;

    // Jakarta has no DST, so every local time maps to exactly one instant.
    Jakarta
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::BadRequest("Waktu tidak valid".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{Harness, image, pdf};
    use chrono::Timelike;

    fn input(out: (&str, &str), back: (&str, &str)) -> SubmitPermitInput {
        SubmitPermitInput {
            reason: Some("Pulang kampung".to_string()),
            out_date: Some(out.0.to_string()),
            out_time: Some(out.1.to_string()),
            return_date: Some(back.0.to_string()),
            return_time: Some(back.1.to_string()),
        }
    }

    fn valid() -> SubmitPermitInput {
        input(("2026-03-01", "08:00"), ("2026-03-03", "18:30"))
    }

    async fn submitted(h: &Harness) -> exit_permit::Model {
        h.permits
            .submit(h.fixture.student.student.id, valid(), Some(pdf("surat.pdf")))
            .await
            .unwrap()
    }

    #[test]
    fn test_compose_local_uses_jakarta_time() {
        let at = compose_local("2026-03-01", "08:00").unwrap();
        assert_eq!(at.hour(), 1);
        assert_eq!(compose_local("2026-03-01", "08:00:00").unwrap(), at);
        assert!(compose_local("01/03/2026", "08:00").is_err());
        assert!(compose_local("2026-03-01", "8 pagi").is_err());
    }

    #[tokio::test]
    async fn test_submit_notifies_managers() {
        let h = Harness::new(2).await;
        let permit = submitted(&h).await;

        assert_eq!(permit.status, PermitStatus::Pending);
        assert!(permit.return_at > permit.out_at);
        assert!(permit.document_path.starts_with("/uploads/permits/"));

        for (user, _) in &h.fixture.managers {
            let notifications = h.fixture.store.notifications_for(user.id).await;
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].notification_type, NotificationType::ExitPermit);
        }
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let h = Harness::new(1).await;
        let student_id = h.fixture.student.student.id;

        let mut missing = valid();
        missing.return_time = None;
        let mut blank = valid();
        blank.reason = Some("   ".to_string());
        let backwards = input(("2026-03-03", "08:00"), ("2026-03-01", "08:00"));
        let same = input(("2026-03-01", "08:00"), ("2026-03-01", "08:00"));

        for bad in [missing, blank, backwards, same] {
            assert!(matches!(
                h.permits.submit(student_id, bad, Some(pdf("surat.pdf"))).await,
                Err(AppError::BadRequest(_))
            ));
        }
        assert!(matches!(
            h.permits.submit(student_id, valid(), None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            h.permits
                .submit(student_id, valid(), Some(image("foto.jpg")))
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(h.permits.list_for_student(student_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_notifies_student_with_label() {
        let h = Harness::new(1).await;
        let permit = submitted(&h).await;

        let approved = h
            .permits
            .approve(h.fixture.manager_id(), permit.id)
            .await
            .unwrap();
        assert_eq!(approved.status, PermitStatus::Approved);
        assert_eq!(approved.manager_id, Some(h.fixture.manager_id()));

        let notifications = h
            .fixture
            .store
            .notifications_for(h.fixture.student.user.id)
            .await;
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("disetujui"));
    }

    #[tokio::test]
    async fn test_transition_guards() {
        let h = Harness::new(1).await;
        let manager_id = h.fixture.manager_id();
        let permit = submitted(&h).await;

        assert!(matches!(
            h.permits.reset(permit.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            h.permits
                .reject(manager_id, permit.id, Some("  ".to_string()))
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(h.permits.get(permit.id).await.unwrap().status, PermitStatus::Pending);

        let rejected = h
            .permits
            .reject(manager_id, permit.id, Some(" Dokumen tidak lengkap ".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.notes.as_deref(), Some("Dokumen tidak lengkap"));

        assert!(matches!(
            h.permits.approve(manager_id, permit.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            h.permits
                .reject(manager_id, permit.id, Some("lagi".to_string()))
                .await,
            Err(AppError::Conflict(_))
        ));

        let reset = h.permits.reset(permit.id).await.unwrap();
        assert_eq!(reset.status, PermitStatus::Pending);
        assert!(reset.notes.is_none());
        assert!(reset.manager_id.is_none());

        assert!(h.permits.approve(manager_id, permit.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_notes_only_when_rejected() {
        let h = Harness::new(1).await;
        let permit = submitted(&h).await;

        assert!(matches!(
            h.permits
                .update_notes(permit.id, Some("catatan".to_string()))
                .await,
            Err(AppError::Conflict(_))
        ));

        h.permits
            .reject(h.fixture.manager_id(), permit.id, Some("awal".to_string()))
            .await
            .unwrap();
        let updated = h
            .permits
            .update_notes(permit.id, Some("revisi".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("revisi"));
    }

    #[tokio::test]
    async fn test_cancel() {
        let h = Harness::new(1).await;
        let permit = submitted(&h).await;

        assert!(matches!(
            h.permits
                .cancel(h.fixture.kipk_student.student.id, permit.id)
                .await,
            Err(AppError::NotFound(_))
        ));

        h.permits
            .cancel(h.fixture.student.student.id, permit.id)
            .await
            .unwrap();
        assert!(matches!(
            h.permits.get(permit.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_after_decision_is_conflict() {
        let h = Harness::new(1).await;
        let permit = submitted(&h).await;
        h.permits
            .approve(h.fixture.manager_id(), permit.id)
            .await
            .unwrap();

        assert!(matches!(
            h.permits
                .cancel(h.fixture.student.student.id, permit.id)
                .await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(
            h.permits.get(permit.id).await.unwrap().status,
            PermitStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_concurrent_decisions_have_one_winner() {
        let h = Harness::new(2).await;
        let permit = submitted(&h).await;
        let first = h.fixture.managers[0].1.id;
        let second = h.fixture.managers[1].1.id;

        let (approved, rejected) = tokio::join!(
            h.permits.approve(first, permit.id),
            h.permits.reject(second, permit.id, Some("Dokumen kurang".to_string())),
        );

        let winner = match (approved, rejected) {
            (Ok(winner), Err(AppError::Conflict(_)))
            | (Err(AppError::Conflict(_)), Ok(winner)) => winner,
            other => panic!("expected exactly one decision to win, got {other:?}"),
        };

        let stored = h.permits.get(permit.id).await.unwrap();
        assert_eq!(stored.status, winner.status);
        assert_eq!(stored.manager_id, winner.manager_id);
        assert_eq!(stored.notes, winner.notes);
        assert_eq!(
            h.fixture
                .store
                .notifications_for(h.fixture.student.user.id)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_permit() {
        let h = Harness::new(1).await;
        assert!(matches!(
            h.permits.approve(h.fixture.manager_id(), 404).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(h.permits.reset(404).await, Err(AppError::NotFound(_))));
    }
}
