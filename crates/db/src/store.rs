//! Store traits the workflows depend on.
//!
//! Each trait has two implementations with identical contracts: the sea-orm
//! repositories in [`crate::repositories`] and the process-local
//! [`MemoryStore`](crate::memory::MemoryStore). Workflow code only ever sees
//! `Arc<dyn …Store>`.

use std::sync::Arc;

use asrama_common::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::entities::{
    announcement,
    clearance_request::{self, ClearanceStatus, FacilityStatus},
    damage_line_item,
    damage_report::{self, ReportStatus},
    exit_permit::{self, PermitStatus},
    manager,
    notification::{self, NotificationType},
    payment_record::{self, ProofStatus},
    student, user,
};
use crate::memory::MemoryStore;
use crate::repositories::{
    AnnouncementRepository, ClearanceRepository, DamageReportRepository, DirectoryRepository,
    ExitPermitRepository, NotificationRepository,
};

/// A student profile together with its login account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithUser {
    pub student: student::Model,
    pub user: user::Model,
}

/// Read access to the roster of students and managers.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Student profile with its owning account.
    async fn find_student(&self, student_id: i32) -> AppResult<Option<StudentWithUser>>;

    /// Manager profile by id.
    async fn find_manager(&self, manager_id: i32) -> AppResult<Option<manager::Model>>;

    /// Account ids of every manager.
    async fn manager_user_ids(&self) -> AppResult<Vec<i32>>;

    /// Account ids of every student.
    async fn student_user_ids(&self) -> AppResult<Vec<i32>>;
}

/// Input for a new clearance request.
#[derive(Debug, Clone)]
pub struct NewClearanceRequest {
    pub student_id: i32,
    pub submission_number: String,
    pub total_fee: Decimal,
    pub submitted_at: DateTime<Utc>,
}

/// One damage charge recorded during facility verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDamageItem {
    pub facility_name: String,
    pub cost: Decimal,
}

/// Everything facility verification writes in one transaction.
#[derive(Debug, Clone)]
pub struct FacilityVerification {
    pub manager_id: i32,
    pub facility_status: FacilityStatus,
    pub additional_fee: Decimal,
    pub total_fee: Decimal,
    /// Replaces all existing line items of the request.
    pub items: Vec<NewDamageItem>,
    pub verified_at: DateTime<Utc>,
}

/// Outcome of a manager's payment review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    /// Payments become `VALID`, request becomes `COMPLETED`.
    Approve,
    /// Payments become `INVALID` with proof cleared, request goes back to
    /// `AWAITING_PAYMENT`.
    Reject,
}

impl PaymentDecision {
    /// Proof status written to every payment of the request.
    #[must_use]
    pub const fn proof_status(self) -> ProofStatus {
        match self {
            Self::Approve => ProofStatus::Valid,
            Self::Reject => ProofStatus::Invalid,
        }
    }

    /// Request status after the decision.
    #[must_use]
    pub const fn request_status(self) -> ClearanceStatus {
        match self {
            Self::Approve => ClearanceStatus::Completed,
            Self::Reject => ClearanceStatus::AwaitingPayment,
        }
    }
}

/// Request with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceDetail {
    #[serde(flatten)]
    pub request: clearance_request::Model,
    pub student: Option<student::Model>,
    pub damage_items: Vec<damage_line_item::Model>,
    pub payments: Vec<payment_record::Model>,
}

/// A payment as listed on a student's billing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    #[serde(flatten)]
    pub payment: payment_record::Model,
    pub submission_number: Option<String>,
    pub request_status: Option<ClearanceStatus>,
}

/// Persistence for clearance requests, damage line items and payments.
#[async_trait]
pub trait ClearanceStore: Send + Sync {
    /// The student's request that is not yet `COMPLETED`, if any.
    async fn find_active(&self, student_id: i32) -> AppResult<Option<clearance_request::Model>>;

    /// Insert a request in `FACILITY_VERIFICATION`.
    ///
    /// Fails with `Conflict` when the student already has an active request.
    async fn create(&self, new: NewClearanceRequest) -> AppResult<clearance_request::Model>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<clearance_request::Model>>;

    /// Request joined with its student, line items and payments.
    async fn detail(&self, id: i32) -> AppResult<Option<ClearanceDetail>>;

    /// A student's requests, newest first.
    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<clearance_request::Model>>;

    /// All requests, newest first, optionally filtered by status.
    async fn list(
        &self,
        status: Option<ClearanceStatus>,
    ) -> AppResult<Vec<clearance_request::Model>>;

    /// Record facility verification atomically: replace line items, update
    /// the fee and status, and create or reset the request's payment record.
    ///
    /// Fails with `Conflict` when the request is already `COMPLETED`.
    async fn verify_facilities(
        &self,
        request_id: i32,
        verification: FacilityVerification,
    ) -> AppResult<(clearance_request::Model, payment_record::Model)>;

    async fn find_payment(&self, payment_id: i32) -> AppResult<Option<payment_record::Model>>;

    /// Store a proof path, reset the proof status to `UNVERIFIED` and move the
    /// linked request to `PAYMENT_VERIFICATION`, atomically.
    ///
    /// Fails with `Conflict` when the linked request is already `COMPLETED`.
    async fn attach_proof(
        &self,
        payment_id: i32,
        proof_path: String,
        at: DateTime<Utc>,
    ) -> AppResult<payment_record::Model>;

    /// Apply a payment decision to every payment of the request and the
    /// request itself, atomically.
    ///
    /// Fails with `Conflict` when the request is already `COMPLETED` or has
    /// no payment yet.
    async fn decide_payment(
        &self,
        request_id: i32,
        manager_id: i32,
        decision: PaymentDecision,
        at: DateTime<Utc>,
    ) -> AppResult<clearance_request::Model>;

    /// Delete a request; line items and payments go with it.
    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Payments of a student with their request's number and status.
    async fn billing_for_student(&self, student_id: i32) -> AppResult<Vec<BillingEntry>>;
}

/// Completed requests are frozen; checked by every store under its lock or
/// transaction.
pub(crate) fn ensure_open(request: &clearance_request::Model) -> AppResult<()> {
    if request.status == ClearanceStatus::Completed {
        return Err(AppError::Conflict("Pengajuan bebas asrama ini sudah selesai".to_string()));
    }
    Ok(())
}

/// Input for a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistence for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> AppResult<notification::Model>;

    /// A user's notifications created at or after `since`, newest first.
    async fn list_since(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<notification::Model>>;

    /// Mark one notification read. Returns `false` when no notification with
    /// that id belongs to the user.
    async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<bool>;

    /// Mark all of a user's unread notifications read.
    async fn mark_all_read(&self, user_id: i32) -> AppResult<u64>;
}

/// Input for a new exit permit.
#[derive(Debug, Clone)]
pub struct NewExitPermit {
    pub student_id: i32,
    pub reason: String,
    pub out_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
    pub document_path: String,
    pub requested_at: DateTime<Utc>,
}

/// New state written by a permit transition.
#[derive(Debug, Clone)]
pub struct PermitChange {
    pub status: PermitStatus,
    pub manager_id: Option<i32>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for exit permits.
#[async_trait]
pub trait ExitPermitStore: Send + Sync {
    async fn create(&self, new: NewExitPermit) -> AppResult<exit_permit::Model>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<exit_permit::Model>>;

    /// A student's permits, newest first.
    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<exit_permit::Model>>;

    /// All permits, newest first, optionally filtered by status.
    async fn list(&self, status: Option<PermitStatus>) -> AppResult<Vec<exit_permit::Model>>;

    /// Apply `change` if the permit's current status is one of `from`.
    ///
    /// Fails with `NotFound` for an unknown id and with `Conflict` when the
    /// status has moved on; the check and the write are atomic.
    async fn transition(
        &self,
        id: i32,
        from: &[PermitStatus],
        change: PermitChange,
    ) -> AppResult<exit_permit::Model>;

    /// Delete a permit that is still `pending`.
    ///
    /// Fails with `NotFound` for an unknown id and with `Conflict` once the
    /// permit has been decided.
    async fn delete_pending(&self, id: i32) -> AppResult<()>;
}

pub(crate) fn permit_moved_on(status: PermitStatus) -> AppError {
    AppError::Conflict(format!("Izin keluar sudah {}", status.label()))
}

/// Input for a new damage report.
#[derive(Debug, Clone)]
pub struct NewDamageReport {
    pub student_id: i32,
    pub description: String,
    pub location: String,
    pub category: String,
    pub photo_path: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for damage reports.
#[async_trait]
pub trait DamageReportStore: Send + Sync {
    async fn create(&self, new: NewDamageReport) -> AppResult<damage_report::Model>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<damage_report::Model>>;

    /// A student's reports, newest first.
    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<damage_report::Model>>;

    /// All reports, newest first, optionally filtered by status.
    async fn list(&self, status: Option<ReportStatus>) -> AppResult<Vec<damage_report::Model>>;

    async fn update_status(
        &self,
        id: i32,
        status: ReportStatus,
        at: DateTime<Utc>,
    ) -> AppResult<damage_report::Model>;
}

/// Input for a new announcement.
#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub manager_id: i32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for announcements.
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn create(&self, new: NewAnnouncement) -> AppResult<announcement::Model>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<announcement::Model>>;

    /// All announcements, newest first.
    async fn list(&self) -> AppResult<Vec<announcement::Model>>;

    /// Delete an announcement and the `pengumuman` notifications pointing at
    /// it in one transaction. Returns the number of notifications removed.
    async fn delete_with_notifications(&self, id: i32) -> AppResult<u64>;
}

/// The full set of stores, selected once at startup.
#[derive(Clone)]
pub struct Stores {
    pub directory: Arc<dyn DirectoryStore>,
    pub clearance: Arc<dyn ClearanceStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub permits: Arc<dyn ExitPermitStore>,
    pub reports: Arc<dyn DamageReportStore>,
    pub announcements: Arc<dyn AnnouncementStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(db: Arc<DatabaseConnection>) -> Self {
        Self {
            directory: Arc::new(DirectoryRepository::new(Arc::clone(&db))),
            clearance: Arc::new(ClearanceRepository::new(Arc::clone(&db))),
            notifications: Arc::new(NotificationRepository::new(Arc::clone(&db))),
            permits: Arc::new(ExitPermitRepository::new(Arc::clone(&db))),
            reports: Arc::new(DamageReportRepository::new(Arc::clone(&db))),
            announcements: Arc::new(AnnouncementRepository::new(db)),
        }
    }

    /// Stores backed by one shared in-memory state.
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            directory: Arc::new(store.clone()),
            clearance: Arc::new(store.clone()),
            notifications: Arc::new(store.clone()),
            permits: Arc::new(store.clone()),
            reports: Arc::new(store.clone()),
            announcements: Arc::new(store.clone()),
        }
    }
}
