//! Process-local store for offline mode and tests.
//!
//! All tables live behind one lock, so every multi-step operation is applied
//! all-or-nothing exactly like its transactional database counterpart.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::entities::{
    announcement,
    clearance_request::{self, ClearanceStatus},
    damage_line_item, damage_report,
    damage_report::ReportStatus,
    exit_permit,
    exit_permit::PermitStatus,
    manager,
    notification::{self, NotificationType},
    payment_record::{self, ProofStatus},
    student,
    user::{self, UserRole},
};
use crate::store::{
    AnnouncementStore, BillingEntry, ClearanceDetail, ClearanceStore, DamageReportStore,
    DirectoryStore, ExitPermitStore, FacilityVerification, NewAnnouncement, NewClearanceRequest,
    NewDamageReport, NewExitPermit, NewNotification, NotificationStore, PaymentDecision,
    PermitChange, StudentWithUser, ensure_open, permit_moved_on,
};

/// A table keyed by auto-incremented id.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: i32) -> Option<T> {
        self.rows.get(&id).cloned()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Table<user::Model>,
    students: Table<student::Model>,
    managers: Table<manager::Model>,
    requests: Table<clearance_request::Model>,
    damage_items: Table<damage_line_item::Model>,
    payments: Table<payment_record::Model>,
    notifications: Table<notification::Model>,
    permits: Table<exit_permit::Model>,
    reports: Table<damage_report::Model>,
    announcements: Table<announcement::Model>,
}

/// In-memory implementation of every store trait.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a student account with its profile.
    pub async fn add_student(
        &self,
        email: &str,
        nim: &str,
        name: &str,
        is_kipk: bool,
    ) -> StudentWithUser {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();
        let user = state.users.insert_with(|id| user::Model {
            id,
            email: email.to_string(),
            name: name.to_string(),
            role: UserRole::Student,
            created_at: now,
        });
        let student = state.students.insert_with(|id| student::Model {
            id,
            user_id: user.id,
            nim: nim.to_string(),
            name: name.to_string(),
            room: None,
            phone: None,
            is_kipk,
            created_at: now,
        });
        StudentWithUser { student, user }
    }

    /// Register a manager account with its profile.
    pub async fn add_manager(&self, email: &str, name: &str) -> (user::Model, manager::Model) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();
        let user = state.users.insert_with(|id| user::Model {
            id,
            email: email.to_string(),
            name: name.to_string(),
            role: UserRole::Manager,
            created_at: now,
        });
        let manager = state.managers.insert_with(|id| manager::Model {
            id,
            user_id: user.id,
            name: name.to_string(),
            phone: None,
            created_at: now,
        });
        (user, manager)
    }

    /// Every notification addressed to a user, oldest first.
    pub async fn notifications_for(&self, user_id: i32) -> Vec<notification::Model> {
        let state = self.state.read().await;
        state
            .notifications
            .rows
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Backdate a notification.
    pub async fn set_notification_created_at(&self, id: i32, at: DateTime<Utc>) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(n) = state.notifications.rows.get_mut(&id) {
            n.created_at = at;
        }
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn role_user_ids(state: &MemoryState, role: UserRole) -> Vec<i32> {
    state
        .users
        .rows
        .values()
        .filter(|u| u.role == role)
        .map(|u| u.id)
        .collect()
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_student(&self, student_id: i32) -> AppResult<Option<StudentWithUser>> {
        let state = self.state.read().await;
        Ok(state.students.get(student_id).and_then(|student| {
            state
                .users
                .get(student.user_id)
                .map(|user| StudentWithUser { student, user })
        }))
    }

    async fn find_manager(&self, manager_id: i32) -> AppResult<Option<manager::Model>> {
        Ok(self.state.read().await.managers.get(manager_id))
    }

    async fn manager_user_ids(&self) -> AppResult<Vec<i32>> {
        Ok(role_user_ids(&*self.state.read().await, UserRole::Manager))
    }

    async fn student_user_ids(&self) -> AppResult<Vec<i32>> {
        Ok(role_user_ids(&*self.state.read().await, UserRole::Student))
    }
}

#[async_trait]
impl ClearanceStore for MemoryStore {
    async fn find_active(&self, student_id: i32) -> AppResult<Option<clearance_request::Model>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .rows
            .values()
            .find(|r| r.student_id == student_id && r.status.is_active())
            .cloned())
    }

    async fn create(&self, new: NewClearanceRequest) -> AppResult<clearance_request::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let has_active = state
            .requests
            .rows
            .values()
            .any(|r| r.student_id == new.student_id && r.status.is_active());
        if has_active {
            return Err(AppError::Conflict(
                "Anda masih memiliki pengajuan bebas asrama yang belum selesai".to_string(),
            ));
        }

        Ok(state.requests.insert_with(|id| clearance_request::Model {
            id,
            student_id: new.student_id,
            manager_id: None,
            submission_number: new.submission_number,
            total_fee: new.total_fee,
            facility_status: None,
            additional_fee: Decimal::ZERO,
            status: ClearanceStatus::FacilityVerification,
            submitted_at: new.submitted_at,
            updated_at: new.submitted_at,
        }))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<clearance_request::Model>> {
        Ok(self.state.read().await.requests.get(id))
    }

    async fn detail(&self, id: i32) -> AppResult<Option<ClearanceDetail>> {
        let state = self.state.read().await;
        let Some(request) = state.requests.get(id) else {
            return Ok(None);
        };

        let student = state.students.get(request.student_id);
        let damage_items = state
            .damage_items
            .rows
            .values()
            .filter(|i| i.clearance_request_id == id)
            .cloned()
            .collect();
        let payments = state
            .payments
            .rows
            .values()
            .filter(|p| p.clearance_request_id == Some(id))
            .cloned()
            .collect();

        Ok(Some(ClearanceDetail {
            request,
            student,
            damage_items,
            payments,
        }))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<clearance_request::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .requests
            .rows
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.submitted_at, r.id));
        Ok(rows)
    }

    async fn list(
        &self,
        status: Option<ClearanceStatus>,
    ) -> AppResult<Vec<clearance_request::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .requests
            .rows
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.submitted_at, r.id));
        Ok(rows)
    }

    async fn verify_facilities(
        &self,
        request_id: i32,
        verification: FacilityVerification,
    ) -> AppResult<(clearance_request::Model, payment_record::Model)> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let at = verification.verified_at;

        let Some(request) = state.requests.rows.get_mut(&request_id) else {
            return Err(AppError::NotFound("Pengajuan tidak ditemukan".to_string()));
        };
        ensure_open(request)?;
        request.manager_id = Some(verification.manager_id);
        request.facility_status = Some(verification.facility_status);
        request.additional_fee = verification.additional_fee;
        request.total_fee = verification.total_fee;
        request.status = ClearanceStatus::AwaitingPayment;
        request.updated_at = at;
        let request = request.clone();

        state
            .damage_items
            .rows
            .retain(|_, item| item.clearance_request_id != request_id);
        for item in verification.items {
            state.damage_items.insert_with(|id| damage_line_item::Model {
                id,
                clearance_request_id: request_id,
                facility_name: item.facility_name,
                cost: item.cost,
            });
        }

        let existing = state
            .payments
            .rows
            .values_mut()
            .find(|p| p.clearance_request_id == Some(request_id));

        let payment = match existing {
            Some(payment) => {
                payment.amount = verification.total_fee;
                payment.proof_status = ProofStatus::Unverified;
                payment.proof_path = None;
                payment.paid_at = None;
                payment.updated_at = at;
                payment.clone()
            }
            None => state.payments.insert_with(|id| payment_record::Model {
                id,
                clearance_request_id: Some(request_id),
                student_id: request.student_id,
                amount: verification.total_fee,
                proof_path: None,
                proof_status: ProofStatus::Unverified,
                paid_at: None,
                created_at: at,
                updated_at: at,
            }),
        };

        Ok((request, payment))
    }

    async fn find_payment(&self, payment_id: i32) -> AppResult<Option<payment_record::Model>> {
        Ok(self.state.read().await.payments.get(payment_id))
    }

    async fn attach_proof(
        &self,
        payment_id: i32,
        proof_path: String,
        at: DateTime<Utc>,
    ) -> AppResult<payment_record::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(request_id) = state
            .payments
            .rows
            .get(&payment_id)
            .map(|p| p.clearance_request_id)
        else {
            return Err(AppError::NotFound("Data pembayaran tidak ditemukan".to_string()));
        };
        if let Some(request) = request_id.and_then(|id| state.requests.rows.get(&id)) {
            ensure_open(request)?;
        }

        let Some(payment) = state.payments.rows.get_mut(&payment_id) else {
            return Err(AppError::NotFound("Data pembayaran tidak ditemukan".to_string()));
        };
        payment.proof_path = Some(proof_path);
        payment.proof_status = ProofStatus::Unverified;
        payment.paid_at = Some(at);
        payment.updated_at = at;
        let payment = payment.clone();

        if let Some(request) = payment
            .clearance_request_id
            .and_then(|id| state.requests.rows.get_mut(&id))
        {
            request.status = ClearanceStatus::PaymentVerification;
            request.updated_at = at;
        }

        Ok(payment)
    }

    async fn decide_payment(
        &self,
        request_id: i32,
        manager_id: i32,
        decision: PaymentDecision,
        at: DateTime<Utc>,
    ) -> AppResult<clearance_request::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(request) = state.requests.rows.get(&request_id) else {
            return Err(AppError::NotFound("Pengajuan tidak ditemukan".to_string()));
        };
        ensure_open(request)?;

        let mut updated = 0;
        for payment in state
            .payments
            .rows
            .values_mut()
            .filter(|p| p.clearance_request_id == Some(request_id))
        {
            payment.proof_status = decision.proof_status();
            if decision == PaymentDecision::Reject {
                payment.proof_path = None;
            }
            payment.updated_at = at;
            updated += 1;
        }

        if updated == 0 {
            return Err(AppError::Conflict("Pengajuan belum memiliki data pembayaran".to_string()));
        }

        let Some(request) = state.requests.rows.get_mut(&request_id) else {
            return Err(AppError::NotFound("Pengajuan tidak ditemukan".to_string()));
        };
        request.manager_id = Some(manager_id);
        request.status = decision.request_status();
        request.updated_at = at;

        Ok(request.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.requests.rows.remove(&id);
        state
            .damage_items
            .rows
            .retain(|_, item| item.clearance_request_id != id);
        state
            .payments
            .rows
            .retain(|_, p| p.clearance_request_id != Some(id));
        Ok(())
    }

    async fn billing_for_student(&self, student_id: i32) -> AppResult<Vec<BillingEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .payments
            .rows
            .values()
            .filter(|p| p.student_id == student_id)
            .map(|payment| {
                let request = payment
                    .clearance_request_id
                    .and_then(|id| state.requests.get(id));
                BillingEntry {
                    payment: payment.clone(),
                    submission_number: request.as_ref().map(|r| r.submission_number.clone()),
                    request_status: request.map(|r| r.status),
                }
            })
            .collect();
        newest_first(&mut entries, |e| (e.payment.created_at, e.payment.id));
        Ok(entries)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, new: NewNotification) -> AppResult<notification::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        Ok(state.notifications.insert_with(|id| notification::Model {
            id,
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            notification_type: new.notification_type,
            reference_id: new.reference_id,
            is_read: false,
            created_at: new.created_at,
        }))
    }

    async fn list_since(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<notification::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .notifications
            .rows
            .values()
            .filter(|n| n.user_id == user_id && n.created_at >= since)
            .cloned()
            .collect();
        newest_first(&mut rows, |n| (n.created_at, n.id));
        Ok(rows)
    }

    async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        match state.notifications.rows.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let mut count = 0;
        for n in state
            .notifications
            .rows
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl ExitPermitStore for MemoryStore {
    async fn create(&self, new: NewExitPermit) -> AppResult<exit_permit::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        Ok(state.permits.insert_with(|id| exit_permit::Model {
            id,
            student_id: new.student_id,
            manager_id: None,
            reason: new.reason,
            requested_at: new.requested_at,
            out_at: new.out_at,
            return_at: new.return_at,
            document_path: new.document_path,
            status: PermitStatus::Pending,
            notes: None,
            updated_at: new.requested_at,
        }))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<exit_permit::Model>> {
        Ok(self.state.read().await.permits.get(id))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<exit_permit::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .permits
            .rows
            .values()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.requested_at, p.id));
        Ok(rows)
    }

    async fn list(&self, status: Option<PermitStatus>) -> AppResult<Vec<exit_permit::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .permits
            .rows
            .values()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.requested_at, p.id));
        Ok(rows)
    }

    async fn transition(
        &self,
        id: i32,
        from: &[PermitStatus],
        change: PermitChange,
    ) -> AppResult<exit_permit::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let Some(stored) = state.permits.rows.get_mut(&id) else {
            return Err(AppError::NotFound("Izin keluar tidak ditemukan".to_string()));
        };
        if !from.contains(&stored.status) {
            return Err(permit_moved_on(stored.status));
        }
        stored.manager_id = change.manager_id;
        stored.status = change.status;
        stored.notes = change.notes;
        stored.updated_at = change.updated_at;
        Ok(stored.clone())
    }

    async fn delete_pending(&self, id: i32) -> AppResult<()> {
        let mut guard = self.state.write().await;
        let Some(stored) = guard.permits.rows.get(&id) else {
            return Err(AppError::NotFound("Izin keluar tidak ditemukan".to_string()));
        };
        if stored.status != PermitStatus::Pending {
            return Err(permit_moved_on(stored.status));
        }
        guard.permits.rows.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl DamageReportStore for MemoryStore {
    async fn create(&self, new: NewDamageReport) -> AppResult<damage_report::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        Ok(state.reports.insert_with(|id| damage_report::Model {
            id,
            student_id: new.student_id,
            description: new.description,
            location: new.location,
            category: new.category,
            photo_path: new.photo_path,
            status: ReportStatus::UnderReview,
            created_at: new.created_at,
            updated_at: new.created_at,
        }))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<damage_report::Model>> {
        Ok(self.state.read().await.reports.get(id))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<damage_report::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .reports
            .rows
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn list(&self, status: Option<ReportStatus>) -> AppResult<Vec<damage_report::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .reports
            .rows
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn update_status(
        &self,
        id: i32,
        status: ReportStatus,
        at: DateTime<Utc>,
    ) -> AppResult<damage_report::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let Some(report) = state.reports.rows.get_mut(&id) else {
            return Err(AppError::NotFound("Laporan tidak ditemukan".to_string()));
        };
        report.status = status;
        report.updated_at = at;
        Ok(report.clone())
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn create(&self, new: NewAnnouncement) -> AppResult<announcement::Model> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        Ok(state.announcements.insert_with(|id| announcement::Model {
            id,
            manager_id: Some(new.manager_id),
            title: new.title,
            content: new.content,
            created_at: new.created_at,
            updated_at: new.created_at,
        }))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<announcement::Model>> {
        Ok(self.state.read().await.announcements.get(id))
    }

    async fn list(&self) -> AppResult<Vec<announcement::Model>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.announcements.rows.values().cloned().collect();
        newest_first(&mut rows, |a| (a.created_at, a.id));
        Ok(rows)
    }

    async fn delete_with_notifications(&self, id: i32) -> AppResult<u64> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.announcements.rows.remove(&id).is_none() {
            return Err(AppError::NotFound("Pengumuman tidak ditemukan".to_string()));
        }

        let reference = id.to_string();
        let before = state.notifications.rows.len();
        state.notifications.rows.retain(|_, n| {
            !(n.notification_type == NotificationType::Announcement
                && n.reference_id.as_deref() == Some(reference.as_str()))
        });
        Ok((before - state.notifications.rows.len()) as u64)
    }
}
