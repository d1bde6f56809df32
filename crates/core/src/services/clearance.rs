//! Dormitory clearance ("bebas asrama") workflow.
//!
//! ```text
//! FACILITY_VERIFICATION -> AWAITING_PAYMENT -> PAYMENT_VERIFICATION -> COMPLETED
//!                               ^                      |
//!                               +------ rejected ------+
//! ```
//!
//! Each transition is one atomic store operation. Notifications go out only
//! after it has committed.

use std::str::FromStr;
use std::sync::Arc;

use asrama_common::{
    AppError, AppResult, FileStore, IdGenerator, UploadCategory, UploadedFile, format_rupiah,
};
use asrama_db::entities::clearance_request::{self, ClearanceStatus, FacilityStatus};
use asrama_db::entities::notification::NotificationType;
use asrama_db::entities::payment_record;
use asrama_db::{
    BillingEntry, ClearanceDetail, ClearanceStore, DirectoryStore, FacilityVerification,
    NewClearanceRequest, NewDamageItem, PaymentDecision,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::notification::{NotificationDraft, NotificationService};

/// One damage charge entered by the manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageItemInput {
    pub facility_name: String,
    pub cost: Decimal,
}

/// Input for facility verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFacilitiesInput {
    /// `COMPLETE` or `INCOMPLETE`.
    pub facility_status: String,
    #[serde(default)]
    pub damage_items: Vec<DamageItemInput>,
}

/// Request and payment record after facility verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityVerificationOutcome {
    #[serde(flatten)]
    pub request: clearance_request::Model,
    pub payment: payment_record::Model,
}

/// Service for the clearance request lifecycle.
#[derive(Clone)]
pub struct ClearanceService {
    store: Arc<dyn ClearanceStore>,
    directory: Arc<dyn DirectoryStore>,
    notifications: NotificationService,
    files: Arc<dyn FileStore>,
    id_gen: IdGenerator,
    base_fee: Decimal,
}

impl ClearanceService {
    /// Create a new clearance service charging `base_fee` to unsubsidised students.
    #[must_use]
    pub fn new(
        store: Arc<dyn ClearanceStore>,
        directory: Arc<dyn DirectoryStore>,
        notifications: NotificationService,
        files: Arc<dyn FileStore>,
        base_fee: Decimal,
    ) -> Self {
        Self {
            store,
            directory,
            notifications,
            files,
            id_gen: IdGenerator::new(),
            base_fee,
        }
    }

    /// Submit a new clearance request for a student.
    pub async fn submit(&self, student_id: i32) -> AppResult<clearance_request::Model> {
        let student = self
            .directory
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Data mahasiswa tidak ditemukan".to_string()))?;

        if self.store.find_active(student_id).await?.is_some() {
            return Err(AppError::Conflict(
                "Anda masih memiliki pengajuan bebas asrama yang belum selesai".to_string(),
            ));
        }

        let total_fee = if student.student.is_kipk {
            Decimal::ZERO
        } else {
            self.base_fee
        };

        // The store rejects a concurrent duplicate with Conflict as well.
        let request = self
            .store
            .create(NewClearanceRequest {
                student_id,
                submission_number: self.id_gen.submission_number(),
                total_fee,
                submitted_at: Utc::now(),
            })
            .await?;

        info!(
            request_id = request.id,
            student_id,
            submission_number = %request.submission_number,
            "Clearance request submitted"
        );

        self.notifications
            .notify_managers(&NotificationDraft::new(
                NotificationType::Clearance,
                "Pengajuan Bebas Asrama Baru",
                format!(
                    "{} ({}) mengajukan surat bebas asrama dengan nomor {}",
                    student.student.name, student.student.nim, request.submission_number
                ),
                request.id,
            ))
            .await;

        Ok(request)
    }

    /// Record the facility inspection and open the payment.
    pub async fn verify_facilities(
        &self,
        manager_id: i32,
        request_id: i32,
        input: VerifyFacilitiesInput,
    ) -> AppResult<FacilityVerificationOutcome> {
        let facility_status = FacilityStatus::from_str(input.facility_status.trim())
            .map_err(AppError::BadRequest)?;

        let items = match facility_status {
            FacilityStatus::Complete => Vec::new(),
            FacilityStatus::Incomplete => validate_damage_items(input.damage_items)?,
        };
        let additional_fee: Decimal = items.iter().map(|item| item.cost).sum();

        // The store rejects a COMPLETED request under its lock.
        let request = self.get(request_id).await?;
        let total_fee = request.base_fee() + additional_fee;
        let (request, payment) = self
            .store
            .verify_facilities(
                request_id,
                FacilityVerification {
                    manager_id,
                    facility_status,
                    additional_fee,
                    total_fee,
                    items,
                    verified_at: Utc::now(),
                },
            )
            .await?;

        info!(
            request_id,
            manager_id,
            facility_status = ?facility_status,
            %total_fee,
            "Facilities verified"
        );

        self.notifications
            .notify_student(
                request.student_id,
                &NotificationDraft::new(
                    NotificationType::Clearance,
                    "Status Pengajuan Bebas Asrama",
                    format!(
                        "Status pengajuan {} diperbarui menjadi {}. Total tagihan: {}",
                        request.submission_number,
                        request.status.label(),
                        format_rupiah(request.total_fee)
                    ),
                    request.id,
                ),
            )
            .await;

        Ok(FacilityVerificationOutcome { request, payment })
    }

    /// Upload or re-upload the proof for one of the student's payments.
    pub async fn upload_payment_proof(
        &self,
        student_id: i32,
        payment_id: i32,
        file: Option<UploadedFile>,
    ) -> AppResult<payment_record::Model> {
        let file = file.ok_or_else(|| {
            AppError::BadRequest("Bukti pembayaran wajib diunggah".to_string())
        })?;

        let payment = self
            .store
            .find_payment(payment_id)
            .await?
            .filter(|p| p.student_id == student_id)
            .ok_or_else(|| AppError::NotFound("Data pembayaran tidak ditemukan".to_string()))?;

        if let Some(request_id) = payment.clearance_request_id {
            let request = self.get(request_id).await?;
            if request.status == ClearanceStatus::Completed {
                return Err(AppError::Conflict(
                    "Pengajuan bebas asrama ini sudah selesai".to_string(),
                ));
            }
        }

        let stored = self.files.save(UploadCategory::PaymentProof, &file).await?;
        let payment = self
            .store
            .attach_proof(payment.id, stored.path, Utc::now())
            .await?;

        info!(payment_id, student_id, "Payment proof uploaded");

        if let Some(request_id) = payment.clearance_request_id {
            self.notifications
                .notify_managers(&NotificationDraft::new(
                    NotificationType::Clearance,
                    "Bukti Pembayaran Baru",
                    "Mahasiswa mengunggah bukti pembayaran bebas asrama yang perlu diverifikasi",
                    request_id,
                ))
                .await;
        }

        Ok(payment)
    }

    /// Accept the payment and complete the request.
    pub async fn approve_payment(
        &self,
        manager_id: i32,
        request_id: i32,
    ) -> AppResult<clearance_request::Model> {
        self.decide_payment(manager_id, request_id, PaymentDecision::Approve)
            .await
    }

    /// Reject the payment proof; the student has to upload a new one.
    pub async fn reject_payment(
        &self,
        manager_id: i32,
        request_id: i32,
    ) -> AppResult<clearance_request::Model> {
        self.decide_payment(manager_id, request_id, PaymentDecision::Reject)
            .await
    }

    async fn decide_payment(
        &self,
        manager_id: i32,
        request_id: i32,
        decision: PaymentDecision,
    ) -> AppResult<clearance_request::Model> {
        let request = self
            .store
            .decide_payment(request_id, manager_id, decision, Utc::now())
            .await?;

        info!(request_id, manager_id, decision = ?decision, "Payment reviewed");

        let message = match decision {
            PaymentDecision::Approve => format!(
                "Pembayaran untuk pengajuan {} telah diverifikasi. Status: {}",
                request.submission_number,
                request.status.label()
            ),
            PaymentDecision::Reject => format!(
                "Bukti pembayaran untuk pengajuan {} ditolak. Silakan unggah ulang bukti pembayaran",
                request.submission_number
            ),
        };
        self.notifications
            .notify_student(
                request.student_id,
                &NotificationDraft::new(
                    NotificationType::Clearance,
                    "Status Pembayaran Bebas Asrama",
                    message,
                    request.id,
                ),
            )
            .await;

        Ok(request)
    }

    /// Delete one of the student's requests.
    pub async fn delete(&self, student_id: i32, request_id: i32) -> AppResult<()> {
        let request = self.get_for_student(student_id, request_id).await?;
        self.store.delete(request.id).await?;
        info!(request_id, student_id, status = ?request.status, "Clearance request deleted");
        Ok(())
    }

    /// Get a request by id.
    pub async fn get(&self, request_id: i32) -> AppResult<clearance_request::Model> {
        self.store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pengajuan tidak ditemukan".to_string()))
    }

    async fn get_for_student(
        &self,
        student_id: i32,
        request_id: i32,
    ) -> AppResult<clearance_request::Model> {
        let request = self.get(request_id).await?;
        if request.student_id != student_id {
            return Err(AppError::NotFound("Pengajuan tidak ditemukan".to_string()));
        }
        Ok(request)
    }

    /// Full view of a request.
    pub async fn detail(&self, request_id: i32) -> AppResult<ClearanceDetail> {
        self.store
            .detail(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pengajuan tidak ditemukan".to_string()))
    }

    /// Full view of one of the student's requests.
    pub async fn status_for_student(
        &self,
        student_id: i32,
        request_id: i32,
    ) -> AppResult<ClearanceDetail> {
        let detail = self.detail(request_id).await?;
        if detail.request.student_id != student_id {
            return Err(AppError::NotFound("Pengajuan tidak ditemukan".to_string()));
        }
        Ok(detail)
    }

    /// The student's requests, newest first.
    pub async fn history(&self, student_id: i32) -> AppResult<Vec<clearance_request::Model>> {
        self.store.list_for_student(student_id).await
    }

    /// The student's request that is still in progress.
    pub async fn active_for_student(
        &self,
        student_id: i32,
    ) -> AppResult<Option<clearance_request::Model>> {
        self.store.find_active(student_id).await
    }

    /// The student's payments.
    pub async fn billing(&self, student_id: i32) -> AppResult<Vec<BillingEntry>> {
        self.store.billing_for_student(student_id).await
    }

    /// All requests for managers, optionally by status.
    pub async fn list(
        &self,
        status: Option<ClearanceStatus>,
    ) -> AppResult<Vec<clearance_request::Model>> {
        self.store.list(status).await
    }
}

fn validate_damage_items(items: Vec<DamageItemInput>) -> AppResult<Vec<NewDamageItem>> {
    items
        .into_iter()
        .map(|item| {
            let facility_name = item.facility_name.trim().to_string();
            if facility_name.is_empty() {
                return Err(AppError::BadRequest("Nama fasilitas wajib diisi".to_string()));
            }
            if item.cost.is_sign_negative() {
                return Err(AppError::BadRequest(format!(
                    "Biaya kerusakan {facility_name} tidak boleh negatif"
                )));
            }
            Ok(NewDamageItem {
                facility_name,
                cost: item.cost,
            })
        })
        .collect()
}
