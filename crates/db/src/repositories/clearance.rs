//! Clearance request repository.

use std::sync::Arc;

use async_trait::async_trait;
use asrama_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    sea_query::Expr,
};

use crate::entities::{
    ClearanceRequest, DamageLineItem, PaymentRecord, Student, clearance_request,
    damage_line_item, payment_record,
};
use crate::store::{
    BillingEntry, ClearanceDetail, ClearanceStore, FacilityVerification, NewClearanceRequest,
    PaymentDecision, ensure_open,
};
use clearance_request::ClearanceStatus;
use payment_record::ProofStatus;

/// Clearance request repository for database operations.
#[derive(Clone)]
pub struct ClearanceRepository {
    db: Arc<DatabaseConnection>,
}

impl ClearanceRepository {
    /// Create a new clearance repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn map_create_error(e: &DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
            "Anda masih memiliki pengajuan bebas asrama yang belum selesai".to_string(),
        ),
        _ => AppError::Database(e.to_string()),
    }
}

#[async_trait]
impl ClearanceStore for ClearanceRepository {
    async fn find_active(&self, student_id: i32) -> AppResult<Option<clearance_request::Model>> {
        ClearanceRequest::find()
            .filter(clearance_request::Column::StudentId.eq(student_id))
            .filter(clearance_request::Column::Status.ne(ClearanceStatus::Completed))
            .order_by_desc(clearance_request::Column::SubmittedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create(&self, new: NewClearanceRequest) -> AppResult<clearance_request::Model> {
        let model = clearance_request::ActiveModel {
            student_id: Set(new.student_id),
            manager_id: Set(None),
            submission_number: Set(new.submission_number),
            total_fee: Set(new.total_fee),
            facility_status: Set(None),
            additional_fee: Set(rust_decimal::Decimal::ZERO),
            status: Set(ClearanceStatus::FacilityVerification),
            submitted_at: Set(new.submitted_at),
            updated_at: Set(new.submitted_at),
            ..Default::default()
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_create_error(&e))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<clearance_request::Model>> {
        ClearanceRequest::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn detail(&self, id: i32) -> AppResult<Option<ClearanceDetail>> {
        let Some((request, student)) = ClearanceRequest::find_by_id(id)
            .find_also_related(Student)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let damage_items = request
            .find_related(DamageLineItem)
            .order_by_asc(damage_line_item::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let payments = request
            .find_related(PaymentRecord)
            .order_by_asc(payment_record::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(ClearanceDetail {
            request,
            student,
            damage_items,
            payments,
        }))
    }

    async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<clearance_request::Model>> {
        ClearanceRequest::find()
            .filter(clearance_request::Column::StudentId.eq(student_id))
            .order_by_desc(clearance_request::Column::SubmittedAt)
            .order_by_desc(clearance_request::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(
        &self,
        status: Option<ClearanceStatus>,
    ) -> AppResult<Vec<clearance_request::Model>> {
        let mut query = ClearanceRequest::find()
            .order_by_desc(clearance_request::Column::SubmittedAt)
            .order_by_desc(clearance_request::Column::Id);

        if let Some(status) = status {
            query = query.filter(clearance_request::Column::Status.eq(status));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn verify_facilities(
        &self,
        request_id: i32,
        verification: FacilityVerification,
    ) -> AppResult<(clearance_request::Model, payment_record::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let request = ClearanceRequest::find_by_id(request_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Pengajuan tidak ditemukan".to_string()))?;
        ensure_open(&request)?;

        DamageLineItem::delete_many()
            .filter(damage_line_item::Column::ClearanceRequestId.eq(request_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let student_id = request.student_id;
        let mut active = request.into_active_model();
        active.manager_id = Set(Some(verification.manager_id));
        active.facility_status = Set(Some(verification.facility_status));
        active.additional_fee = Set(verification.additional_fee);
        active.total_fee = Set(verification.total_fee);
        active.status = Set(ClearanceStatus::AwaitingPayment);
        active.updated_at = Set(verification.verified_at);
        let request = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = PaymentRecord::find()
            .filter(payment_record::Column::ClearanceRequestId.eq(request_id))
            .order_by_asc(payment_record::Column::Id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let payment = match existing {
            Some(payment) => {
                let mut active = payment.into_active_model();
                active.amount = Set(verification.total_fee);
                active.proof_status = Set(ProofStatus::Unverified);
                active.proof_path = Set(None);
                active.paid_at = Set(None);
                active.updated_at = Set(verification.verified_at);
                active.update(&txn).await
            }
            None => {
                payment_record::ActiveModel {
                    clearance_request_id: Set(Some(request_id)),
                    student_id: Set(student_id),
                    amount: Set(verification.total_fee),
                    proof_path: Set(None),
                    proof_status: Set(ProofStatus::Unverified),
                    paid_at: Set(None),
                    created_at: Set(verification.verified_at),
                    updated_at: Set(verification.verified_at),
                    ..Default::default()
                }
                .insert(&txn)
                .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        if !verification.items.is_empty() {
            let items = verification
                .items
                .into_iter()
                .map(|item| damage_line_item::ActiveModel {
                    clearance_request_id: Set(request_id),
                    facility_name: Set(item.facility_name),
                    cost: Set(item.cost),
                    ..Default::default()
                });

            DamageLineItem::insert_many(items)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((request, payment))
    }

    async fn find_payment(&self, payment_id: i32) -> AppResult<Option<payment_record::Model>> {
        PaymentRecord::find_by_id(payment_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn attach_proof(
        &self,
        payment_id: i32,
        proof_path: String,
        at: DateTime<Utc>,
    ) -> AppResult<payment_record::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let payment = PaymentRecord::find_by_id(payment_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Data pembayaran tidak ditemukan".to_string()))?;

        let request_id = payment.clearance_request_id;
        if let Some(request_id) = request_id {
            let request = ClearanceRequest::find_by_id(request_id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if let Some(request) = request {
                ensure_open(&request)?;
            }
        }

        let mut active = payment.into_active_model();
        active.proof_path = Set(Some(proof_path));
        active.proof_status = Set(ProofStatus::Unverified);
        active.paid_at = Set(Some(at));
        active.updated_at = Set(at);
        let payment = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(request_id) = request_id {
            ClearanceRequest::update_many()
                .col_expr(
                    clearance_request::Column::Status,
                    Expr::value(ClearanceStatus::PaymentVerification),
                )
                .col_expr(clearance_request::Column::UpdatedAt, Expr::value(at))
                .filter(clearance_request::Column::Id.eq(request_id))
                .exec(&txn)
                .await
                .map_err(|e| map_create_error(&e))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(payment)
    }

    async fn decide_payment(
        &self,
        request_id: i32,
        manager_id: i32,
        decision: PaymentDecision,
        at: DateTime<Utc>,
    ) -> AppResult<clearance_request::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let request = ClearanceRequest::find_by_id(request_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Pengajuan tidak ditemukan".to_string()))?;
        ensure_open(&request)?;

        let mut payments = PaymentRecord::update_many()
            .col_expr(
                payment_record::Column::ProofStatus,
                Expr::value(decision.proof_status()),
            )
            .col_expr(payment_record::Column::UpdatedAt, Expr::value(at))
            .filter(payment_record::Column::ClearanceRequestId.eq(request_id));

        if decision == PaymentDecision::Reject {
            payments = payments.col_expr(
                payment_record::Column::ProofPath,
                Expr::value(Option::<String>::None),
            );
        }

        let updated = payments
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            return Err(AppError::Conflict("Pengajuan belum memiliki data pembayaran".to_string()));
        }

        let mut active = request.into_active_model();
        active.manager_id = Set(Some(manager_id));
        active.status = Set(decision.request_status());
        active.updated_at = Set(at);
        let request = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(request)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        ClearanceRequest::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn billing_for_student(&self, student_id: i32) -> AppResult<Vec<BillingEntry>> {
        let rows = PaymentRecord::find()
            .filter(payment_record::Column::StudentId.eq(student_id))
            .find_also_related(ClearanceRequest)
            .order_by_desc(payment_record::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(payment, request)| BillingEntry {
                payment,
                submission_number: request.as_ref().map(|r| r.submission_number.clone()),
                request_status: request.map(|r| r.status),
            })
            .collect())
    }
}
