//! Clearance ("bebas asrama") endpoints.

use asrama_common::{AppError, AppResult};
use asrama_core::{FacilityVerificationOutcome, VerifyFacilitiesInput};
use asrama_db::entities::clearance_request::{self, ClearanceStatus};
use asrama_db::entities::payment_record;
use asrama_db::{BillingEntry, ClearanceDetail};
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
};

use crate::{
    endpoints::StatusFilter,
    extractors::{ManagerActor, StudentActor, parse_id},
    middleware::AppState,
    response::ApiResponse,
    upload::MultipartForm,
};

/// Student routes, nested under `/clearance`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit).get(history))
        .route("/active", get(active))
        .route("/billing", get(billing))
        .route("/payment/upload", post(upload_payment_proof))
        .route("/{id}", get(status).delete(delete_request))
}

/// Manager routes, nested under `/manager/clearance`.
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(detail))
        .route("/{id}/verify-facilities", post(verify_facilities))
        .route("/payment/{id}/approve", post(approve_payment))
        .route("/payment/{id}/reject", post(reject_payment))
}

async fn submit(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<clearance_request::Model>> {
    let request = state.clearance_service.submit(actor.student_id).await?;
    Ok(ApiResponse::ok(request).with_message("Pengajuan bebas asrama berhasil dibuat"))
}

async fn history(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<clearance_request::Model>>> {
    let requests = state.clearance_service.history(actor.student_id).await?;
    Ok(ApiResponse::ok(requests))
}

async fn active(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<clearance_request::Model>>> {
    let request = state
        .clearance_service
        .active_for_student(actor.student_id)
        .await?;
    Ok(ApiResponse::ok(request))
}

async fn billing(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BillingEntry>>> {
    let entries = state.clearance_service.billing(actor.student_id).await?;
    Ok(ApiResponse::ok(entries))
}

async fn status(
    actor: StudentActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ClearanceDetail>> {
    let detail = state
        .clearance_service
        .status_for_student(actor.student_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(detail))
}

async fn delete_request(
    actor: StudentActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .clearance_service
        .delete(actor.student_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::message("Pengajuan berhasil dihapus"))
}

/// Multipart form: `paymentId` and the `proof` file.
async fn upload_payment_proof(
    actor: StudentActor,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<payment_record::Model>> {
    let mut form = MultipartForm::read(multipart, "proof").await?;
    let payment_id = form
        .take("paymentId")
        .ok_or_else(|| AppError::BadRequest("ID pembayaran wajib diisi".to_string()))?;

    let payment = state
        .clearance_service
        .upload_payment_proof(actor.student_id, parse_id(&payment_id)?, form.file)
        .await?;
    Ok(ApiResponse::ok(payment).with_message("Bukti pembayaran berhasil diunggah"))
}

async fn list(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<ApiResponse<Vec<clearance_request::Model>>> {
    let status = filter
        .status
        .as_deref()
        .map(parse_clearance_status)
        .transpose()?;
    let requests = state.clearance_service.list(status).await?;
    Ok(ApiResponse::ok(requests))
}

async fn detail(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ClearanceDetail>> {
    let detail = state.clearance_service.detail(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(detail))
}

async fn verify_facilities(
    actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<VerifyFacilitiesInput>,
) -> AppResult<ApiResponse<FacilityVerificationOutcome>> {
    let outcome = state
        .clearance_service
        .verify_facilities(actor.manager_id, parse_id(&id)?, input)
        .await?;
    Ok(ApiResponse::ok(outcome).with_message("Verifikasi fasilitas berhasil disimpan"))
}

async fn approve_payment(
    actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<clearance_request::Model>> {
    let request = state
        .clearance_service
        .approve_payment(actor.manager_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(request).with_message("Pembayaran disetujui"))
}

async fn reject_payment(
    actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<clearance_request::Model>> {
    let request = state
        .clearance_service
        .reject_payment(actor.manager_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(request).with_message("Pembayaran ditolak"))
}

fn parse_clearance_status(raw: &str) -> AppResult<ClearanceStatus> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| AppError::BadRequest(format!("Status tidak valid: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clearance_status() {
        assert_eq!(
            parse_clearance_status("AWAITING_PAYMENT").ok(),
            Some(ClearanceStatus::AwaitingPayment)
        );
        assert!(parse_clearance_status("awaiting").is_err());
    }
}
