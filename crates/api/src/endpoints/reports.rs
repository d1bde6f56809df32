//! Damage report endpoints.

use asrama_common::{AppError, AppResult};
use asrama_core::SubmitReportInput;
use asrama_db::entities::damage_report::{self, ReportStatus};
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;

use crate::{
    endpoints::StatusFilter,
    extractors::{ManagerActor, StudentActor, parse_id},
    middleware::AppState,
    response::ApiResponse,
    upload::MultipartForm,
};

/// Student routes, nested under `/report`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own).post(submit))
        .route("/{id}", get(get_own))
}

/// Manager routes, nested under `/manager/report`.
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_report))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Multipart form: `category`, `description`, `location` and the `photo` file.
async fn submit(
    actor: StudentActor,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<damage_report::Model>> {
    let mut form = MultipartForm::read(multipart, "photo").await?;
    let input = SubmitReportInput {
        category: form.take("category").unwrap_or_default(),
        description: form.take("description").unwrap_or_default(),
        location: form.take("location").unwrap_or_default(),
    };

    let report = state
        .damage_report_service
        .submit(actor.student_id, input, form.file)
        .await?;
    Ok(ApiResponse::created(report).with_message("Laporan kerusakan berhasil dikirim"))
}

async fn list_own(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<damage_report::Model>>> {
    let reports = state
        .damage_report_service
        .list_for_student(actor.student_id)
        .await?;
    Ok(ApiResponse::ok(reports))
}

async fn get_own(
    actor: StudentActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<damage_report::Model>> {
    let report = state
        .damage_report_service
        .get_for_student(actor.student_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(report))
}

async fn list(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<ApiResponse<Vec<damage_report::Model>>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<ReportStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let reports = state.damage_report_service.list(status).await?;
    Ok(ApiResponse::ok(reports))
}

async fn get_report(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<damage_report::Model>> {
    let report = state.damage_report_service.get(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(report))
}

async fn update_status(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<ApiResponse<damage_report::Model>> {
    let report = state
        .damage_report_service
        .update_status(parse_id(&id)?, &req.status)
        .await?;
    Ok(ApiResponse::ok(report).with_message("Status laporan diperbarui"))
}
