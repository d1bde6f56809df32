//! Exit permit ("izin keluar") endpoints.

use asrama_common::{AppError, AppResult};
use asrama_core::SubmitPermitInput;
use asrama_db::entities::exit_permit::{self, PermitStatus};
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

/// Student routes, nested under `/permit`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own).post(submit))
        .route("/{id}", get(get_own).delete(cancel))
}

/// Manager routes, nested under `/manager/permit`.
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_permit))
        .route("/{id}/approve", put(approve))
        .route("/{id}/reject", put(reject))
        .route("/{id}/reset", put(reset))
        .route("/{id}/notes", put(update_notes))
}

/// Body of reject and notes updates.
#[derive(Debug, Default, Deserialize)]
pub struct NotesRequest {
    pub notes: Option<String>,
}

/// Multipart form: `reason`, `outDate`, `outTime`, `returnDate`,
/// `returnTime` and the `document` file.
async fn submit(
    actor: StudentActor,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let mut form = MultipartForm::read(multipart, "document").await?;
    let input = SubmitPermitInput {
        reason: form.take("reason"),
        out_date: form.take("outDate"),
        out_time: form.take("outTime"),
        return_date: form.take("returnDate"),
        return_time: form.take("returnTime"),
    };

    let permit = state
        .exit_permit_service
        .submit(actor.student_id, input, form.file)
        .await?;
    Ok(ApiResponse::created(permit).with_message("Pengajuan izin keluar berhasil dikirim"))
}

async fn list_own(
    actor: StudentActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<exit_permit::Model>>> {
    let permits = state
        .exit_permit_service
        .list_for_student(actor.student_id)
        .await?;
    Ok(ApiResponse::ok(permits))
}

async fn get_own(
    actor: StudentActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let permit = state
        .exit_permit_service
        .get_for_student(actor.student_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(permit))
}

async fn cancel(
    actor: StudentActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .exit_permit_service
        .cancel(actor.student_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::message("Pengajuan izin keluar dibatalkan"))
}

async fn list(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<ApiResponse<Vec<exit_permit::Model>>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<PermitStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let permits = state.exit_permit_service.list(status).await?;
    Ok(ApiResponse::ok(permits))
}

async fn get_permit(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let permit = state.exit_permit_service.get(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(permit))
}

async fn approve(
    actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let permit = state
        .exit_permit_service
        .approve(actor.manager_id, parse_id(&id)?)
        .await?;
    Ok(ApiResponse::ok(permit).with_message("Izin keluar disetujui"))
}

async fn reject(
    actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<NotesRequest>>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let id = parse_id(&id)?;
    let notes = body.and_then(|Json(body)| body.notes);
    let permit = state
        .exit_permit_service
        .reject(actor.manager_id, id, notes)
        .await?;
    Ok(ApiResponse::ok(permit).with_message("Izin keluar ditolak"))
}

async fn reset(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let permit = state.exit_permit_service.reset(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(permit).with_message("Status izin keluar dikembalikan ke menunggu"))
}

async fn update_notes(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<NotesRequest>>,
) -> AppResult<ApiResponse<exit_permit::Model>> {
    let id = parse_id(&id)?;
    let notes = body.and_then(|Json(body)| body.notes);
    let permit = state.exit_permit_service.update_notes(id, notes).await?;
    Ok(ApiResponse::ok(permit))
}
