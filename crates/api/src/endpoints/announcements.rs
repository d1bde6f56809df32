//! Announcement endpoints.

use asrama_common::AppResult;
use asrama_core::CreateAnnouncementInput;
use asrama_db::entities::announcement;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};

use crate::{
    extractors::{AuthUser, ManagerActor, parse_id},
    middleware::AppState,
    response::ApiResponse,
};

/// Routes for any signed-in user, nested under `/announcements`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements))
        .route("/{id}", get(get_announcement))
}

/// Manager routes, nested under `/manager/announcements`.
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_announcement))
        .route("/{id}", delete(delete_announcement))
}

async fn list_announcements(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<announcement::Model>>> {
    let announcements = state.announcement_service.list().await?;
    Ok(ApiResponse::ok(announcements))
}

async fn get_announcement(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<announcement::Model>> {
    let announcement = state.announcement_service.get(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(announcement))
}

async fn create_announcement(
    actor: ManagerActor,
    State(state): State<AppState>,
    Json(input): Json<CreateAnnouncementInput>,
) -> AppResult<ApiResponse<announcement::Model>> {
    let announcement = state
        .announcement_service
        .create(actor.manager_id, input)
        .await?;
    Ok(ApiResponse::created(announcement).with_message("Pengumuman berhasil dibuat"))
}

async fn delete_announcement(
    _actor: ManagerActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.announcement_service.delete(parse_id(&id)?).await?;
    Ok(ApiResponse::message("Pengumuman berhasil dihapus"))
}
