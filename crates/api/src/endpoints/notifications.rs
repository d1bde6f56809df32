//! Notifications endpoints.

use asrama_common::AppResult;
use asrama_core::NotificationFeed;
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, parse_id},
    middleware::AppState,
    response::ApiResponse,
    sse,
};

/// Routes nested under `/notifications`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/stream", get(sse::notification_stream))
        .route("/{id}/read", put(mark_read))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Last seven days of notifications, split into unread and read.
async fn get_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<NotificationFeed>> {
    let feed = state.notification_service.get_for_user(user.id).await?;
    Ok(ApiResponse::ok(feed))
}

async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_read(parse_id(&id)?, user.id)
        .await?;
    Ok(ApiResponse::message("Notifikasi ditandai sudah dibaca"))
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllReadResponse>> {
    let updated = state.notification_service.mark_all_read(user.id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { updated })
        .with_message("Semua notifikasi ditandai sudah dibaca"))
}
