//! API endpoints.

mod announcements;
mod clearance;
mod notifications;
mod permits;
mod reports;

use axum::Router;
use serde::Deserialize;

use crate::middleware::AppState;

/// Optional `?status=` filter of manager listings.
#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/clearance", clearance::router())
        .nest("/permit", permits::router())
        .nest("/report", reports::router())
        .nest("/announcements", announcements::router())
        .nest("/notifications", notifications::router())
        .nest("/manager/clearance", clearance::manager_router())
        .nest("/manager/permit", permits::manager_router())
        .nest("/manager/report", reports::manager_router())
        .nest("/manager/announcements", announcements::manager_router())
}
