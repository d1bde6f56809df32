//! HTTP API layer for the dormitory portal.
//!
//! - **Endpoints**: student and manager workflows under `/api`
//! - **Extractors**: authenticated actor and role guards
//! - **Middleware**: token verification from header or cookie
//! - **Streaming**: Server-Sent Events for notifications
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;
pub mod upload;

pub use endpoints::router;
pub use middleware::{AppState, AuthSettings};
pub use sse::SseBroadcaster;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body: the 10 MB permit document plus form fields.
const MAX_BODY_BYTES: usize = 11 * 1024 * 1024;

/// The `/api` router with authentication applied, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
