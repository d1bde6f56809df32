//! API state and middleware.

use std::sync::Arc;

use asrama_common::{CurrentUser, FileStore, TokenVerifier};
use asrama_core::{
    AnnouncementService, ClearanceService, DamageReportService, ExitPermitService,
    NotificationService, RealtimePublisherService,
};
use asrama_db::Stores;
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use rust_decimal::Decimal;
use tracing::debug;

use crate::sse::SseBroadcaster;

/// How requests are authenticated.
#[derive(Clone)]
pub struct AuthSettings {
    pub verifier: TokenVerifier,
    /// Cookie checked when no `Authorization` header is present.
    pub cookie_name: String,
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub notification_service: NotificationService,
    pub clearance_service: ClearanceService,
    pub exit_permit_service: ExitPermitService,
    pub damage_report_service: DamageReportService,
    pub announcement_service: AnnouncementService,
    pub auth: AuthSettings,
    pub sse_broadcaster: SseBroadcaster,
}

impl AppState {
    /// Wire every service over the given stores.
    #[must_use]
    pub fn new(
        stores: &Stores,
        files: Arc<dyn FileStore>,
        publisher: RealtimePublisherService,
        base_fee: Decimal,
        auth: AuthSettings,
        sse_broadcaster: SseBroadcaster,
    ) -> Self {
        let notification_service = NotificationService::new(
            stores.notifications.clone(),
            stores.directory.clone(),
            publisher,
        );
        let clearance_service = ClearanceService::new(
            stores.clearance.clone(),
            stores.directory.clone(),
            notification_service.clone(),
            files.clone(),
            base_fee,
        );
        let exit_permit_service = ExitPermitService::new(
            stores.permits.clone(),
            stores.directory.clone(),
            notification_service.clone(),
            files.clone(),
        );
        let damage_report_service = DamageReportService::new(
            stores.reports.clone(),
            stores.directory.clone(),
            notification_service.clone(),
            files,
        );
        let announcement_service =
            AnnouncementService::new(stores.announcements.clone(), notification_service.clone());

        Self {
            notification_service,
            clearance_service,
            exit_permit_service,
            damage_report_service,
            announcement_service,
            auth,
            sse_broadcaster,
        }
    }
}

/// Authentication middleware.
///
/// Resolves the actor from a bearer token, falling back to the session
/// cookie. Requests without a valid token continue unauthenticated and are
/// rejected by the extractors of protected routes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = token_from_request(&req, &state.auth.cookie_name) {
        match state.auth.verifier.verify(&token) {
            Ok(user) => {
                req.extensions_mut().insert::<CurrentUser>(user);
            }
            Err(e) => debug!(error = %e, "Rejected session token"),
        }
    }

    next.run(req).await
}

fn token_from_request(req: &Request<Body>, cookie_name: &str) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(req.headers())
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_header_wins() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc")
            .header(header::COOKIE, "token=def")
            .body(Body::empty())
            .unwrap();

        assert_eq!(token_from_request(&req, "token").as_deref(), Some("abc"));
    }

    #[test]
    fn test_token_from_cookie() {
        let req = Request::builder()
            .header(header::COOKIE, "theme=dark; token=def")
            .body(Body::empty())
            .unwrap();

        assert_eq!(token_from_request(&req, "token").as_deref(), Some("def"));
        assert!(token_from_request(&req, "session").is_none());
    }
}
