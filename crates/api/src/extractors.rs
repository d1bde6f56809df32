//! Request extractors.

use asrama_common::{AppError, CurrentUser};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// An authenticated student, with their student profile id.
#[derive(Debug, Clone)]
pub struct StudentActor {
    pub user: CurrentUser,
    pub student_id: i32,
}

impl<S> FromRequestParts<S> for StudentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        let student_id = user.require_student()?;
        Ok(Self { user, student_id })
    }
}

/// An authenticated manager, with their manager profile id.
#[derive(Debug, Clone)]
pub struct ManagerActor {
    pub user: CurrentUser,
    pub manager_id: i32,
}

impl<S> FromRequestParts<S> for ManagerActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        let manager_id = user.require_manager()?;
        Ok(Self { user, manager_id })
    }
}

/// Parse a numeric id from a path segment.
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("ID tidak valid: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").ok(), Some(12));
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id("0"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id("-3"), Err(AppError::BadRequest(_))));
    }
}
