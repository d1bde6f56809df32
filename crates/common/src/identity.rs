//! Request identity.
//!
//! Tokens are issued by the login service; this module only verifies them and
//! turns the claims into a [`CurrentUser`] for the workflows.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Dormitory resident.
    Student,
    /// Dormitory manager.
    Manager,
}

/// The authenticated actor of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// User account id.
    pub id: i32,
    /// Account role.
    pub role: Role,
    /// Linked student profile, if any.
    pub student_profile_id: Option<i32>,
    /// Linked manager profile, if any.
    pub manager_profile_id: Option<i32>,
}

impl CurrentUser {
    /// Student profile of the actor, or `Forbidden` when the account has none.
    pub fn require_student(&self) -> AppResult<i32> {
        match (self.role, self.student_profile_id) {
            (Role::Student, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden("Akun tidak memiliki profil mahasiswa".to_string())),
        }
    }

    /// Manager profile of the actor, or `Forbidden` when the account has none.
    pub fn require_manager(&self) -> AppResult<i32> {
        match (self.role, self.manager_profile_id) {
            (Role::Manager, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden(
                "Hanya pengelola asrama yang dapat melakukan aksi ini".to_string(),
            )),
        }
    }
}

/// JWT claims carried by session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User account id.
    pub sub: i32,
    /// Account role.
    pub role: Role,
    /// Linked student profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i32>,
    /// Linked manager profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i32>,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            student_profile_id: claims.student_id,
            manager_profile_id: claims.manager_id,
        }
    }
}

/// HS256 token verifier.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier from the shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and resolve the actor.
    pub fn verify(&self, token: &str) -> AppResult<CurrentUser> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims.into())
    }

    /// Sign a token for the given actor. Used by tooling and tests; the login
    /// service owns real issuance.
    pub fn sign(&self, user: &CurrentUser, ttl: chrono::Duration) -> AppResult<String> {
        let claims = Claims {
            sub: user.id,
            role: user.role,
            student_id: user.student_profile_id,
            manager_id: user.manager_profile_id,
            exp: (chrono::Utc::now() + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn student() -> CurrentUser {
        CurrentUser {
            id: 7,
            role: Role::Student,
            student_profile_id: Some(3),
            manager_profile_id: None,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.sign(&student(), chrono::Duration::hours(1)).unwrap();

        let user = verifier.verify(&token).unwrap();
        assert_eq!(user, student());
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = TokenVerifier::new("a")
            .sign(&student(), chrono::Duration::hours(1))
            .unwrap();

        let err = TokenVerifier::new("b").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier
            .sign(&student(), chrono::Duration::hours(-2))
            .unwrap();

        assert!(matches!(
            verifier.verify(&token).unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[test]
    fn test_role_requirements() {
        let user = student();
        assert_eq!(user.require_student().unwrap(), 3);
        assert!(matches!(
            user.require_manager().unwrap_err(),
            AppError::Forbidden(_)
        ));

        let orphan = CurrentUser {
            student_profile_id: None,
            ..student()
        };
        assert!(matches!(
            orphan.require_student().unwrap_err(),
            AppError::Forbidden(_)
        ));
    }
}
