/// Request authentication
///
/// [`authenticate`] turns an `Authorization: Bearer <jwt>` header into an
/// [`AuthContext`]: it validates the token, then loads the user through the
/// session the token points at. A token whose session was deleted (logout,
/// password reset) is rejected even if it has not expired yet.
///
/// The HTTP layer wraps this in an axum middleware and stores the context
/// in the request extensions.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::session::Session;
use crate::models::user::{User, UserRole, UserSummary};

/// The authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn from_user(user: &User, session_id: Uuid) -> Self {
        Self {
            user_id: user.id,
            session_id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, AuthError> {
    let value = header_value.ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Authenticates a request from its `Authorization` header value
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    header_value: Option<&str>,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(header_value)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let user = Session::find_active_user(pool, claims.sid, claims.sub)
        .await?
        .ok_or(AuthError::SessionRevoked)?;

    Ok(AuthContext::from_user(&user, claims.sid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwdw==")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(bearer_token(Some("Bearer ")), Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_context_from_user() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Admin,
            email_verified_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let session_id = Uuid::new_v4();

        let context = AuthContext::from_user(&user, session_id);

        assert_eq!(context.user_id, user.id);
        assert_eq!(context.session_id, session_id);
        assert!(context.is_admin());
        assert_eq!(context.summary().email, "root@example.com");
    }
}
