/// Session-bound JWT bearer tokens
///
/// Tokens are signed with HS256. Besides the standard claims they carry the
/// id of the server-side session (`sid`) so that logging out can revoke a
/// token before it expires, and the user's global role for logging.
///
/// Validation here is purely cryptographic (signature, issuer, `exp`, `nbf`);
/// checking that the session still exists is the caller's job.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use teamboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use teamboard_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-very-long-secret-key-of-at-least-32-chars";
/// let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), UserRole::Member, Duration::hours(24));
///
/// let token = create_token(&claims, secret)?;
/// let decoded = validate_token(&token, secret)?;
/// assert_eq!(decoded.sid, claims.sid);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Value of the `iss` claim
pub const ISSUER: &str = "teamboard";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    /// Session id
    pub sid: Uuid,

    /// Global role at issue time (informational, authorization re-reads the user)
    pub role: UserRole,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, session_id: Uuid, role: UserRole, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            sid: session_id,
            role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";

    fn claims() -> Claims {
        Claims::new(Uuid::new_v4(), Uuid::new_v4(), UserRole::Leader, Duration::hours(1))
    }

    #[test]
    fn test_roundtrip_preserves_claims() {
        let claims = claims();
        let token = create_token(&claims, SECRET).unwrap();
        let decoded = validate_token(&token, SECRET).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.iss, "teamboard");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(&claims(), SECRET).unwrap();
        let result = validate_token(&token, "another-secret-key-that-is-also-long-enough");
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut claims = claims();
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = Utc::now().timestamp() - 60;

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let mut claims = claims();
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(validate_token("not.a.token", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_expires_at_matches_exp() {
        let claims = claims();
        assert_eq!(claims.expires_at().timestamp(), claims.exp);
    }
}
