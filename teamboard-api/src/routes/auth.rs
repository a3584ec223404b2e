/// Authentication endpoints
///
/// Registration is two-step: `POST /api/register` parks the name and the
/// password hash next to a six-digit code, and `POST /api/verify-email`
/// turns that record into a verified user and signs them in.
///
/// Every issued bearer token is backed by a row in `sessions`; logout and
/// password reset delete rows, which invalidates the tokens immediately.
///
/// # Endpoints
///
/// - `POST /api/register`
/// - `POST /api/verify-email`
/// - `POST /api/resend-code`
/// - `POST /api/login`
/// - `POST /api/logout` (authenticated)
/// - `POST /api/refresh` (authenticated)
/// - `POST /api/password/reset/send-code`
/// - `POST /api/password/reset/verify-code`
/// - `POST /api/password/reset`

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{jwt, middleware::AuthContext, password, verification},
    models::{
        email_verification::{EmailVerification, IssueVerification, VerificationPurpose},
        session::Session,
        user::{CreateUser, User, UserRole},
    },
    notify::Notification,
};
use validator::Validate;

use super::clean_name;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{normalize_email, AppJson},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "The name must be between 1 and 100 characters."))]
    pub name: String,

    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    pub password: String,

    pub password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    #[validate(length(equal = 6, message = "The code must be 6 characters."))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    #[validate(length(equal = 6, message = "The code must be 6 characters."))]
    pub code: String,

    pub password: String,

    pub password_confirmation: Option<String>,
}

/// Returned after a successful sign-in
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct PendingVerification {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

fn invalid_code() -> ApiError {
    ApiError::invalid("code", "The verification code is invalid or has expired.")
}

/// Looks up an unexpired code, skipping the query for malformed input
async fn find_code(
    state: &AppState,
    email: &str,
    code: &str,
    purpose: VerificationPurpose,
) -> ApiResult<EmailVerification> {
    if !verification::is_well_formed(code) {
        return Err(invalid_code());
    }

    EmailVerification::find_valid(&state.db, email, code, purpose)
        .await?
        .ok_or_else(invalid_code)
}

fn check_new_password(password: &str, confirmation: Option<&str>) -> ApiResult<()> {
    password::validate_new_password(password, confirmation)
        .map_err(|message| ApiError::invalid("password", message))
}

/// Opens a session for `user` and signs a token pointing at it
async fn issue_token(state: &AppState, user: User) -> ApiResult<AuthPayload> {
    let ttl = state.config.token_ttl();
    let session = Session::create(&state.db, user.id, Utc::now() + ttl).await?;

    let claims = jwt::Claims::new(user.id, session.id, user.role, ttl);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(AuthPayload {
        token,
        token_type: "Bearer",
        expires_at: claims.expires_at(),
        user,
    })
}

async fn send_code(
    state: &AppState,
    email: &str,
    name: Option<String>,
    code: String,
    purpose: VerificationPurpose,
) -> ApiResult<()> {
    state
        .notifier
        .send(Notification::VerificationCode {
            email: email.to_string(),
            name,
            code,
            purpose,
        })
        .await?;

    Ok(())
}

/// Starts a registration
///
/// # Errors
///
/// - `422`: invalid input, password confirmation mismatch, email taken
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<ApiResponse<PendingVerification>> {
    req.validate()?;
    let name = clean_name(&req.name)?;
    check_new_password(&req.password, req.password_confirmation.as_deref())?;

    let email = normalize_email(&req.email);
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::invalid("email", "The email has already been taken."));
    }

    let password_hash = password::hash_password(&req.password)?;
    let code = verification::generate_code();

    let record = EmailVerification::issue(
        &state.db,
        IssueVerification {
            email: email.clone(),
            purpose: VerificationPurpose::Registration,
            code: code.clone(),
            name: Some(name.clone()),
            password_hash: Some(password_hash),
        },
    )
    .await?;

    send_code(&state, &email, Some(name), code, VerificationPurpose::Registration).await?;

    tracing::info!(email = %email, "Registration pending verification");

    Ok(ApiResponse::success(PendingVerification {
        email,
        expires_at: record.expires_at,
    })
    .with_message("Verification code sent to your email"))
}

/// Completes a registration and signs the new user in
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyEmailRequest>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let record = find_code(&state, &email, &req.code, VerificationPurpose::Registration).await?;

    let (Some(name), Some(password_hash)) = (record.name.clone(), record.password_hash.clone()) else {
        return Err(ApiError::InternalError(format!(
            "Registration record {} is missing its pending account data",
            record.id
        )));
    };

    if User::email_exists(&state.db, &email).await? {
        EmailVerification::delete(&state.db, record.id).await?;
        return Err(ApiError::invalid("email", "The email has already been taken."));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
            role: UserRole::Member,
            verified: true,
        },
    )
    .await?;

    EmailVerification::delete(&state.db, record.id).await?;

    tracing::info!(user_id = %user.id, "Email verified, account created");

    Ok(ApiResponse::success(issue_token(&state, user).await?).with_message("Email verified successfully"))
}

/// Sends a fresh code for a pending registration
///
/// # Errors
///
/// - `404`: no registration is pending for the address
pub async fn resend_code(
    State(state): State<AppState>,
    AppJson(req): AppJson<EmailRequest>,
) -> ApiResult<ApiResponse<PendingVerification>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let record = EmailVerification::find_pending(&state.db, &email, VerificationPurpose::Registration)
        .await?
        .ok_or_else(|| ApiError::NotFound("No pending registration for this email".to_string()))?;

    let code = verification::generate_code();
    EmailVerification::refresh_code(&state.db, record.id, &email, &code).await?;

    send_code(&state, &email, record.name, code, VerificationPurpose::Registration).await?;

    Ok(ApiResponse::success(PendingVerification {
        email,
        expires_at: Utc::now() + verification::code_ttl(),
    })
    .with_message("A new verification code has been sent"))
}

/// Exchanges credentials for a bearer token
///
/// # Errors
///
/// - `422`: unknown email or wrong password (same message for both)
/// - `403`: the address was never verified
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    req.validate()?;

    let bad_credentials = || ApiError::invalid("email", "These credentials do not match our records.");

    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(bad_credentials)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(bad_credentials());
    }

    if !user.is_verified() {
        return Err(ApiError::Forbidden("Your email address is not verified.".to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::success(issue_token(&state, user).await?))
}

/// Revokes the session behind the presented token
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<()>> {
    Session::revoke(&state.db, auth.session_id).await?;

    Ok(ApiResponse::message("Logged out successfully"))
}

/// Rotates the token: a new session replaces the current one
pub async fn refresh(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unauthenticated.".to_string()))?;

    let payload = issue_token(&state, user).await?;
    Session::revoke(&state.db, auth.session_id).await?;

    Ok(ApiResponse::success(payload))
}

/// Emails a password reset code
///
/// # Errors
///
/// - `422`: no user with that address
pub async fn send_reset_code(
    State(state): State<AppState>,
    AppJson(req): AppJson<EmailRequest>,
) -> ApiResult<ApiResponse<PendingVerification>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::invalid("email", "We can't find a user with that email address."))?;

    let code = verification::generate_code();
    let record = EmailVerification::issue(
        &state.db,
        IssueVerification {
            email: email.clone(),
            purpose: VerificationPurpose::PasswordReset,
            code: code.clone(),
            name: Some(user.name.clone()),
            password_hash: None,
        },
    )
    .await?;

    send_code(&state, &email, Some(user.name), code, VerificationPurpose::PasswordReset).await?;

    Ok(ApiResponse::success(PendingVerification {
        email,
        expires_at: record.expires_at,
    })
    .with_message("Password reset code sent to your email"))
}

/// Checks a reset code without consuming it
pub async fn verify_reset_code(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyEmailRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    find_code(&state, &email, &req.code, VerificationPurpose::PasswordReset).await?;

    Ok(ApiResponse::message("Verification code is valid"))
}

/// Sets a new password and signs the user out everywhere
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;
    check_new_password(&req.password, req.password_confirmation.as_deref())?;

    let email = normalize_email(&req.email);
    let record = find_code(&state, &email, &req.code, VerificationPurpose::PasswordReset).await?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::invalid("email", "We can't find a user with that email address."))?;

    let password_hash = password::hash_password(&req.password)?;
    let revoked = User::reset_password(&state.db, user.id, &password_hash, record.id)
        .await?
        .ok_or_else(invalid_code)?;

    tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password reset");

    Ok(ApiResponse::message("Password has been reset successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            name: String::new(),
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
            password_confirmation: Some("secret1".to_string()),
        };

        let errors = ApiError::from(req.validate().unwrap_err());
        let ApiError::ValidationError(details) = errors else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "name"]);
    }

    #[test]
    fn test_reset_code_must_have_six_characters() {
        let req = VerifyEmailRequest {
            email: "a@example.com".to_string(),
            code: "12345".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_password_confirmation_mismatch() {
        let err = check_new_password("secret1", Some("secret2")).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(details) if details[0].field == "password"));
    }
}
