/// The signed-in user's account, plus user administration
///
/// - `GET /api/user`, `GET /api/account`
/// - `PUT /api/account`
/// - `POST /api/users` (admin)
/// - `GET /api/users/all`

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{authorization::require_role, middleware::AuthContext, password},
    models::user::{CreateUser, UpdateUser, User, UserRole},
};
use uuid::Uuid;
use validator::Validate;

use super::clean_name;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{normalize_email, AppJson},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "The name must be between 1 and 100 characters."))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "The name must be between 1 and 100 characters."))]
    pub name: String,

    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    pub password: String,

    pub password_confirmation: Option<String>,

    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Member
}

/// Row of the user picker
#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(ApiResponse::success(user))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateAccountRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    let name = clean_name(&req.name)?;

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            name: Some(name),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(ApiResponse::success(user).with_message("Account updated successfully"))
}

/// Creates a verified account directly (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    require_role(&auth, &[UserRole::Admin])?;
    req.validate()?;
    let name = clean_name(&req.name)?;
    password::validate_new_password(&req.password, req.password_confirmation.as_deref())
        .map_err(|message| ApiError::invalid("password", message))?;

    let email = normalize_email(&req.email);
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::invalid("email", "The email has already been taken."));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash: password::hash_password(&req.password)?,
            role: req.role,
            verified: true,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %auth.user_id, "User created by admin");

    Ok(ApiResponse::created(user))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<UserListItem>>> {
    let users = User::list_summaries(&state.db)
        .await?
        .into_iter()
        .map(|(summary, role)| UserListItem {
            id: summary.id,
            name: summary.name,
            email: summary.email,
            role,
        })
        .collect();

    Ok(ApiResponse::success(users))
}
