/// Project membership endpoints
///
/// - `GET /api/projects/:id/members`: anyone who can view the project
/// - `POST /api/projects/:id/members`: owner or admin, by email
/// - `DELETE /api/projects/:id/members/:user_id`: owner or admin

use axum::{extract::State, Extension};
use serde::Deserialize;
use teamboard_shared::{
    auth::{
        authorization::{require_project_manage, require_project_view},
        middleware::AuthContext,
    },
    models::{
        membership::{CreateMembership, Membership, ProjectMember, ProjectRole},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

use super::load_project;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{normalize_email, AppJson, AppPath},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<ProjectMember>>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let members = Membership::list_by_project(&state.db, project.id).await?;

    Ok(ApiResponse::success(members))
}

/// Adds an existing user as a `member`
///
/// Adding someone who already belongs to the project is not an error; the
/// response says so and nothing changes.
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<AddMemberRequest>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    req.validate()?;

    let project = load_project(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::invalid("email", "The selected email is invalid."))?;

    if let Some(existing) = Membership::find(&state.db, project.id, user.id).await? {
        let member = ProjectMember {
            id: user.id,
            name: user.name,
            email: user.email,
            role: existing.role,
            joined_at: existing.created_at,
        };
        return Ok(ApiResponse::success(member).with_message("User is already a member of this project"));
    }

    let membership = Membership::create(
        &state.db,
        CreateMembership {
            project_id: project.id,
            user_id: user.id,
            role: ProjectRole::Member,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Member added");

    Ok(ApiResponse::created(ProjectMember {
        id: user.id,
        name: user.name,
        email: user.email,
        role: membership.role,
        joined_at: membership.created_at,
    })
    .with_message("Member added successfully"))
}

/// Removes a member; the owner always stays
pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((id, user_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<()>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    if project.is_owned_by(user_id) {
        return Err(ApiError::invalid("user_id", "The project owner cannot be removed."));
    }

    if !Membership::delete(&state.db, project.id, user_id).await? {
        return Err(ApiError::NotFound("User is not a member of this project".to_string()));
    }

    tracing::info!(project_id = %project.id, user_id = %user_id, "Member removed");

    Ok(ApiResponse::message("Member removed successfully"))
}
