/// Project endpoints
///
/// | caller  | list           | show | update / delete |
/// |---------|----------------|------|-----------------|
/// | admin   | every project  | yes  | yes             |
/// | owner   | own + member   | yes  | yes             |
/// | member  | own + member   | yes  | 403             |
/// | other   | own + member   | 403  | 403             |

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{
        authorization::{require_project_manage, require_project_view},
        middleware::AuthContext,
    },
    models::{
        membership::{Membership, ProjectMember},
        project::{CreateProject, Project, UpdateProject},
        user::User,
    },
};
use validator::Validate;

use super::load_project;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, normalize_email, AppJson, AppPath},
    response::ApiResponse,
};
use uuid::Uuid;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(max = 500, message = "The background url may not be greater than 500 characters."))]
    pub background_url: Option<String>,

    #[validate(email(message = "The collaborator email must be a valid email address."))]
    pub collaborator_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub background_url: Option<Option<String>>,
}

impl UpdateProjectRequest {
    fn into_update(self) -> ApiResult<UpdateProject> {
        let name = match self.name.map(|name| name.trim().to_string()) {
            Some(name) if name.is_empty() || name.chars().count() > 255 => {
                return Err(ApiError::invalid("name", "The name must be between 1 and 255 characters."));
            }
            other => other,
        };

        if let Some(Some(url)) = &self.background_url {
            if url.chars().count() > 500 {
                return Err(ApiError::invalid(
                    "background_url",
                    "The background url may not be greater than 500 characters.",
                ));
            }
        }

        Ok(UpdateProject {
            name,
            description: self.description,
            background_url: self.background_url,
        })
    }
}

/// A project with its member list
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

#[derive(Debug, Serialize)]
pub struct ProjectTotal {
    pub total: i64,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<Project>>> {
    let projects = if auth.is_admin() {
        Project::list_all(&state.db).await?
    } else {
        Project::list_for_user(&state.db, auth.user_id).await?
    };

    Ok(ApiResponse::success(projects))
}

/// Creates a project; the creator becomes its leader
///
/// # Errors
///
/// - `422`: invalid input or unknown `collaborator_email`
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> ApiResult<ApiResponse<ProjectDetail>> {
    req.validate()?;

    let collaborator_id = match req.collaborator_email.as_deref() {
        Some(email) => {
            let collaborator = User::find_by_email(&state.db, &normalize_email(email))
                .await?
                .ok_or_else(|| {
                    ApiError::invalid("collaborator_email", "The selected collaborator email is invalid.")
                })?;
            (collaborator.id != auth.user_id).then_some(collaborator.id)
        }
        None => None,
    };

    let project = Project::create(
        &state.db,
        CreateProject {
            name: req.name.trim().to_string(),
            description: req.description,
            background_url: req.background_url,
            owner_id: auth.user_id,
            collaborator_id,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, owner_id = %auth.user_id, "Project created");

    let members = Membership::list_by_project(&state.db, project.id).await?;

    Ok(ApiResponse::created(ProjectDetail { project, members }).with_message("Project created successfully"))
}

pub async fn count(State(state): State<AppState>) -> ApiResult<ApiResponse<ProjectTotal>> {
    let total = Project::count(&state.db).await?;

    Ok(ApiResponse::success(ProjectTotal { total }))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<ProjectDetail>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let members = Membership::list_by_project(&state.db, project.id).await?;

    Ok(ApiResponse::success(ProjectDetail { project, members }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    let changes = req.into_update()?;
    if changes.is_empty() {
        return Ok(ApiResponse::success(project));
    }

    let project = Project::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(ApiResponse::success(project).with_message("Project updated successfully"))
}

/// Deletes a project with everything in it
pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    Project::delete(&state.db, id).await?;

    tracing::info!(project_id = %id, deleted_by = %auth.user_id, "Project deleted");

    Ok(ApiResponse::message("Project deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_blank_name() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"name": "   "}"#).unwrap();
        assert!(matches!(req.into_update(), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_update_can_clear_description() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let update = req.into_update().unwrap();
        assert_eq!(update.description, Some(None));
        assert!(update.name.is_none());
        assert!(!update.is_empty());
    }
}
