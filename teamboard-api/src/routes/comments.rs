/// Task comments
///
/// Reading and writing comments requires view access to the task's project.
/// A comment can be deleted by its author or an admin.

use axum::{extract::State, Extension};
use serde::Deserialize;
use teamboard_shared::{
    auth::{
        authorization::{require_author_or_admin, require_project_view},
        middleware::AuthContext,
    },
    models::comment::{Comment, CommentWithAuthor, CreateComment},
};
use uuid::Uuid;
use validator::Validate;

use super::{load_task, CountResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "The content must be between 1 and 5000 characters."))]
    pub content: String,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(task_id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<CommentWithAuthor>>> {
    let (task, project) = load_task(&state.db, task_id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let comments = Comment::list_by_task(&state.db, task.id).await?;

    Ok(ApiResponse::success(comments))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateCommentRequest>,
) -> ApiResult<ApiResponse<CommentWithAuthor>> {
    let (task, project) = load_task(&state.db, task_id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    req.validate()?;
    if req.content.trim().is_empty() {
        return Err(ApiError::invalid("content", "The content field is required."));
    }

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id: task.id,
            user_id: auth.user_id,
            content: req.content,
        },
    )
    .await?;

    Ok(ApiResponse::created(CommentWithAuthor {
        comment,
        user: auth.summary(),
    }))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;

    require_author_or_admin(&auth, comment.user_id)?;

    Comment::delete(&state.db, comment.id).await?;

    Ok(ApiResponse::message("Comment deleted successfully"))
}

pub async fn count(State(state): State<AppState>) -> ApiResult<ApiResponse<CountResponse>> {
    let count = Comment::count(&state.db).await?;

    Ok(ApiResponse::success(CountResponse { count }))
}
