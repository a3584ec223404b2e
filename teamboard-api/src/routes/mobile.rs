/// Compact views for the mobile client
///
/// Everything here is scoped to the requester: their assigned tasks and
/// the meetings they take part in. "Today" is the current UTC date.

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use teamboard_shared::{
    auth::middleware::AuthContext,
    models::{
        meeting::{CalendarWindows, Meeting, MeetingStatistics, MeetingStatus},
        task::{Task, TaskStatistics, TaskStatus},
    },
};
use uuid::Uuid;

use super::{
    meetings::{render_meetings, MeetingResource},
    tasks::{render_project_tasks, TaskResource},
};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct MeetingStatusRequest {
    pub status: MeetingStatus,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

pub async fn meetings_today(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<MeetingResource>>> {
    let (from, to) = CalendarWindows::around(Utc::now()).day;
    let meetings = Meeting::list_for_participant_between(&state.db, auth.user_id, from, to).await?;

    Ok(ApiResponse::success(render_meetings(&state, meetings).await?))
}

pub async fn meeting_statistics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<MeetingStatistics>> {
    let stats = Meeting::statistics_for(&state.db, auth.user_id, Utc::now()).await?;

    Ok(ApiResponse::success(stats))
}

/// Participants may move a meeting through its statuses
pub async fn update_meeting_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<MeetingStatusRequest>,
) -> ApiResult<ApiResponse<Meeting>> {
    Meeting::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meeting"))?;

    if !Meeting::is_participant(&state.db, id, auth.user_id).await? {
        return Err(ApiError::Forbidden("You are not a participant of this meeting".to_string()));
    }

    let meeting = Meeting::update_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Meeting"))?;

    Ok(ApiResponse::success(meeting).with_message("Meeting status updated"))
}

pub async fn tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<TaskResource>>> {
    let rows = Task::list_assigned_to(&state.db, auth.user_id).await?;

    Ok(ApiResponse::success(render_project_tasks(&state, rows).await?))
}

/// Assigned tasks due today or created today
pub async fn tasks_today(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<TaskResource>>> {
    let rows = Task::list_assigned_for_day(&state.db, auth.user_id, Utc::now().date_naive()).await?;

    Ok(ApiResponse::success(render_project_tasks(&state, rows).await?))
}

/// Assignees may move their own tasks across the board
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<TaskStatusRequest>,
) -> ApiResult<ApiResponse<TaskResource>> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    if !Task::is_assigned(&state.db, id, auth.user_id).await? {
        return Err(ApiError::Forbidden("Only assigned users can update this task".to_string()));
    }

    let task = Task::update_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    let assigned = Task::assignees(&state.db, task.id).await?;

    Ok(ApiResponse::success(TaskResource::new(task, assigned)).with_message("Task status updated"))
}

pub async fn task_statistics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<TaskStatistics>> {
    let stats = Task::statistics_for_assignee(&state.db, auth.user_id, Utc::now().date_naive()).await?;

    Ok(ApiResponse::success(stats))
}
