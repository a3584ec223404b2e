/// Dashboard endpoints
///
/// `GET /api/dashboard` aggregates over the projects the requester can see
/// (every project for admins). `GET /api/dashboard/tasks` groups the
/// requester's own assignments by status.

use axum::{extract::State, Extension};
use serde::Serialize;
use teamboard_shared::{
    auth::middleware::AuthContext,
    models::{dashboard::DashboardSummary, task::{Task, TaskStatus}},
};

use super::tasks::{render_project_tasks, TaskResource};
use crate::{app::AppState, error::ApiResult, response::ApiResponse};

#[derive(Debug, Default, Serialize)]
pub struct TasksByStatus {
    pub pending: Vec<TaskResource>,
    pub in_progress: Vec<TaskResource>,
    pub done: Vec<TaskResource>,
}

impl TasksByStatus {
    pub fn group(tasks: Vec<TaskResource>) -> Self {
        let mut groups = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Pending => groups.pending.push(task),
                TaskStatus::InProgress => groups.in_progress.push(task),
                TaskStatus::Done => groups.done.push(task),
            }
        }
        groups
    }
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<DashboardSummary>> {
    let scope = (!auth.is_admin()).then_some(auth.user_id);
    let summary = DashboardSummary::compute(&state.db, scope).await?;

    Ok(ApiResponse::success(summary))
}

pub async fn tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<TasksByStatus>> {
    let rows = Task::list_assigned_to(&state.db, auth.user_id).await?;
    let tasks = render_project_tasks(&state, rows).await?;

    Ok(ApiResponse::success(TasksByStatus::group(tasks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task(status: TaskStatus) -> TaskResource {
        TaskResource {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Write release notes".to_string(),
            description: None,
            status,
            deadline: None,
            created_at: "2025-05-06 09:00:00".to_string(),
            updated_at: "2025-05-06 09:00:00".to_string(),
            assigned_users: Vec::new(),
            project: None,
        }
    }

    #[test]
    fn test_group_by_status() {
        let groups = TasksByStatus::group(vec![
            task(TaskStatus::Done),
            task(TaskStatus::Pending),
            task(TaskStatus::Done),
        ]);

        assert_eq!(groups.pending.len(), 1);
        assert!(groups.in_progress.is_empty());
        assert_eq!(groups.done.len(), 2);

        let json = serde_json::to_value(&groups).unwrap();
        assert_eq!(json["in_progress"], serde_json::json!([]));
    }
}
