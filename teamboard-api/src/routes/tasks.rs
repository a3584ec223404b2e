/// Task board endpoints
///
/// Anyone who can view a project can create and edit its tasks. Assigning
/// users is reserved to the project owner and admins, and every assignee
/// must already be a project member.
///
/// A task renders as:
///
/// ```json
/// {
///   "id": "uuid",
///   "project_id": "uuid",
///   "title": "Write release notes",
///   "description": null,
///   "status": "pending",
///   "deadline": "2025-03-01",
///   "created_at": "2025-02-20 09:30:00",
///   "updated_at": "2025-02-20 09:30:00",
///   "assigned_users": [{ "id": "uuid", "name": "Ada", "email": "ada@example.com" }]
/// }
/// ```

use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use teamboard_shared::{
    auth::{
        authorization::{require_project_manage, require_project_view, ProjectAccess},
        middleware::AuthContext,
    },
    models::{
        membership::Membership,
        project::Project,
        task::{CreateTask, ProjectTask, Task, TaskStatus, UpdateTask},
        user::{User, UserRole, UserSummary},
    },
    notify::send_deadline_reminders,
};
use uuid::Uuid;
use validator::Validate;

use super::{load_project, load_task, CountResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, normalize_email, AppJson, AppPath},
    response::ApiResponse,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResource {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
    pub assigned_users: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

impl TaskResource {
    pub fn new(task: Task, assigned_users: Vec<UserSummary>) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            deadline: task.deadline,
            created_at: timestamp(task.created_at),
            updated_at: timestamp(task.updated_at),
            assigned_users,
            project: None,
        }
    }

    pub fn with_project(mut self, id: Uuid, name: String) -> Self {
        self.project = Some(ProjectRef { id, name });
        self
    }

    /// Renders assigned-task rows, which carry their project name
    pub fn from_project_tasks(
        rows: Vec<ProjectTask>,
        mut assignees: HashMap<Uuid, Vec<UserSummary>>,
    ) -> Vec<Self> {
        rows.into_iter()
            .map(|row| {
                let users = assignees.remove(&row.task.id).unwrap_or_default();
                let project_id = row.task.project_id;
                Self::new(row.task, users).with_project(project_id, row.project_name)
            })
            .collect()
    }
}

/// Loads assignees for a batch of assigned-task rows and renders them
pub(crate) async fn render_project_tasks(
    state: &AppState,
    rows: Vec<ProjectTask>,
) -> ApiResult<Vec<TaskResource>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.task.id).collect();
    let assignees = Task::assignees_for(&state.db, &ids).await?;

    Ok(TaskResource::from_project_tasks(rows, assignees))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "The title must be between 1 and 255 characters."))]
    pub title: String,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub deadline: Option<NaiveDate>,

    pub assigned_user_ids: Option<Vec<Uuid>>,

    pub assigned_user_emails: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<NaiveDate>>,

    pub assigned_user_ids: Option<Vec<Uuid>>,

    pub assigned_user_emails: Option<Vec<String>>,
}

/// The requester as seen by the board
#[derive(Debug, Serialize)]
pub struct BoardUser {
    pub id: Uuid,
    pub role: UserRole,
    pub can_manage: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskBoard {
    pub tasks: Vec<TaskResource>,
    pub user: BoardUser,
}

#[derive(Debug, Serialize)]
pub struct ReminderResult {
    pub notified: usize,
    pub failed: usize,
}

fn check_deadline(deadline: Option<NaiveDate>, today: NaiveDate) -> ApiResult<()> {
    match deadline {
        Some(date) if date < today => Err(ApiError::invalid(
            "deadline",
            "The deadline must be a date after or equal to today.",
        )),
        _ => Ok(()),
    }
}

fn check_title(title: &str) -> ApiResult<()> {
    let length = title.trim().chars().count();
    if length == 0 || length > 255 {
        return Err(ApiError::invalid("title", "The title must be between 1 and 255 characters."));
    }
    Ok(())
}

/// Turns the requested assignee ids and emails into one validated id list
///
/// `Ok(None)` means the request did not touch the assignment.
async fn resolve_assignees(
    state: &AppState,
    project: &Project,
    access: ProjectAccess,
    ids: Option<Vec<Uuid>>,
    emails: Option<Vec<String>>,
) -> ApiResult<Option<Vec<Uuid>>> {
    if ids.is_none() && emails.is_none() {
        return Ok(None);
    }

    if !access.can_manage() {
        return Err(ApiError::Forbidden(
            "Only the project owner or an admin can assign users".to_string(),
        ));
    }

    let mut resolved: Vec<Uuid> = Vec::new();

    if let Some(ids) = ids.filter(|ids| !ids.is_empty()) {
        let existing = User::existing_ids(&state.db, &ids).await?;
        if ids.iter().any(|id| !existing.contains(id)) {
            return Err(ApiError::invalid(
                "assigned_user_ids",
                "One or more selected users do not exist.",
            ));
        }
        resolved.extend(ids);
    }

    if let Some(emails) = emails.filter(|emails| !emails.is_empty()) {
        let emails: Vec<String> = emails.iter().map(|email| normalize_email(email)).collect();
        let users = User::find_by_emails(&state.db, &emails).await?;

        let unknown: Vec<&str> = emails
            .iter()
            .filter(|email| !users.iter().any(|user| &user.email == *email))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ApiError::invalid(
                "assigned_user_emails",
                format!("No user found for: {}", unknown.join(", ")),
            ));
        }

        resolved.extend(users.into_iter().map(|user| user.id));
    }

    resolved.sort();
    resolved.dedup();

    let outsiders = Membership::non_members(&state.db, project.id, &resolved).await?;
    if !outsiders.is_empty() {
        return Err(ApiError::Forbidden(
            "Assigned users must be members of this project".to_string(),
        ));
    }

    Ok(Some(resolved))
}

/// The board of one project
pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<TaskBoard>> {
    let project = load_project(&state.db, id).await?;
    let access = require_project_view(&state.db, &auth, &project).await?;

    let tasks = Task::list_by_project(&state.db, project.id).await?;
    let ids: Vec<Uuid> = tasks.iter().map(|task| task.id).collect();
    let mut assignees = Task::assignees_for(&state.db, &ids).await?;

    let tasks = tasks
        .into_iter()
        .map(|task| {
            let users = assignees.remove(&task.id).unwrap_or_default();
            TaskResource::new(task, users)
        })
        .collect();

    Ok(ApiResponse::success(TaskBoard {
        tasks,
        user: BoardUser {
            id: auth.user_id,
            role: auth.role,
            can_manage: access.can_manage(),
        },
    }))
}

/// Creates a task in a project
///
/// # Errors
///
/// - `403`: outsider, or a non-owner trying to assign, or a non-member assignee
/// - `422`: invalid input, past deadline, unknown assignee
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskResource>> {
    let project = load_project(&state.db, id).await?;
    let access = require_project_view(&state.db, &auth, &project).await?;

    req.validate()?;
    check_title(&req.title)?;
    check_deadline(req.deadline, Utc::now().date_naive())?;

    let assignee_ids = resolve_assignees(
        &state,
        &project,
        access,
        req.assigned_user_ids,
        req.assigned_user_emails,
    )
    .await?
    .unwrap_or_default();

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: project.id,
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status.unwrap_or_default(),
            deadline: req.deadline,
            assignee_ids,
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, project_id = %project.id, "Task created");

    let assigned = Task::assignees(&state.db, task.id).await?;

    Ok(ApiResponse::created(TaskResource::new(task, assigned)).with_message("Task created successfully"))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<TaskResource>> {
    let (task, project) = load_task(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let assigned = Task::assignees(&state.db, task.id).await?;

    Ok(ApiResponse::success(
        TaskResource::new(task, assigned).with_project(project.id, project.name),
    ))
}

/// Partial update; a provided assignee list replaces the assignment
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskResource>> {
    let (task, project) = load_task(&state.db, id).await?;
    let access = require_project_view(&state.db, &auth, &project).await?;

    if let Some(title) = &req.title {
        check_title(title)?;
    }
    if let Some(deadline) = req.deadline {
        check_deadline(deadline, Utc::now().date_naive())?;
    }

    let assignee_ids = resolve_assignees(
        &state,
        &project,
        access,
        req.assigned_user_ids,
        req.assigned_user_emails,
    )
    .await?;

    let task = Task::update(
        &state.db,
        task.id,
        UpdateTask {
            title: req.title.map(|title| title.trim().to_string()),
            description: req.description,
            status: req.status,
            deadline: req.deadline,
            assignee_ids,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Task"))?;

    let assigned = Task::assignees(&state.db, task.id).await?;

    Ok(ApiResponse::success(
        TaskResource::new(task, assigned).with_project(project.id, project.name),
    )
    .with_message("Task updated successfully"))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let (task, project) = load_task(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    Task::delete(&state.db, task.id).await?;

    tracing::info!(task_id = %task.id, deleted_by = %auth.user_id, "Task deleted");

    Ok(ApiResponse::message("Task deleted successfully"))
}

/// Tasks assigned to the requester across all projects
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<TaskResource>>> {
    let rows = Task::list_assigned_to(&state.db, auth.user_id).await?;

    Ok(ApiResponse::success(render_project_tasks(&state, rows).await?))
}

pub async fn count(State(state): State<AppState>) -> ApiResult<ApiResponse<CountResponse>> {
    let count = Task::count(&state.db).await?;

    Ok(ApiResponse::success(CountResponse { count }))
}

/// Sends a deadline reminder to every assignee right away
pub async fn remind(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<ReminderResult>> {
    let (task, project) = load_task(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    if task.deadline.is_none() {
        return Err(ApiError::invalid("deadline", "This task has no deadline."));
    }

    let targets = Task::reminder_targets(&state.db, task.id).await?;
    let outcome = send_deadline_reminders(state.notifier.as_ref(), &targets).await;

    tracing::info!(task_id = %task.id, sent = outcome.sent, failed = outcome.failed, "Manual deadline reminder");

    Ok(ApiResponse::success(ReminderResult {
        notified: outcome.sent,
        failed: outcome.failed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task() -> Task {
        let created = Utc.with_ymd_and_hms(2025, 2, 20, 9, 30, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Write release notes".to_string(),
            description: None,
            status: TaskStatus::InProgress,
            deadline: NaiveDate::from_ymd_opt(2025, 3, 1),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_task_resource_shape() {
        let json = serde_json::to_value(TaskResource::new(task(), Vec::new())).unwrap();

        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["deadline"], "2025-03-01");
        assert_eq!(json["created_at"], "2025-02-20 09:30:00");
        assert_eq!(json["assigned_users"], serde_json::json!([]));
        assert!(json.get("project").is_none());
    }

    #[test]
    fn test_project_tasks_keep_their_assignees() {
        let t = task();
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let assignees = HashMap::from([(t.id, vec![user.clone()])]);

        let rendered = TaskResource::from_project_tasks(
            vec![ProjectTask {
                task: t,
                project_name: "Apollo".to_string(),
            }],
            assignees,
        );

        assert_eq!(rendered[0].assigned_users, vec![user]);
        assert_eq!(rendered[0].project.as_ref().unwrap().name, "Apollo");
    }

    #[test]
    fn test_deadline_must_not_be_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();

        assert!(check_deadline(None, today).is_ok());
        assert!(check_deadline(Some(today), today).is_ok());
        assert!(check_deadline(today.pred_opt(), today).is_err());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = serde_json::from_str::<UpdateTaskRequest>(r#"{"status": "archived"}"#);
        assert!(result.is_err());
    }
}
