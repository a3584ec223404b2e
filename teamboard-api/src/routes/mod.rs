/// API route handlers, one module per resource
///
/// - `health`: liveness and database check
/// - `auth`: registration, email verification, login, sessions, password reset
/// - `account`: the current user and admin user management
/// - `projects`, `members`: projects and their membership
/// - `tasks`, `comments`: the task board
/// - `meetings`, `mobile`: meetings and the mobile task/meeting views
/// - `progress_reports`, `dashboard`: reporting

pub mod account;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod meetings;
pub mod members;
pub mod mobile;
pub mod progress_reports;
pub mod projects;
pub mod tasks;

use serde::Serialize;
use sqlx::PgPool;
use teamboard_shared::models::{project::Project, task::Task};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Body of the `/count` endpoints
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Trims a person's name and rejects one that is blank or too long
pub(crate) fn clean_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    let length = name.chars().count();
    if length == 0 || length > 100 {
        return Err(ApiError::invalid("name", "The name must be between 1 and 100 characters."));
    }
    Ok(name.to_string())
}

pub(crate) async fn load_project(db: &PgPool, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))
}

/// Loads a task together with the project it belongs to
pub(crate) async fn load_task(db: &PgPool, id: Uuid) -> ApiResult<(Task, Project)> {
    let task = Task::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    let project = load_project(db, task.project_id).await?;

    Ok((task, project))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Ada Lovelace ").unwrap(), "Ada Lovelace");
        assert!(matches!(
            clean_name("   "),
            Err(ApiError::ValidationError(details)) if details[0].field == "name"
        ));
        assert!(clean_name(&"x".repeat(101)).is_err());
        assert!(clean_name(&"é".repeat(100)).is_ok());
    }
}
