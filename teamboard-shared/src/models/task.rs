/// Task model and database operations
///
/// Tasks are units of work inside a project with a three-state status and
/// any number of assigned users (`task_assignees`). Assignment rules (only
/// project members may be assigned, only owners and admins may assign) are
/// enforced by the callers before they reach this layer.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     deadline DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_assignees (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     project_id,
///     title: "Write release notes".to_string(),
///     description: None,
///     status: TaskStatus::Pending,
///     deadline: None,
///     assignee_ids: vec![user_id],
/// }).await?;
///
/// Task::update_status(&pool, task.id, TaskStatus::Done).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::user::UserSummary;

const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, deadline, created_at, updated_at";

/// Kanban column of a task
///
/// There is no transition guard: any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task together with the name of its project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub project_name: String,
}

/// Open task whose deadline is coming up, as read by the reminder job
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueTask {
    pub task_id: Uuid,
    pub title: String,
    pub deadline: NaiveDate,
    pub project_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
}

/// Per-assignee task counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskStatistics {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub done: i64,
    /// Due today
    pub today: i64,
    /// Past deadline and not done
    pub overdue: i64,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub assignee_ids: Vec<Uuid>,
}

/// Partial task update
///
/// `Some(None)` clears a nullable column. `assignee_ids: Some(_)` replaces
/// the whole assignment, `None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub deadline: Option<Option<NaiveDate>>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

async fn replace_assignees(
    tx: &mut Transaction<'_, Postgres>,
    task_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;

    if !user_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, user_id)
            SELECT $1, assignee FROM UNNEST($2::uuid[]) AS assignee
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

impl Task {
    /// Creates a task and its assignments in one transaction
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, project_id, title, description, status, deadline)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.deadline)
        .fetch_one(&mut *tx)
        .await?;

        replace_assignees(&mut tx, task.id, &data.assignee_ids).await?;

        tx.commit().await?;

        Ok(task)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ANY($1) ORDER BY created_at"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Tasks assigned to a user across all projects, newest first
    pub async fn list_assigned_to(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectTask>, sqlx::Error> {
        sqlx::query_as::<_, ProjectTask>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.deadline,
                   t.created_at, t.updated_at, p.name AS project_name
            FROM tasks t
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            INNER JOIN projects p ON p.id = t.project_id
            WHERE ta.user_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Assigned tasks that are due on `today` or were created on it
    pub async fn list_assigned_for_day(
        pool: &PgPool,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<ProjectTask>, sqlx::Error> {
        sqlx::query_as::<_, ProjectTask>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.deadline,
                   t.created_at, t.updated_at, p.name AS project_name
            FROM tasks t
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            INNER JOIN projects p ON p.id = t.project_id
            WHERE ta.user_id = $1
              AND (t.deadline = $2 OR (t.created_at AT TIME ZONE 'UTC')::date = $2)
            ORDER BY t.deadline NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    /// Tasks assigned to a user inside one project and created within a date range
    pub async fn list_assigned_in_period(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.deadline,
                   t.created_at, t.updated_at
            FROM tasks t
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            WHERE t.project_id = $1
              AND ta.user_id = $2
              AND (t.created_at AT TIME ZONE 'UTC')::date BETWEEN $3 AND $4
            ORDER BY t.created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Returns the ids from `ids` that do NOT belong to the project
    pub async fn foreign_ids(
        pool: &PgPool,
        project_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT candidate
            FROM UNNEST($2::uuid[]) AS candidate
            WHERE NOT EXISTS (
                SELECT 1 FROM tasks WHERE id = candidate AND project_id = $1
            )
            "#,
        )
        .bind(project_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update, replacing assignments when requested
    ///
    /// Returns `None` if the task does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.deadline.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deadline = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(deadline) = data.deadline {
            q = q.bind(deadline);
        }

        let mut tx = pool.begin().await?;

        let Some(task) = q.fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(assignee_ids) = data.assignee_ids {
            replace_assignees(&mut tx, task.id, &assignee_ids).await?;
        }

        tx.commit().await?;

        Ok(Some(task))
    }

    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(pool)
            .await
    }

    pub async fn is_assigned(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM task_assignees WHERE task_id = $1 AND user_id = $2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn assignees(pool: &PgPool, task_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM task_assignees ta
            INNER JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Loads assignees for many tasks with a single query
    ///
    /// Tasks without assignees map to an empty list.
    pub async fn assignees_for(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<UserSummary>>, sqlx::Error> {
        let rows: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT ta.task_id, u.id, u.name, u.email
            FROM task_assignees ta
            INNER JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = ANY($1)
            ORDER BY u.name
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        let mut map: HashMap<Uuid, Vec<UserSummary>> =
            task_ids.iter().map(|id| (*id, Vec::new())).collect();
        for (task_id, id, name, email) in rows {
            map.entry(task_id).or_default().push(UserSummary { id, name, email });
        }

        Ok(map)
    }

    /// Open assignments whose deadline falls in `[from, to]`, one row per assignee
    pub async fn due_between(
        pool: &PgPool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DueTask>, sqlx::Error> {
        sqlx::query_as::<_, DueTask>(
            r#"
            SELECT t.id AS task_id, t.title, t.deadline, p.name AS project_name,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email
            FROM tasks t
            INNER JOIN projects p ON p.id = t.project_id
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            INNER JOIN users u ON u.id = ta.user_id
            WHERE t.status <> 'done'
              AND t.deadline BETWEEN $1 AND $2
            ORDER BY t.deadline, t.id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Reminder rows for a single task, one per assignee
    ///
    /// Empty when the task has no deadline or no assignees.
    pub async fn reminder_targets(pool: &PgPool, task_id: Uuid) -> Result<Vec<DueTask>, sqlx::Error> {
        sqlx::query_as::<_, DueTask>(
            r#"
            SELECT t.id AS task_id, t.title, t.deadline, p.name AS project_name,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email
            FROM tasks t
            INNER JOIN projects p ON p.id = t.project_id
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            INNER JOIN users u ON u.id = ta.user_id
            WHERE t.id = $1 AND t.deadline IS NOT NULL
            ORDER BY u.name
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Counters over the tasks assigned to one user
    pub async fn statistics_for_assignee(
        pool: &PgPool,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<TaskStatistics, sqlx::Error> {
        sqlx::query_as::<_, TaskStatistics>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE t.status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE t.status = 'in_progress') AS in_progress,
                   COUNT(*) FILTER (WHERE t.status = 'done') AS done,
                   COUNT(*) FILTER (WHERE t.deadline = $2) AS today,
                   COUNT(*) FILTER (WHERE t.deadline < $2 AND t.status <> 'done') AS overdue
            FROM tasks t
            INNER JOIN task_assignees ta ON ta.task_id = t.id
            WHERE ta.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(pool)
        .await
    }
}
