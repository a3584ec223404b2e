/// Dashboard aggregation
///
/// Read-only counts over the projects visible to a user. `scope = None`
/// means every project (admins); otherwise only projects the user owns or is
/// a member of are counted.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::progress_report::round2;
use super::task::TaskStatus;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserTaskCount {
    pub user_id: Uuid,
    pub user_name: String,
    pub total_tasks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_projects: i64,
    pub total_tasks: i64,
    pub tasks_by_status: BTreeMap<&'static str, i64>,
    pub tasks_by_user: Vec<UserTaskCount>,
    /// Share of tasks in `done`, as a percentage with two decimals
    pub completed_rate: f64,
}

const VISIBLE_PROJECTS: &str = r#"
    SELECT p.id FROM projects p
    WHERE $1::uuid IS NULL
       OR p.owner_id = $1
       OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $1)
"#;

impl DashboardSummary {
    pub async fn compute(pool: &PgPool, scope: Option<Uuid>) -> Result<Self, sqlx::Error> {
        let total_projects: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM ({VISIBLE_PROJECTS}) visible"))
                .bind(scope)
                .fetch_one(pool)
                .await?;

        let status_rows: Vec<(TaskStatus, i64)> = sqlx::query_as(&format!(
            r#"
            SELECT t.status, COUNT(*)
            FROM tasks t
            WHERE t.project_id IN ({VISIBLE_PROJECTS})
            GROUP BY t.status
            "#
        ))
        .bind(scope)
        .fetch_all(pool)
        .await?;

        let tasks_by_user = sqlx::query_as::<_, UserTaskCount>(&format!(
            r#"
            SELECT u.id AS user_id, u.name AS user_name, COUNT(*) AS total_tasks
            FROM task_assignees ta
            INNER JOIN tasks t ON t.id = ta.task_id
            INNER JOIN users u ON u.id = ta.user_id
            WHERE t.project_id IN ({VISIBLE_PROJECTS})
            GROUP BY u.id, u.name
            ORDER BY total_tasks DESC, u.name
            "#
        ))
        .bind(scope)
        .fetch_all(pool)
        .await?;

        Ok(Self::assemble(total_projects, &status_rows, tasks_by_user))
    }

    /// Builds the summary from per-status counts
    pub fn assemble(
        total_projects: i64,
        status_rows: &[(TaskStatus, i64)],
        tasks_by_user: Vec<UserTaskCount>,
    ) -> Self {
        let mut tasks_by_status: BTreeMap<&'static str, i64> =
            TaskStatus::ALL.iter().map(|status| (status.as_str(), 0)).collect();
        for (status, count) in status_rows {
            tasks_by_status.insert(status.as_str(), *count);
        }

        let total_tasks: i64 = tasks_by_status.values().sum();
        let done = tasks_by_status[TaskStatus::Done.as_str()];
        let completed_rate = if total_tasks > 0 {
            round2(done as f64 / total_tasks as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total_projects,
            total_tasks,
            tasks_by_status,
            tasks_by_user,
            completed_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_fills_missing_statuses() {
        let summary = DashboardSummary::assemble(2, &[(TaskStatus::Done, 1), (TaskStatus::Pending, 2)], vec![]);

        assert_eq!(summary.total_projects, 2);
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.tasks_by_status["in_progress"], 0);
        assert_eq!(summary.tasks_by_status["pending"], 2);
        assert_eq!(summary.completed_rate, 33.33);
    }

    #[test]
    fn test_assemble_without_tasks() {
        let summary = DashboardSummary::assemble(0, &[], vec![]);
        assert_eq!(summary.total_tasks, 0);
        assert_eq!(summary.completed_rate, 0.0);
    }
}
