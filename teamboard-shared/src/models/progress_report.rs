/// Progress reports
///
/// A progress report is a periodic completion summary for one user inside
/// one project. It references tasks by id (`main_tasks` for the work still
/// in flight, `support_tasks` for finished work) and carries a completion
/// percentage between 0 and 100.
///
/// Besides CRUD this module holds the two pieces of report arithmetic:
/// [`ChartData::from_reports`] for the chart endpoint and
/// [`TaskSummary::from_tasks`] for auto-generated reports.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::task::Task;
use super::{page_offset, Page};

const REPORT_COLUMNS: &str = "r.id, r.project_id, r.user_id, r.created_by, r.period, r.start_date, \
     r.end_date, r.main_tasks, r.support_tasks, r.completion_percentage, r.notes, r.achievements, \
     r.status, r.created_at, r.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Weekly,
    Monthly,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressReport {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub period: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub main_tasks: Vec<Uuid>,
    pub support_tasks: Vec<Uuid>,
    pub completion_percentage: f64,
    pub notes: Option<String>,
    pub achievements: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A report with the names of its subject and author
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: ProgressReport,
    pub user_name: String,
    pub creator_name: String,
}

/// List filters, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub user_id: Option<Uuid>,
    pub period: Option<ReportPeriod>,
    pub status: Option<ReportStatus>,
    /// Reports overlapping `[start_date, end_date]`
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub period: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub main_tasks: Vec<Uuid>,
    pub support_tasks: Vec<Uuid>,
    pub completion_percentage: f64,
    pub notes: Option<String>,
    pub achievements: Option<String>,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub period: Option<ReportPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub main_tasks: Option<Vec<Uuid>>,
    pub support_tasks: Option<Vec<Uuid>>,
    pub completion_percentage: Option<f64>,
    pub notes: Option<Option<String>>,
    pub achievements: Option<Option<String>>,
    pub status: Option<ReportStatus>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, project_id: Uuid, filter: &ReportFilter) {
    builder.push(" WHERE r.project_id = ").push_bind(project_id);

    if let Some(user_id) = filter.user_id {
        builder.push(" AND r.user_id = ").push_bind(user_id);
    }
    if let Some(period) = filter.period {
        builder.push(" AND r.period = ").push_bind(period);
    }
    if let Some(status) = filter.status {
        builder.push(" AND r.status = ").push_bind(status);
    }
    if let Some(start) = filter.start_date {
        builder.push(" AND r.end_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        builder.push(" AND r.start_date <= ").push_bind(end);
    }
}

fn entry_select() -> String {
    format!(
        "SELECT {REPORT_COLUMNS}, u.name AS user_name, c.name AS creator_name \
         FROM progress_reports r \
         INNER JOIN users u ON u.id = r.user_id \
         INNER JOIN users c ON c.id = r.created_by"
    )
}

impl ProgressReport {
    pub async fn create(pool: &PgPool, data: CreateReport) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProgressReport>(&format!(
            r#"
            INSERT INTO progress_reports AS r
                (id, project_id, user_id, created_by, period, start_date, end_date,
                 main_tasks, support_tasks, completion_percentage, notes, achievements, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.created_by)
        .bind(data.period)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.main_tasks)
        .bind(data.support_tasks)
        .bind(data.completion_percentage)
        .bind(data.notes)
        .bind(data.achievements)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    /// Finds a report inside a given project
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ReportEntry>, sqlx::Error> {
        sqlx::query_as::<_, ReportEntry>(&format!(
            "{} WHERE r.project_id = $1 AND r.id = $2",
            entry_select()
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// One page of a project's reports, newest first
    pub async fn list(
        pool: &PgPool,
        project_id: Uuid,
        filter: &ReportFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Page<ReportEntry>, sqlx::Error> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM progress_reports r");
        push_filters(&mut count, project_id, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(entry_select());
        push_filters(&mut select, project_id, filter);
        select
            .push(" ORDER BY r.created_at DESC, r.id LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(page_offset(page, per_page));

        let data = select.build_query_as::<ReportEntry>().fetch_all(pool).await?;

        Ok(Page::new(data, total, page, per_page))
    }

    /// Every report matching the filter, oldest first (chart input)
    pub async fn list_all(
        pool: &PgPool,
        project_id: Uuid,
        filter: &ReportFilter,
    ) -> Result<Vec<ReportEntry>, sqlx::Error> {
        let mut select = QueryBuilder::<Postgres>::new(entry_select());
        push_filters(&mut select, project_id, filter);
        select.push(" ORDER BY r.created_at");

        select.build_query_as::<ReportEntry>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateReport,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE progress_reports AS r SET updated_at = NOW()");

        if let Some(period) = data.period {
            builder.push(", period = ").push_bind(period);
        }
        if let Some(start_date) = data.start_date {
            builder.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            builder.push(", end_date = ").push_bind(end_date);
        }
        if let Some(main_tasks) = data.main_tasks {
            builder.push(", main_tasks = ").push_bind(main_tasks);
        }
        if let Some(support_tasks) = data.support_tasks {
            builder.push(", support_tasks = ").push_bind(support_tasks);
        }
        if let Some(completion) = data.completion_percentage {
            builder.push(", completion_percentage = ").push_bind(completion);
        }
        if let Some(notes) = data.notes {
            builder.push(", notes = ").push_bind(notes);
        }
        if let Some(achievements) = data.achievements {
            builder.push(", achievements = ").push_bind(achievements);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder
            .push(" WHERE r.id = ")
            .push_bind(id)
            .push(format!(" RETURNING {REPORT_COLUMNS}"));

        builder.build_query_as::<ProgressReport>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM progress_reports WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Completion derived from a user's tasks for an auto-generated report
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub completion_percentage: f64,
    /// Tasks not done yet
    pub main_tasks: Vec<Uuid>,
    /// Finished tasks
    pub support_tasks: Vec<Uuid>,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let (done, open): (Vec<&Task>, Vec<&Task>) =
            tasks.iter().partition(|task| task.status.is_done());

        let completion_percentage = if tasks.is_empty() {
            0.0
        } else {
            round2(done.len() as f64 / tasks.len() as f64 * 100.0)
        };

        Self {
            completion_percentage,
            main_tasks: open.iter().map(|task| task.id).collect(),
            support_tasks: done.iter().map(|task| task.id).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBar {
    pub user_id: Uuid,
    pub user_name: String,
    pub average_completion: f64,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub average_completion: f64,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSummary {
    pub total_reports: usize,
    pub average_completion: f64,
    pub max_completion: f64,
    pub min_completion: f64,
    pub approved: usize,
    pub submitted: usize,
}

/// Aggregates behind the progress charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub bar: Vec<UserBar>,
    pub pie: BTreeMap<&'static str, usize>,
    pub line: Vec<DailyPoint>,
    pub summary: ChartSummary,
}

impl ChartData {
    pub fn from_reports(entries: &[ReportEntry]) -> Self {
        let mut by_user: BTreeMap<Uuid, (String, Vec<f64>)> = BTreeMap::new();
        let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        let mut pie: BTreeMap<&'static str, usize> =
            [("draft", 0), ("submitted", 0), ("approved", 0)].into_iter().collect();

        for entry in entries {
            let report = &entry.report;
            by_user
                .entry(report.user_id)
                .or_insert_with(|| (entry.user_name.clone(), Vec::new()))
                .1
                .push(report.completion_percentage);
            by_day
                .entry(report.created_at.date_naive())
                .or_default()
                .push(report.completion_percentage);

            let key = match report.status {
                ReportStatus::Draft => "draft",
                ReportStatus::Submitted => "submitted",
                ReportStatus::Approved => "approved",
            };
            *pie.entry(key).or_default() += 1;
        }

        let mut bar: Vec<UserBar> = by_user
            .into_iter()
            .map(|(user_id, (user_name, values))| UserBar {
                user_id,
                user_name,
                average_completion: average(&values),
                report_count: values.len(),
            })
            .collect();
        bar.sort_by(|a, b| a.user_name.cmp(&b.user_name));

        let line = by_day
            .into_iter()
            .map(|(date, values)| DailyPoint {
                date,
                average_completion: average(&values),
                report_count: values.len(),
            })
            .collect();

        let values: Vec<f64> = entries.iter().map(|e| e.report.completion_percentage).collect();
        let summary = ChartSummary {
            total_reports: entries.len(),
            average_completion: average(&values),
            max_completion: values.iter().copied().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            })
            .unwrap_or(0.0),
            min_completion: values.iter().copied().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.min(v)))
            })
            .unwrap_or(0.0),
            approved: pie["approved"],
            submitted: pie["submitted"],
        };

        Self {
            bar,
            pie,
            line,
            summary,
        }
    }
}
