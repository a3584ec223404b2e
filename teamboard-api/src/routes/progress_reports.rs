/// Progress reports of a project
///
/// All routes live under `/api/projects/:id/progress-reports` and need view
/// access to the project. A report can be changed or deleted by whoever
/// created it, the project owner, or an admin.
///
/// Query filters shared by the list and the chart data:
/// `user_id`, `period`, `status`, `start_date`, `end_date` (a report
/// matches when its date range overlaps the requested one).

use axum::{extract::State, Extension};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use teamboard_shared::{
    auth::{
        authorization::{require_project_manage, require_project_view},
        middleware::AuthContext,
    },
    models::{
        membership::Membership,
        progress_report::{
            round2, ChartData, CreateReport, ProgressReport, ReportEntry, ReportFilter, ReportPeriod,
            ReportStatus, TaskSummary, UpdateReport,
        },
        project::Project,
        task::Task,
        Page,
    },
};
use uuid::Uuid;
use validator::Validate;

use super::load_project;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, AppJson, AppPath, AppQuery},
    response::ApiResponse,
};

const DEFAULT_PER_PAGE: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub user_id: Option<Uuid>,
    pub period: Option<ReportPeriod>,
    pub status: Option<ReportStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            user_id: self.user_id,
            period: self.period,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub user_id: Uuid,

    pub period: ReportPeriod,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[serde(default)]
    pub main_tasks: Vec<Uuid>,

    #[serde(default)]
    pub support_tasks: Vec<Uuid>,

    #[validate(range(min = 0.0, max = 100.0, message = "The completion percentage must be between 0 and 100."))]
    pub completion_percentage: f64,

    pub notes: Option<String>,

    pub achievements: Option<String>,

    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReportRequest {
    pub period: Option<ReportPeriod>,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    pub main_tasks: Option<Vec<Uuid>>,

    pub support_tasks: Option<Vec<Uuid>>,

    #[validate(range(min = 0.0, max = 100.0, message = "The completion percentage must be between 0 and 100."))]
    pub completion_percentage: Option<f64>,

    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub achievements: Option<Option<String>>,

    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AutoGenerateRequest {
    pub user_id: Uuid,
    pub period: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A report with the tasks it references
#[derive(Debug, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub entry: ReportEntry,
    pub main_task_details: Vec<Task>,
    pub support_task_details: Vec<Task>,
}

fn check_period(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if end < start {
        return Err(ApiError::invalid(
            "end_date",
            "The end date must be a date after or equal to start date.",
        ));
    }
    Ok(())
}

/// The reported user must own or belong to the project
async fn check_reported_user(db: &PgPool, project: &Project, user_id: Uuid) -> ApiResult<()> {
    if project.is_owned_by(user_id) || Membership::is_member(db, project.id, user_id).await? {
        return Ok(());
    }
    Err(ApiError::invalid("user_id", "The selected user is not a member of this project."))
}

async fn check_task_ids(db: &PgPool, project_id: Uuid, field: &str, ids: &[Uuid]) -> ApiResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    if !Task::foreign_ids(db, project_id, ids).await?.is_empty() {
        return Err(ApiError::invalid(field, "Every task must belong to this project."));
    }
    Ok(())
}

async fn load_entry(db: &PgPool, project_id: Uuid, report_id: Uuid) -> ApiResult<ReportEntry> {
    ProgressReport::find_in_project(db, project_id, report_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Progress report"))
}

async fn can_edit(db: &PgPool, auth: &AuthContext, project: &Project, report: &ProgressReport) -> ApiResult<()> {
    let access = require_project_view(db, auth, project).await?;
    if report.created_by == auth.user_id || access.can_manage() {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "Only the report's creator, the project owner or an admin can change this report".to_string(),
    ))
}

pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ReportQuery>,
) -> ApiResult<ApiResponse<Page<ReportEntry>>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let page = ProgressReport::list(
        &state.db,
        project.id,
        &query.filter(),
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .await?;

    Ok(ApiResponse::success(page))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateReportRequest>,
) -> ApiResult<ApiResponse<ReportEntry>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    req.validate()?;
    check_period(req.start_date, req.end_date)?;
    check_reported_user(&state.db, &project, req.user_id).await?;
    check_task_ids(&state.db, project.id, "main_tasks", &req.main_tasks).await?;
    check_task_ids(&state.db, project.id, "support_tasks", &req.support_tasks).await?;

    let report = ProgressReport::create(
        &state.db,
        CreateReport {
            project_id: project.id,
            user_id: req.user_id,
            created_by: auth.user_id,
            period: req.period,
            start_date: req.start_date,
            end_date: req.end_date,
            main_tasks: req.main_tasks,
            support_tasks: req.support_tasks,
            completion_percentage: round2(req.completion_percentage),
            notes: req.notes,
            achievements: req.achievements,
            status: req.status.unwrap_or_default(),
        },
    )
    .await?;

    let entry = load_entry(&state.db, project.id, report.id).await?;

    Ok(ApiResponse::created(entry).with_message("Progress report created successfully"))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((id, report_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<ReportDetail>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let entry = load_entry(&state.db, project.id, report_id).await?;
    let main_task_details = Task::find_many(&state.db, &entry.report.main_tasks).await?;
    let support_task_details = Task::find_many(&state.db, &entry.report.support_tasks).await?;

    Ok(ApiResponse::success(ReportDetail {
        entry,
        main_task_details,
        support_task_details,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((id, report_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateReportRequest>,
) -> ApiResult<ApiResponse<ReportEntry>> {
    let project = load_project(&state.db, id).await?;
    let entry = load_entry(&state.db, project.id, report_id).await?;
    can_edit(&state.db, &auth, &project, &entry.report).await?;

    req.validate()?;
    check_period(
        req.start_date.unwrap_or(entry.report.start_date),
        req.end_date.unwrap_or(entry.report.end_date),
    )?;
    if let Some(ids) = &req.main_tasks {
        check_task_ids(&state.db, project.id, "main_tasks", ids).await?;
    }
    if let Some(ids) = &req.support_tasks {
        check_task_ids(&state.db, project.id, "support_tasks", ids).await?;
    }

    ProgressReport::update(
        &state.db,
        report_id,
        UpdateReport {
            period: req.period,
            start_date: req.start_date,
            end_date: req.end_date,
            main_tasks: req.main_tasks,
            support_tasks: req.support_tasks,
            completion_percentage: req.completion_percentage.map(round2),
            notes: req.notes,
            achievements: req.achievements,
            status: req.status,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Progress report"))?;

    let entry = load_entry(&state.db, project.id, report_id).await?;

    Ok(ApiResponse::success(entry).with_message("Progress report updated successfully"))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((id, report_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<()>> {
    let project = load_project(&state.db, id).await?;
    let entry = load_entry(&state.db, project.id, report_id).await?;
    can_edit(&state.db, &auth, &project, &entry.report).await?;

    ProgressReport::delete(&state.db, report_id).await?;

    Ok(ApiResponse::message("Progress report deleted successfully"))
}

/// Chart aggregates; only approved reports unless `status` says otherwise
pub async fn chart_data(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ReportQuery>,
) -> ApiResult<ApiResponse<ChartData>> {
    let project = load_project(&state.db, id).await?;
    require_project_view(&state.db, &auth, &project).await?;

    let mut filter = query.filter();
    filter.status.get_or_insert(ReportStatus::Approved);

    let entries = ProgressReport::list_all(&state.db, project.id, &filter).await?;

    Ok(ApiResponse::success(ChartData::from_reports(&entries)))
}

/// Drafts a report from the user's tasks created within the period
pub async fn auto_generate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<AutoGenerateRequest>,
) -> ApiResult<ApiResponse<ReportEntry>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&state.db, &auth, &project).await?;

    check_period(req.start_date, req.end_date)?;
    check_reported_user(&state.db, &project, req.user_id).await?;

    let tasks =
        Task::list_assigned_in_period(&state.db, project.id, req.user_id, req.start_date, req.end_date).await?;
    let summary = TaskSummary::from_tasks(&tasks);

    let report = ProgressReport::create(
        &state.db,
        CreateReport {
            project_id: project.id,
            user_id: req.user_id,
            created_by: auth.user_id,
            period: req.period,
            start_date: req.start_date,
            end_date: req.end_date,
            main_tasks: summary.main_tasks,
            support_tasks: summary.support_tasks,
            completion_percentage: summary.completion_percentage,
            notes: None,
            achievements: None,
            status: ReportStatus::Draft,
        },
    )
    .await?;

    tracing::info!(
        report_id = %report.id,
        project_id = %project.id,
        tasks = tasks.len(),
        completion = report.completion_percentage,
        "Progress report generated"
    );

    let entry = load_entry(&state.db, project.id, report.id).await?;

    Ok(ApiResponse::created(entry).with_message("Progress report generated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter() {
        let query: ReportQuery =
            serde_json::from_str(r#"{"period": "weekly", "start_date": "2025-01-01", "page": 2}"#).unwrap();
        let filter = query.filter();

        assert_eq!(filter.period, Some(ReportPeriod::Weekly));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert!(filter.status.is_none());
        assert_eq!(query.page, Some(2));
    }

    #[test]
    fn test_period_order() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert!(check_period(start, start).is_ok());
        assert!(check_period(start, start.pred_opt().unwrap()).is_err());
    }

    #[test]
    fn test_completion_range() {
        let req: CreateReportRequest = serde_json::from_str(
            r#"{
                "user_id": "7f7c1c62-0d3c-4b5b-9f0e-2d7a3f0a9b11",
                "period": "monthly",
                "start_date": "2025-01-01",
                "end_date": "2025-01-31",
                "completion_percentage": 120.0
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
