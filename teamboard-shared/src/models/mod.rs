/// Database models for Teamboard
///
/// Each model owns its SQL: plain `sqlx` queries against the schema in
/// `migrations/`, returning `sqlx::Error` for the API layer to map.
///
/// # Models
///
/// - `user`: accounts and global roles
/// - `session`: server-side records behind bearer tokens
/// - `email_verification`: pending one-time codes
/// - `project`, `membership`: workspaces and their members
/// - `task`: kanban tasks and assignments
/// - `comment`: task comments
/// - `meeting`: meetings and participants
/// - `progress_report`: periodic completion reports and chart arithmetic
/// - `dashboard`: read-only aggregation

pub mod comment;
pub mod dashboard;
pub mod email_verification;
pub mod meeting;
pub mod membership;
pub mod progress_report;
pub mod project;
pub mod session;
pub mod task;
pub mod user;

use serde::Serialize;

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let last_page = if total == 0 { 1 } else { (total + per_page - 1) / per_page };
        Self {
            data,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

/// Row offset of a 1-based page
///
/// Saturates instead of overflowing, so an absurd page number reads past the
/// end and yields an empty page.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page.max(0))
}
