/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use teamboard_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::require_auth,
        security::{security_headers, SecurityHeaders},
    },
};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use teamboard_shared::notify::{LogNotifier, Notifier};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Outbound channel for verification codes and reminders
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// State with the logging notifier
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                   public
/// /api/register, /login, /verify-email ...  public
/// /api/...                                  bearer token required
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        account, auth, comments, dashboard, health, meetings, members, mobile, progress_reports,
        projects, tasks,
    };

    crate::error::expose_internal_details(!state.config.api.production);

    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-code", post(auth::resend_code))
        .route("/login", post(auth::login))
        .route("/password/reset/send-code", post(auth::send_reset_code))
        .route("/password/reset/verify-code", post(auth::verify_reset_code))
        .route("/password/reset", post(auth::reset_password));

    let protected_routes = Router::new()
        // Session
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        // Account and users
        .route("/user", get(account::show))
        .route("/account", get(account::show).put(account::update))
        .route("/users", post(account::create_user))
        .route("/users/all", get(account::list_users))
        // Projects and members
        .route("/projects", get(projects::index).post(projects::store))
        .route("/projects/count", get(projects::count))
        .route(
            "/projects/:id",
            get(projects::show).put(projects::update).delete(projects::destroy),
        )
        .route("/projects/:id/members", get(members::index).post(members::store))
        .route("/projects/:id/members/:user_id", delete(members::destroy))
        // Tasks
        .route("/projects/:id/tasks", get(tasks::index).post(tasks::store))
        .route("/tasks/count", get(tasks::count))
        .route("/tasks/:id", get(tasks::show).put(tasks::update).delete(tasks::destroy))
        .route("/tasks/:id/reminder", get(tasks::remind))
        .route("/my-tasks", get(tasks::my_tasks))
        // Comments
        .route("/tasks/:id/comments", get(comments::index).post(comments::store))
        .route("/comments/count", get(comments::count))
        .route("/comments/:id", delete(comments::destroy))
        // Progress reports
        .route(
            "/projects/:id/progress-reports",
            get(progress_reports::index).post(progress_reports::store),
        )
        .route("/projects/:id/progress-reports/chart-data", get(progress_reports::chart_data))
        .route(
            "/projects/:id/progress-reports/auto-generate",
            post(progress_reports::auto_generate),
        )
        .route(
            "/projects/:id/progress-reports/:report_id",
            get(progress_reports::show)
                .put(progress_reports::update)
                .delete(progress_reports::destroy),
        )
        // Dashboard
        .route("/dashboard", get(dashboard::summary))
        .route("/dashboard/tasks", get(dashboard::tasks))
        // Meetings
        .route("/meetings", get(meetings::index).post(meetings::store))
        .route(
            "/meetings/:id",
            get(meetings::show).put(meetings::update).delete(meetings::destroy),
        )
        // Mobile
        .route("/mobile/meetings/today", get(mobile::meetings_today))
        .route("/mobile/meetings/statistics", get(mobile::meeting_statistics))
        .route("/mobile/meetings/:id/status", put(mobile::update_meeting_status))
        .route("/mobile/tasks", get(mobile::tasks))
        .route("/mobile/tasks/today", get(mobile::tasks_today))
        .route("/mobile/tasks/statistics", get(mobile::task_statistics))
        .route("/mobile/tasks/:id/status", put(mobile::update_task_status))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    let api_routes = public_routes.merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            SecurityHeaders::new(state.config.api.production),
            security_headers,
        ))
        .with_state(state)
}
