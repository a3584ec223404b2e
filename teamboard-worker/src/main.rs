//! # Teamboard Worker
//!
//! Runs the daily deadline reminder job until Ctrl-C.
//!
//! ```bash
//! cargo run -p teamboard-worker
//! ```

use std::sync::Arc;
use teamboard_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    notify::LogNotifier,
};
use teamboard_worker::{config::WorkerConfig, reminder::DeadlineReminderJob};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teamboard_worker=info,teamboard_shared=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Teamboard worker v{} starting", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(
        DatabaseConfig::from_url(config.database_url.clone()).with_max_connections(config.max_connections),
    )
    .await?;
    run_migrations(&pool).await?;

    let shutdown = CancellationToken::new();
    let job = DeadlineReminderJob::new(pool.clone(), Arc::new(LogNotifier), config.reminders);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal.cancel();
    });

    job.run(shutdown).await;

    close_pool(pool).await;
    tracing::info!("Worker shut down");

    Ok(())
}
