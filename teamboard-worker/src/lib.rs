//! # Teamboard Worker Library
//!
//! Scheduled background work for Teamboard.
//!
//! ## Modules
//!
//! - `config`: environment configuration
//! - `schedule`: wall-clock arithmetic for the daily run
//! - `reminder`: the deadline reminder job
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use teamboard_shared::notify::LogNotifier;
//! use teamboard_worker::reminder::{DeadlineReminderJob, ReminderSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let job = DeadlineReminderJob::new(pool, Arc::new(LogNotifier), ReminderSettings::default());
//! job.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod reminder;
pub mod schedule;
