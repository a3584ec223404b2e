/// Daily deadline reminders
///
/// Once a day the job reads open task assignments whose deadline falls in
/// the reminder window and notifies each assignee. The same pass deletes
/// expired sessions and verification codes.
///
/// A failed run is logged and retried at the next scheduled time; delivery
/// failures for single recipients never abort the rest of the batch.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use teamboard_shared::{
    models::{email_verification::EmailVerification, session::Session, task::Task},
    notify::{send_deadline_reminders, Notifier},
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::schedule::{deadline_window, next_run_after};

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Invalid reminder settings: {0}")]
    InvalidSettings(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    /// UTC hour of the daily run
    pub hour: u32,
    pub window_hours: i64,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            hour: 8,
            window_hours: 24,
        }
    }
}

impl ReminderSettings {
    pub fn new(hour: u32, window_hours: i64) -> Result<Self, ReminderError> {
        if hour > 23 {
            return Err(ReminderError::InvalidSettings(format!(
                "REMINDER_HOUR must be between 0 and 23, got {}",
                hour
            )));
        }
        if window_hours <= 0 {
            return Err(ReminderError::InvalidSettings(
                "REMINDER_WINDOW_HOURS must be positive".to_string(),
            ));
        }

        Ok(Self { hour, window_hours })
    }
}

/// What a single pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub sessions_purged: u64,
    pub verifications_purged: u64,
}

pub struct DeadlineReminderJob {
    db: PgPool,
    notifier: Arc<dyn Notifier>,
    settings: ReminderSettings,
}

impl DeadlineReminderJob {
    pub fn new(db: PgPool, notifier: Arc<dyn Notifier>, settings: ReminderSettings) -> Self {
        Self {
            db,
            notifier,
            settings,
        }
    }

    /// Runs one pass as if the clock read `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, ReminderError> {
        let (from, to) = deadline_window(now, self.settings.window_hours);
        let due = Task::due_between(&self.db, from, to).await?;

        let outcome = send_deadline_reminders(self.notifier.as_ref(), &due).await;

        let sessions_purged = Session::purge_expired(&self.db).await?;
        let verifications_purged = EmailVerification::purge_expired(&self.db).await?;

        let report = RunReport {
            due: due.len(),
            sent: outcome.sent,
            failed: outcome.failed,
            sessions_purged,
            verifications_purged,
        };

        tracing::info!(
            %from,
            %to,
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            sessions_purged,
            verifications_purged,
            "Reminder run finished"
        );

        Ok(report)
    }

    /// Sleeps until each scheduled time and runs a pass, until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            hour = self.settings.hour,
            window_hours = self.settings.window_hours,
            "Deadline reminder job starting"
        );

        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.settings.hour);
            let wait = (next - now).to_std().unwrap_or_default();

            tracing::debug!(next_run = %next, "Waiting for next reminder run");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.run_once(Utc::now()).await {
                tracing::error!(error = %e, "Reminder run failed");
            }
        }

        tracing::info!("Deadline reminder job stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_bounds() {
        assert_eq!(ReminderSettings::new(8, 24).unwrap(), ReminderSettings::default());
        assert!(ReminderSettings::new(0, 1).is_ok());
        assert!(matches!(ReminderSettings::new(24, 24), Err(ReminderError::InvalidSettings(_))));
        assert!(matches!(ReminderSettings::new(8, 0), Err(ReminderError::InvalidSettings(_))));
    }
}
