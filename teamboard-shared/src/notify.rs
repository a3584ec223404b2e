/// Outbound user notifications
///
/// Verification codes and deadline reminders are handed to a [`Notifier`].
/// Delivery transport is pluggable; [`LogNotifier`] writes each message to
/// the structured log, which is what development and tests run with.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;

use crate::models::email_verification::VerificationPurpose;
use crate::models::task::DueTask;

/// A message addressed to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    VerificationCode {
        email: String,
        name: Option<String>,
        code: String,
        purpose: VerificationPurpose,
    },
    DeadlineReminder {
        email: String,
        name: String,
        task_title: String,
        project_name: String,
        deadline: NaiveDate,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::VerificationCode { email, .. } => email,
            Notification::DeadlineReminder { email, .. } => email,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Notification::VerificationCode {
                purpose: VerificationPurpose::Registration,
                ..
            } => "Verify your email address",
            Notification::VerificationCode {
                purpose: VerificationPurpose::PasswordReset,
                ..
            } => "Your password reset code",
            Notification::DeadlineReminder { .. } => "Task deadline approaching",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        match &notification {
            Notification::VerificationCode { email, code, purpose, .. } => {
                tracing::info!(
                    recipient = %email,
                    purpose = purpose.as_str(),
                    code = %code,
                    subject = notification.subject(),
                    "Verification code issued"
                );
            }
            Notification::DeadlineReminder {
                email,
                task_title,
                project_name,
                deadline,
                ..
            } => {
                tracing::info!(
                    recipient = %email,
                    task = %task_title,
                    project = %project_name,
                    deadline = %deadline,
                    subject = notification.subject(),
                    "Deadline reminder"
                );
            }
        }

        Ok(())
    }
}

impl From<&DueTask> for Notification {
    fn from(due: &DueTask) -> Self {
        Notification::DeadlineReminder {
            email: due.user_email.clone(),
            name: due.user_name.clone(),
            task_title: due.title.clone(),
            project_name: due.project_name.clone(),
            deadline: due.deadline,
        }
    }
}

/// Result of a reminder fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Sends one deadline reminder per row, concurrently
///
/// Failures are logged and counted; they never abort the remaining sends.
pub async fn send_deadline_reminders(notifier: &dyn Notifier, due: &[DueTask]) -> ReminderOutcome {
    let results = join_all(due.iter().map(|row| notifier.send(Notification::from(row)))).await;

    let mut outcome = ReminderOutcome::default();
    for (row, result) in due.iter().zip(results) {
        match result {
            Ok(()) => outcome.sent += 1,
            Err(e) => {
                outcome.failed += 1;
                tracing::warn!(task_id = %row.task_id, user_id = %row.user_id, error = %e, "Reminder delivery failed");
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts_everything() {
        let notifier = LogNotifier;
        let result = notifier
            .send(Notification::VerificationCode {
                email: "a@example.com".to_string(),
                name: None,
                code: "123456".to_string(),
                purpose: VerificationPurpose::Registration,
            })
            .await;
        assert!(result.is_ok());
    }

    struct FlakyNotifier;

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            if notification.recipient().starts_with("bad") {
                return Err(NotifyError::Delivery {
                    recipient: notification.recipient().to_string(),
                    reason: "mailbox full".to_string(),
                });
            }
            Ok(())
        }
    }

    fn due(email: &str) -> DueTask {
        DueTask {
            task_id: uuid::Uuid::new_v4(),
            title: "Ship".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            project_name: "Apollo".to_string(),
            user_id: uuid::Uuid::new_v4(),
            user_name: "U".to_string(),
            user_email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reminders_count_failures_without_aborting() {
        let rows = vec![due("a@example.com"), due("bad@example.com"), due("c@example.com")];
        let outcome = send_deadline_reminders(&FlakyNotifier, &rows).await;
        assert_eq!(outcome, ReminderOutcome { sent: 2, failed: 1 });
    }

    #[test]
    fn test_subject_and_recipient() {
        let reminder = Notification::DeadlineReminder {
            email: "b@example.com".to_string(),
            name: "B".to_string(),
            task_title: "Ship".to_string(),
            project_name: "Apollo".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        };
        assert_eq!(reminder.recipient(), "b@example.com");
        assert_eq!(reminder.subject(), "Task deadline approaching");

        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["kind"], "deadline_reminder");
    }
}
