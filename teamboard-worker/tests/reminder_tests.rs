mod common;

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use teamboard_shared::{
    models::{
        project::{CreateProject, Project},
        session::Session,
        task::{CreateTask, Task, TaskStatus},
    },
    notify::Notification,
};
use teamboard_worker::reminder::{DeadlineReminderJob, ReminderSettings};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_run_once_notifies_open_assignments_in_window() {
    let Some(pool) = common::test_pool().await else { return };
    let user = common::create_user(&pool).await;
    let project = Project::create(
        &pool,
        CreateProject {
            name: "Reminders".to_string(),
            description: None,
            background_url: None,
            owner_id: user.id,
            collaborator_id: None,
        },
    )
    .await
    .unwrap();

    let now = Utc::now();
    let task = |title: &str, status: TaskStatus, days: i64| CreateTask {
        project_id: project.id,
        title: title.to_string(),
        description: None,
        status,
        deadline: Some((now + Duration::days(days)).date_naive()),
        assignee_ids: vec![user.id],
    };

    Task::create(&pool, task("Due tomorrow", TaskStatus::InProgress, 1)).await.unwrap();
    Task::create(&pool, task("Already done", TaskStatus::Done, 1)).await.unwrap();
    Task::create(&pool, task("Next week", TaskStatus::Pending, 7)).await.unwrap();

    let notifier = Arc::new(common::RecordingNotifier::default());
    let job = DeadlineReminderJob::new(pool.clone(), notifier.clone(), ReminderSettings::default());

    let report = job.run_once(now).await.unwrap();
    assert!(report.sent >= 1);
    assert_eq!(report.failed, 0);

    let sent = notifier.sent_to(&user.email);
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        Notification::DeadlineReminder { task_title, project_name, .. }
            if task_title == "Due tomorrow" && project_name == "Reminders"
    ));
}

#[tokio::test]
async fn test_run_once_purges_expired_sessions() {
    let Some(pool) = common::test_pool().await else { return };
    let user = common::create_user(&pool).await;

    let expired = Session::create(&pool, user.id, Utc::now() - Duration::minutes(1)).await.unwrap();
    let live = Session::create(&pool, user.id, Utc::now() + Duration::hours(1)).await.unwrap();

    let job = DeadlineReminderJob::new(
        pool.clone(),
        Arc::new(common::RecordingNotifier::default()),
        ReminderSettings::default(),
    );
    job.run_once(Utc.with_ymd_and_hms(2000, 1, 1, 8, 0, 0).unwrap()).await.unwrap();

    // Already deleted by the run
    assert!(!Session::revoke(&pool, expired.id).await.unwrap());
    assert!(Session::find_active_user(&pool, live.id, user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let Some(pool) = common::test_pool().await else { return };
    let job = DeadlineReminderJob::new(
        pool,
        Arc::new(common::RecordingNotifier::default()),
        ReminderSettings::default(),
    );

    let shutdown = CancellationToken::new();
    shutdown.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), job.run(shutdown))
        .await
        .expect("job did not stop after cancellation");
}
