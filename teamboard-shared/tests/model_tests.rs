/// Database-backed tests for the models

mod common;

use chrono::{Duration, Utc};
use teamboard_shared::auth::verification::generate_code;
use teamboard_shared::models::email_verification::{EmailVerification, IssueVerification, VerificationPurpose};
use teamboard_shared::models::membership::{Membership, ProjectRole};
use teamboard_shared::models::project::{CreateProject, Project};
use teamboard_shared::models::session::Session;
use teamboard_shared::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use teamboard_shared::models::user::{User, UserRole};
use uuid::Uuid;

#[tokio::test]
async fn test_project_creation_attaches_leader_and_collaborator() {
    let Some(pool) = common::test_pool().await else { return };
    let owner = common::create_user(&pool, UserRole::Leader).await;
    let collaborator = common::create_user(&pool, UserRole::Member).await;

    let project = Project::create(
        &pool,
        CreateProject {
            name: "Apollo".to_string(),
            description: None,
            background_url: None,
            owner_id: owner.id,
            collaborator_id: Some(collaborator.id),
        },
    )
    .await
    .unwrap();

    let members = Membership::list_by_project(&pool, project.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].id, owner.id);
    assert_eq!(members[0].role, ProjectRole::Leader);
    assert_eq!(members[1].role, ProjectRole::Member);

    Project::delete(&pool, project.id).await.unwrap();
}

#[tokio::test]
async fn test_project_creation_rolls_back_on_bad_collaborator() {
    let Some(pool) = common::test_pool().await else { return };
    let owner = common::create_user(&pool, UserRole::Leader).await;

    let result = Project::create(
        &pool,
        CreateProject {
            name: "Doomed".to_string(),
            description: None,
            background_url: None,
            owner_id: owner.id,
            collaborator_id: Some(Uuid::new_v4()),
        },
    )
    .await;
    assert!(result.is_err());

    let owned = Project::list_for_user(&pool, owner.id).await.unwrap();
    assert!(owned.is_empty(), "project insert must be rolled back");
}

#[tokio::test]
async fn test_task_assignment_is_replaced_on_update() {
    let Some(pool) = common::test_pool().await else { return };
    let owner = common::create_user(&pool, UserRole::Leader).await;
    let first = common::create_user(&pool, UserRole::Member).await;
    let second = common::create_user(&pool, UserRole::Member).await;

    let project = Project::create(
        &pool,
        CreateProject {
            name: "Board".to_string(),
            description: None,
            background_url: None,
            owner_id: owner.id,
            collaborator_id: None,
        },
    )
    .await
    .unwrap();

    let task = Task::create(
        &pool,
        CreateTask {
            project_id: project.id,
            title: "Draft".to_string(),
            description: None,
            status: TaskStatus::Pending,
            deadline: Some(Utc::now().date_naive()),
            assignee_ids: vec![first.id],
        },
    )
    .await
    .unwrap();
    assert!(Task::is_assigned(&pool, task.id, first.id).await.unwrap());

    let updated = Task::update(
        &pool,
        task.id,
        UpdateTask {
            status: Some(TaskStatus::InProgress),
            assignee_ids: Some(vec![second.id]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.status, TaskStatus::InProgress);
    let assignees = Task::assignees(&pool, task.id).await.unwrap();
    assert_eq!(assignees.len(), 1);
    assert_eq!(assignees[0].id, second.id);

    let due = Task::due_between(&pool, Utc::now().date_naive(), Utc::now().date_naive() + Duration::days(1))
        .await
        .unwrap();
    assert!(due.iter().any(|d| d.task_id == task.id && d.user_id == second.id));

    Project::delete(&pool, project.id).await.unwrap();
    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_verification_codes_are_single_use_and_replaced() {
    let Some(pool) = common::test_pool().await else { return };
    let email = common::unique_email("verify");

    let first_code = generate_code();
    EmailVerification::issue(
        &pool,
        IssueVerification {
            email: email.clone(),
            purpose: VerificationPurpose::Registration,
            code: first_code.clone(),
            name: Some("New".to_string()),
            password_hash: Some("hash".to_string()),
        },
    )
    .await
    .unwrap();

    let second_code = if first_code == "111111" { "222222".to_string() } else { "111111".to_string() };
    EmailVerification::issue(
        &pool,
        IssueVerification {
            email: email.clone(),
            purpose: VerificationPurpose::Registration,
            code: second_code.clone(),
            name: Some("New".to_string()),
            password_hash: Some("hash".to_string()),
        },
    )
    .await
    .unwrap();

    let stale = EmailVerification::find_valid(&pool, &email, &first_code, VerificationPurpose::Registration)
        .await
        .unwrap();
    assert!(stale.is_none(), "an earlier code must be replaced");

    let record = EmailVerification::find_valid(&pool, &email, &second_code, VerificationPurpose::Registration)
        .await
        .unwrap()
        .expect("current code is valid");
    assert_eq!(record.name.as_deref(), Some("New"));

    assert!(EmailVerification::delete(&pool, record.id).await.unwrap());
    let reused = EmailVerification::find_valid(&pool, &email, &second_code, VerificationPurpose::Registration)
        .await
        .unwrap();
    assert!(reused.is_none());
}

#[tokio::test]
async fn test_revoked_session_no_longer_resolves() {
    let Some(pool) = common::test_pool().await else { return };
    let user = common::create_user(&pool, UserRole::Member).await;

    let session = Session::create(&pool, user.id, Utc::now() + Duration::hours(1)).await.unwrap();
    let found = Session::find_active_user(&pool, session.id, user.id).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    assert!(Session::revoke(&pool, session.id).await.unwrap());
    assert!(Session::find_active_user(&pool, session.id, user.id).await.unwrap().is_none());

    let expired = Session::create(&pool, user.id, Utc::now() - Duration::minutes(1)).await.unwrap();
    assert!(Session::find_active_user(&pool, expired.id, user.id).await.unwrap().is_none());
}

async fn issue_reset_code(pool: &sqlx::PgPool, email: &str) -> (EmailVerification, String) {
    let code = generate_code();
    let record = EmailVerification::issue(
        pool,
        IssueVerification {
            email: email.to_string(),
            purpose: VerificationPurpose::PasswordReset,
            code: code.clone(),
            name: None,
            password_hash: None,
        },
    )
    .await
    .unwrap();

    (record, code)
}

#[tokio::test]
async fn test_expired_code_is_not_found() {
    let Some(pool) = common::test_pool().await else { return };
    let email = common::unique_email("expired");
    let (record, code) = issue_reset_code(&pool, &email).await;

    let fresh = EmailVerification::find_valid(&pool, &email, &code, VerificationPurpose::PasswordReset)
        .await
        .unwrap();
    assert_eq!(fresh.map(|r| r.id), Some(record.id));

    sqlx::query("UPDATE email_verifications SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await
        .unwrap();

    let expired = EmailVerification::find_valid(&pool, &email, &code, VerificationPurpose::PasswordReset)
        .await
        .unwrap();
    assert!(expired.is_none(), "a code past its expiry must not verify");
}

#[tokio::test]
async fn test_reset_password_applies_all_changes_together() {
    let Some(pool) = common::test_pool().await else { return };
    let user = common::create_user(&pool, UserRole::Member).await;
    let (record, code) = issue_reset_code(&pool, &user.email).await;

    Session::create(&pool, user.id, Utc::now() + Duration::hours(1)).await.unwrap();
    Session::create(&pool, user.id, Utc::now() + Duration::hours(1)).await.unwrap();

    let revoked = User::reset_password(&pool, user.id, "new-hash", record.id).await.unwrap();
    assert_eq!(revoked, Some(2));

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "new-hash");

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sessions, 0);

    let reused = EmailVerification::find_valid(&pool, &user.email, &code, VerificationPurpose::PasswordReset)
        .await
        .unwrap();
    assert!(reused.is_none(), "the reset code is consumed");
}

#[tokio::test]
async fn test_reset_password_with_consumed_code_changes_nothing() {
    let Some(pool) = common::test_pool().await else { return };
    let user = common::create_user(&pool, UserRole::Member).await;
    let (record, _) = issue_reset_code(&pool, &user.email).await;
    let session = Session::create(&pool, user.id, Utc::now() + Duration::hours(1)).await.unwrap();

    assert!(EmailVerification::delete(&pool, record.id).await.unwrap());

    let revoked = User::reset_password(&pool, user.id, "new-hash", record.id).await.unwrap();
    assert!(revoked.is_none());

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, user.password_hash);
    assert!(Session::find_active_user(&pool, session.id, user.id).await.unwrap().is_some());
}
