#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use teamboard_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    models::user::{CreateUser, User, UserRole},
    notify::{Notification, Notifier, NotifyError},
};
use uuid::Uuid;

pub async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping worker test");
        return None;
    };

    let pool = create_pool(DatabaseConfig::from_url(url).with_max_connections(2))
        .await
        .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

pub async fn create_user(pool: &PgPool) -> User {
    User::create(
        pool,
        CreateUser {
            name: "Reminder target".to_string(),
            email: format!("worker-{}@example.test", Uuid::new_v4().simple()),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
            role: UserRole::Member,
            verified: true,
        },
    )
    .await
    .expect("Failed to create user")
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent_to(&self, email: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipient() == email)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}
