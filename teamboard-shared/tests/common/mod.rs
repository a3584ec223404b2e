#![allow(dead_code)]

/// Shared setup for database-backed tests
///
/// Tests run against the database in `DATABASE_URL` (a `.env` file is
/// honoured). When the variable is unset the calling test returns early.

use sqlx::PgPool;
use teamboard_shared::db::migrations::run_migrations;
use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
use teamboard_shared::models::user::{CreateUser, User, UserRole};
use uuid::Uuid;

pub fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok()
}

pub async fn test_pool() -> Option<PgPool> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = create_pool(DatabaseConfig::from_url(url).with_max_connections(5))
        .await
        .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.test", prefix, Uuid::new_v4().simple())
}

pub async fn create_user(pool: &PgPool, role: UserRole) -> User {
    User::create(
        pool,
        CreateUser {
            name: format!("{} user", role),
            email: unique_email(role.as_str()),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
            role,
            verified: true,
        },
    )
    .await
    .expect("Failed to create user")
}
