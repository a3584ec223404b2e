#![allow(dead_code)]

/// Shared infrastructure for API integration tests
///
/// Tests drive the router in-process with `tower::ServiceExt::oneshot`
/// against the database in `DATABASE_URL`. Without it, [`TestContext::new`]
/// returns `None` and the test returns early.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{Arc, Mutex, OnceLock};
use teamboard_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseSettings, JwtConfig},
};
use teamboard_shared::{
    auth::{
        jwt::{create_token, Claims},
        password::hash_password,
    },
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    models::{
        session::Session,
        user::{CreateUser, User, UserRole},
    },
    notify::{Notification, Notifier, NotifyError},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Password of every user created by [`TestContext::user`]
pub const TEST_PASSWORD: &str = "test-password-123";

fn test_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).expect("Failed to hash password"))
        .clone()
}

/// Captures notifications instead of delivering them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Last verification code sent to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::VerificationCode { email: to, code, .. } if to == email => Some(code),
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseSettings {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            ttl_hours: 24,
        },
    }
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        dotenvy::dotenv().ok();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping API integration test");
            return None;
        };

        let db = create_pool(DatabaseConfig::from_url(url.clone()).with_max_connections(5))
            .await
            .expect("Failed to connect to test database");
        run_migrations(&db).await.expect("Failed to run migrations");

        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(db.clone(), test_config(url)).with_notifier(notifier.clone());

        Some(Self {
            app: build_router(state),
            db,
            notifier,
        })
    }

    /// Creates a verified user and a live session, returning the bearer token
    pub async fn user(&self, role: UserRole) -> (User, String) {
        let user = User::create(
            &self.db,
            CreateUser {
                name: format!("{} {}", role, &Uuid::new_v4().simple().to_string()[..6]),
                email: unique_email(role.as_str()),
                password_hash: test_password_hash(),
                role,
                verified: true,
            },
        )
        .await
        .expect("Failed to create user");

        let ttl = chrono::Duration::hours(1);
        let session = Session::create(&self.db, user.id, Utc::now() + ttl)
            .await
            .expect("Failed to create session");
        let token = create_token(&Claims::new(user.id, session.id, user.role, ttl), TEST_SECRET)
            .expect("Failed to sign token");

        (user, token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn project(&self, token: &str, collaborator_email: Option<&str>) -> Uuid {
        let mut body = serde_json::json!({ "name": "Apollo", "description": "Moon shot" });
        if let Some(email) = collaborator_email {
            body["collaborator_email"] = Value::from(email);
        }

        let (status, json) = self.post("/api/projects", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"]["id"].as_str().unwrap().parse().unwrap()
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}
