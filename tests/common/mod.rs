//! Shared setup for the HTTP integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::util::ServiceExt;

use studentlink::config::openai::OpenAiConfig;
use studentlink::endpoints::create_router;
use studentlink::migrations::Migrator;
use studentlink::models::enums::Role;
use studentlink::models::user;
use studentlink::services::security::create_access_token;
use studentlink::state::AppState;

/// Seeded department IDs
pub const ADMINISTRATION: i64 = 1;
pub const BSIT: i64 = 2;
pub const BSCE: i64 = 3;

/// Create an in-memory SQLite database with all migrations applied
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// OpenAI settings pointing at `base_url`; no key when `base_url` is None
pub fn openai_config(base_url: Option<String>) -> OpenAiConfig {
    OpenAiConfig {
        api_key: base_url.as_ref().map(|_| "test-key".to_string()),
        base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string()),
        model: "gpt-test".to_string(),
        max_tokens: 100,
        temperature: 0.2,
        timeout_secs: 5,
    }
}

/// Full API router backed by `db`, without push or AI providers
pub fn build_app(db: &DatabaseConnection) -> Router {
    build_app_with_openai(db, None)
}

pub fn build_app_with_openai(db: &DatabaseConnection, openai_url: Option<String>) -> Router {
    let state = AppState::with_services(db.clone(), None, openai_config(openai_url));
    create_router(state)
}

/// Insert an active user with the password "password123"
pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    department_id: Option<i64>,
) -> user::Model {
    let now = Utc::now();
    let local = email.split('@').next().unwrap_or(email);

    user::ActiveModel {
        student_id: Set(role.is_student().then(|| format!("S-{}", local))),
        employee_id: Set((!role.is_student()).then(|| format!("E-{}", local))),
        name: Set(format!("Test {}", local)),
        email: Set(email.to_string()),
        password: Set(bcrypt::hash("password123", 4).unwrap()),
        role: Set(role),
        department_id: Set(department_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert test user")
}

/// Bearer token for `user`
pub fn token_for(user: &user::Model) -> String {
    create_access_token(user).expect("Failed to issue test token")
}

/// Send a request and return (status, raw body)
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

/// Send a request and parse the JSON body (Null when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, method, uri, token, body).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };
    (status, json)
}
