//! Authentication integration tests
//!
//! Covers:
//! - `POST /api/auth/login`
//! - `GET /api/auth/me`
//! - `POST /api/auth/logout` and `POST /api/auth/refresh`
//! - `POST /api/auth/reset-password`: earlier tokens stop working
//! - `GET /api/health`

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

mod common;
use common::{build_app, create_test_db, insert_user, send, token_for, BSIT};

use studentlink::models::enums::Role;
use studentlink::models::password_reset_token;
use studentlink::services::hash_reset_token;

#[tokio::test]
async fn test_health_is_public() {
    let db = create_test_db().await;
    let app = build_app(&db);

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "StudentLink Backend API");

    let (status, body) = send(&app, "GET", "/api/health/detailed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let db = create_test_db().await;
    let app = build_app(&db);
    insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "juan@bestlink.edu.ph", "password": "password123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["email"], "juan@bestlink.edu.ph");
    assert!(body["data"]["user"].get("password").is_none());
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let db = create_test_db().await;
    let app = build_app(&db);
    insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "juan@bestlink.edu.ph", "password": "wrong-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_validates_email() {
    let db = create_test_db().await;
    let app = build_app(&db);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let db = create_test_db().await;
    let app = build_app(&db);

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/concerns", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let user = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&user);

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user.id);

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_swaps_token() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let user = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let old_token = token_for(&user);

    let (status, body) = send(&app, "POST", "/api/auth/refresh", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&new_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_invalidates_existing_tokens() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let user = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let old_token = token_for(&user);

    password_reset_token::ActiveModel {
        email: Set(user.email.clone()),
        token_hash: Set(hash_reset_token("reset-me")),
        expires_at: Set(Utc::now() + Duration::hours(1)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({
            "email": "juan@bestlink.edu.ph",
            "token": "reset-me",
            "password": "brand-new-pass",
            "password_confirmation": "brand-new-pass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "juan@bestlink.edu.ph", "password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    let new_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&new_token), None).await;
    assert_eq!(status, StatusCode::OK);
}
