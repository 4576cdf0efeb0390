//! Notifications endpoint integration tests
//!
//! Covers:
//! - `GET /api/notifications`: inbox with unread count
//! - `POST /api/notifications/mark-read` and `/mark-all-read`
//! - `DELETE /api/notifications/{id}`: ownership
//! - `POST|DELETE /api/notifications/fcm-token` and `GET /api/notifications/fcm-tokens`

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{build_app, create_test_db, insert_user, send, token_for, BSIT};

use studentlink::models::enums::Role;

/// Submit a concern as `student` and have `staff` move it, producing one notification
async fn notify_student(app: &axum::Router, student_token: &str, staff_token: &str) {
    let (status, body) = send(
        app,
        "POST",
        "/api/concerns",
        Some(student_token),
        Some(json!({
            "subject": "Library card",
            "description": "My library card was not issued.",
            "type": "administrative",
            "department_id": BSIT,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/concerns/{}/status", body["data"]["id"]);
    let (status, _) = send(
        app,
        "PATCH",
        &uri,
        Some(staff_token),
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_change_lands_in_inbox() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let token = token_for(&student);

    notify_student(&app, &token, &token_for(&staff)).await;

    let (status, body) = send(&app, "GET", "/api/notifications", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["unread_count"], 1);
    assert_eq!(body["data"][0]["type"], "concern_update");
    assert!(body["data"][0]["read_at"].is_null());

    let (status, body) = send(
        &app,
        "POST",
        "/api/notifications/mark-all-read",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_count"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/api/notifications?unread_only=true",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["pagination"]["unread_count"], 0);
}

#[tokio::test]
async fn test_mark_read_only_touches_own_notifications() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let other = insert_user(&db, "maria@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let token = token_for(&student);

    notify_student(&app, &token, &token_for(&staff)).await;
    let (_, body) = send(&app, "GET", "/api/notifications", Some(&token), None).await;
    let id = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/notifications/mark-read",
        Some(&token_for(&other)),
        Some(json!({ "notification_ids": [id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_count"], 0);

    let uri = format!("/api/notifications/{}", id);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token_for(&other)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/notifications/mark-read",
        Some(&token),
        Some(json!({ "notification_ids": [id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_count"], 1);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_fcm_token_lifecycle() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);
    let register = json!({
        "token": "device-token-1",
        "device_type": "android",
        "device_id": "pixel",
    });

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/api/notifications/fcm-token",
            Some(&token),
            Some(register.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/notifications/fcm-tokens",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tokens"], 1);
    assert!(!body.to_string().contains("device-token-1"));

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/notifications/fcm-token",
        Some(&token),
        Some(json!({ "token": "device-token-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/notifications/fcm-tokens", Some(&token), None).await;
    assert_eq!(body["total_tokens"], 0);
}
