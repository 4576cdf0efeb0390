//! Announcements endpoint integration tests
//!
//! Covers:
//! - `POST /api/announcements`: staff only, publishing switch
//! - `GET /api/announcements` and `GET /api/announcements/{id}`: student visibility
//! - `POST|DELETE /api/announcements/{id}/bookmark`
//! - `GET /api/announcements/user/bookmarks`

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;
use common::{build_app, create_test_db, insert_user, send, token_for, BSCE, BSIT};

use studentlink::models::enums::Role;
use studentlink::services::settings;

async fn publish(app: &axum::Router, token: &str, body: Value) -> Value {
    let (status, body) = send(app, "POST", "/api/announcements", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body["data"].clone()
}

#[tokio::test]
async fn test_students_cannot_create_announcements() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/announcements",
        Some(&token_for(&student)),
        Some(json!({ "title": "Party", "content": "Tonight" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_student_visibility_follows_status_and_targets() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff_token = token_for(&staff);
    let student_token = token_for(&student);

    let everyone = publish(
        &app,
        &staff_token,
        json!({
            "title": "Enrollment",
            "content": "Enrollment opens Monday",
            "status": "published",
        }),
    )
    .await;
    let draft = publish(
        &app,
        &staff_token,
        json!({ "title": "Draft", "content": "Not yet" }),
    )
    .await;
    let other_department = publish(
        &app,
        &staff_token,
        json!({
            "title": "BSCE lab schedule",
            "content": "Lab moves to room 204",
            "status": "published",
            "target_departments": [BSCE],
        }),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/announcements", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![everyone["id"].as_i64().unwrap()]);

    for hidden in [&draft, &other_department] {
        let uri = format!("/api/announcements/{}", hidden["id"]);
        let (status, _) = send(&app, "GET", &uri, Some(&student_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, body) = send(&app, "GET", "/api/announcements", Some(&staff_token), None).await;
    assert_eq!(body["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_bookmark_is_idempotent() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let student_token = token_for(&student);

    let created = publish(
        &app,
        &token_for(&staff),
        json!({
            "title": "Enrollment",
            "content": "Enrollment opens Monday",
            "status": "published",
        }),
    )
    .await;
    let bookmark_uri = format!("/api/announcements/{}/bookmark", created["id"]);

    for _ in 0..2 {
        let (status, _) = send(&app, "POST", &bookmark_uri, Some(&student_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/api/announcements/{}", created["id"]);
    let (_, body) = send(&app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(body["data"]["bookmark_count"], 1);
    assert_eq!(body["data"]["is_bookmarked"], true);
    assert_eq!(body["data"]["view_count"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/api/announcements/user/bookmarks",
        Some(&student_token),
        None,
    )
    .await;
    let bookmarks = body["data"].as_array().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert!(bookmarks[0]["bookmarked_at"].is_string());

    for _ in 0..2 {
        let (status, _) = send(&app, "DELETE", &bookmark_uri, Some(&student_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(body["data"]["bookmark_count"], 0);
    assert_eq!(body["data"]["is_bookmarked"], false);
}

#[tokio::test]
async fn test_publishing_switch_blocks_published_announcements() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let token = token_for(&staff);

    settings::update(&db, settings::ANNOUNCEMENTS_ENABLED, &json!(false))
        .await
        .unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/announcements",
        Some(&token),
        Some(json!({ "title": "Enrollment", "content": "Opens Monday", "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Drafts are still allowed
    publish(&app, &token, json!({ "title": "Enrollment", "content": "Opens Monday" })).await;
}
