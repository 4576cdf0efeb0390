//! Concerns endpoint integration tests
//!
//! Covers:
//! - `POST /api/concerns`: submit (reference numbers, parallel submissions, validation)
//! - `GET /api/concerns` and `GET /api/concerns/{id}`: visibility per role
//! - `PATCH /api/concerns/{id}/status`: timestamps and student limits
//! - `POST /api/concerns/{id}/messages`: internal notes
//! - `POST /api/concerns/{id}/assign`
//! - `POST /api/concerns/{id}/attachments`: not implemented

use std::collections::HashSet;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};

mod common;
use common::{build_app, create_test_db, insert_user, send, token_for, BSCE, BSIT};

use studentlink::models::enums::Role;

fn concern_body(subject: &str) -> Value {
    json!({
        "subject": subject,
        "description": "The projector in room 301 has been broken for a week.",
        "type": "technical",
        "priority": "high",
        "department_id": BSIT,
    })
}

async fn submit(app: &axum::Router, token: &str, subject: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/concerns",
        Some(token),
        Some(concern_body(subject)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body["data"].clone()
}

#[tokio::test]
async fn test_submit_concern_assigns_reference_number() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);

    let first = submit(&app, &token, "Broken projector").await;
    let second = submit(&app, &token, "Broken aircon").await;

    let prefix = format!("CNR{}", Utc::now().format("%Y%m"));
    assert_eq!(first["reference_number"], format!("{}0001", prefix));
    assert_eq!(second["reference_number"], format!("{}0002", prefix));
    assert_eq!(first["status"], "pending");
    assert_eq!(first["student_id"], student.id);
    assert_eq!(first["department"]["code"], "BSIT");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_submissions_get_distinct_reference_numbers() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let subject = format!("Broken projector #{}", i);
                send(
                    &app,
                    "POST",
                    "/api/concerns",
                    Some(&token),
                    Some(concern_body(&subject)),
                )
                .await
            })
        })
        .collect();

    let prefix = format!("CNR{}", Utc::now().format("%Y%m"));
    let mut references = HashSet::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        let reference = body["data"]["reference_number"].as_str().unwrap().to_string();
        assert!(reference.starts_with(&prefix), "bad reference: {}", reference);
        references.insert(reference);
    }

    assert_eq!(references.len(), 20);
}

#[tokio::test]
async fn test_submit_concern_rejects_unknown_department() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let mut body = concern_body("Broken projector");
    body["department_id"] = json!(9999);
    let (status, body) = send(
        &app,
        "POST",
        "/api/concerns",
        Some(&token_for(&student)),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["department_id"].is_array());
}

#[tokio::test]
async fn test_students_only_see_their_own_concerns() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let owner = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let other = insert_user(&db, "maria@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;

    let created = submit(&app, &token_for(&owner), "Broken projector").await;
    let uri = format!("/api/concerns/{}", created["id"]);

    let (status, _) = send(&app, "GET", &uri, Some(&token_for(&other)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/concerns", Some(&token_for(&other)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = send(&app, "GET", &uri, Some(&token_for(&staff)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Broken projector");
}

#[tokio::test]
async fn test_department_head_scoped_to_department() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let bsit_head =
        insert_user(&db, "head.it@bestlink.edu.ph", Role::DepartmentHead, Some(BSIT)).await;
    let bsce_head =
        insert_user(&db, "head.ce@bestlink.edu.ph", Role::DepartmentHead, Some(BSCE)).await;

    let created = submit(&app, &token_for(&student), "Broken projector").await;
    let uri = format!("/api/concerns/{}", created["id"]);

    let (status, _) = send(&app, "GET", &uri, Some(&token_for(&bsit_head)), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, Some(&token_for(&bsce_head)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_change_stamps_timestamps() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let staff_token = token_for(&staff);

    let created = submit(&app, &token_for(&student), "Broken projector").await;
    let uri = format!("/api/concerns/{}/status", created["id"]);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&staff_token),
        Some(json!({ "status": "resolved", "note": "Projector replaced" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");
    assert!(body["data"]["resolved_at"].is_string());
    assert!(body["data"]["closed_at"].is_null());

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&staff_token),
        Some(json!({ "status": "closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["closed_at"].is_string());
    assert!(body["data"]["resolved_at"].is_null());

    let history_uri = format!("/api/concerns/{}/history", created["id"]);
    let (status, body) = send(&app, "GET", &history_uri, Some(&token_for(&student)), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["type"], "status_change");
    assert_eq!(history[0]["message"], "Projector replaced");
}

#[tokio::test]
async fn test_student_may_only_cancel() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);

    let created = submit(&app, &token, "Broken projector").await;
    let uri = format!("/api/concerns/{}/status", created["id"]);

    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&token),
        Some(json!({ "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    // Only pending concerns stay editable for students
    let edit_uri = format!("/api/concerns/{}", created["id"]);
    let (status, _) = send(
        &app,
        "PUT",
        &edit_uri,
        Some(&token),
        Some(json!({ "subject": "Updated" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_internal_messages_hidden_from_students() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let student_token = token_for(&student);
    let staff_token = token_for(&staff);

    let created = submit(&app, &student_token, "Broken projector").await;
    let uri = format!("/api/concerns/{}/messages", created["id"]);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&student_token),
        Some(json!({ "message": "Let me see the notes", "is_internal": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&staff_token),
        Some(json!({ "message": "Waiting on facilities", "is_internal": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&staff_token),
        Some(json!({ "message": "We are on it" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, "GET", &uri, Some(&student_token), None).await;
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["message"], "We are on it");

    let (_, body) = send(&app, "GET", &uri, Some(&staff_token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_assign_requires_staff_assignee() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;
    let faculty = insert_user(&db, "prof@bestlink.edu.ph", Role::Faculty, Some(BSIT)).await;

    let created = submit(&app, &token_for(&student), "Broken projector").await;
    let uri = format!("/api/concerns/{}/assign", created["id"]);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&token_for(&student)),
        Some(json!({ "assigned_to": faculty.id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&token_for(&staff)),
        Some(json!({ "assigned_to": student.id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&token_for(&staff)),
        Some(json!({ "assigned_to": faculty.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assigned_to"], faculty.id);
}

#[tokio::test]
async fn test_attachment_upload_not_implemented() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);

    let created = submit(&app, &token, "Broken projector").await;
    let uri = format!("/api/concerns/{}/attachments", created["id"]);

    let (status, _) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}
