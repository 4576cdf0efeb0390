//! Administration integration tests
//!
//! Covers:
//! - `/api/departments`: CRUD, delete guard, head scoping
//! - `/api/emergency`: contacts and protocols
//! - `/api/system/settings`: typed settings and maintenance mode
//! - `/api/system/audit-logs`

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{build_app, create_test_db, insert_user, send, token_for, BSCE, BSIT};

use studentlink::models::enums::Role;

#[tokio::test]
async fn test_department_crud() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let token = token_for(&admin);

    let (status, body) = send(
        &app,
        "POST",
        "/api/departments",
        Some(&token),
        Some(json!({ "name": "Guidance Office", "code": "guid", "type": "administrative" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    assert_eq!(body["data"]["code"], "GUID");
    let uri = format!("/api/departments/{}", body["data"]["id"]);

    let (status, _) = send(
        &app,
        "POST",
        "/api/departments",
        Some(&token),
        Some(json!({ "name": "Duplicate", "code": "GUID", "type": "administrative" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "name": "Guidance and Counseling" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Guidance and Counseling");

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["concerns_count"], 0);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_department_with_concerns_cannot_be_deleted() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/concerns",
        Some(&token_for(&student)),
        Some(json!({
            "subject": "Grades missing",
            "description": "My grades for IT101 are not posted.",
            "type": "academic",
            "department_id": BSIT,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/departments/{}", BSIT);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token_for(&admin)), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_department_stats_scoped_for_heads() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let head = insert_user(&db, "head@bestlink.edu.ph", Role::DepartmentHead, Some(BSIT)).await;
    let token = token_for(&head);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/departments/{}/stats", BSIT),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/departments/{}/stats", BSCE),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_emergency_contacts_and_protocols() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let admin_token = token_for(&admin);
    let student_token = token_for(&student);

    let contact = json!({
        "name": "Campus Clinic",
        "type": "medical",
        "phone": "+63-2-8123-4000",
        "priority": 1,
    });
    let (status, _) = send(
        &app,
        "POST",
        "/api/emergency/contacts",
        Some(&student_token),
        Some(contact.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/emergency/contacts",
        Some(&admin_token),
        Some(contact),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);

    let (status, body) = send(
        &app,
        "GET",
        "/api/emergency/contacts",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["name"] == "Campus Clinic"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/emergency/protocols",
        Some(&admin_token),
        Some(json!({ "title": "Fire", "type": "fire", "description": "Evacuate", "steps": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        "/api/emergency/protocols",
        Some(&admin_token),
        Some(json!({
            "title": "Fire",
            "type": "fire",
            "description": "Evacuate the building",
            "steps": ["Sound the alarm", "Use the nearest exit"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);

    let uri = format!("/api/emergency/protocols/{}", body["data"]["id"]);
    let (status, _) = send(&app, "DELETE", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_update_is_typed_and_audited() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let token = token_for(&admin);

    let (status, body) = send(&app, "GET", "/api/system/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ai_enabled"], true);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/system/settings",
        Some(&token),
        Some(json!({ "settings": { "no_such_setting": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["no_such_setting"].is_array());

    let (status, body) = send(
        &app,
        "PUT",
        "/api/system/settings",
        Some(&token),
        Some(json!({ "settings": { "ai_enabled": false } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ai_enabled"], false);

    let (status, body) = send(
        &app,
        "GET",
        "/api/system/audit-logs?action=settings_updated",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["old_values"]["ai_enabled"], true);
    assert_eq!(body["data"][0]["new_values"]["ai_enabled"], false);
}

#[tokio::test]
async fn test_maintenance_mode_blocks_non_admins() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/system/settings",
        Some(&token_for(&admin)),
        Some(json!({ "settings": { "maintenance_mode": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/concerns", Some(&token_for(&student)), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/concerns", Some(&token_for(&admin)), None).await;
    assert_eq!(status, StatusCode::OK);

    // Health stays public
    let (status, _) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_system_routes_are_admin_only() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let head = insert_user(&db, "head@bestlink.edu.ph", Role::DepartmentHead, Some(BSIT)).await;

    for uri in ["/api/system/settings", "/api/system/audit-logs", "/api/system/system-info"] {
        let (status, _) = send(&app, "GET", uri, Some(&token_for(&head)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }
}
