//! Analytics endpoint integration tests
//!
//! Covers:
//! - `GET /api/analytics/dashboard`
//! - `GET /api/analytics/reports/concerns`: department head scoping
//! - `GET /api/analytics/reports/export`: CSV download

use axum::http::{header, StatusCode};
use serde_json::json;

mod common;
use common::{build_app, create_test_db, insert_user, send, send_raw, token_for, BSCE, BSIT};

use studentlink::models::enums::Role;

async fn submit(
    app: &axum::Router,
    token: &str,
    subject: &str,
    department_id: i64,
    anonymous: bool,
) {
    let (status, body) = send(
        app,
        "POST",
        "/api/concerns",
        Some(token),
        Some(json!({
            "subject": subject,
            "description": "Details, with a comma",
            "type": "academic",
            "department_id": department_id,
            "is_anonymous": anonymous,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    submit(&app, &token_for(&student), "Grades missing", BSIT, false).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/analytics/dashboard",
        Some(&token_for(&admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 2);
    assert_eq!(body["data"]["pendingConcerns"], 1);
    assert_eq!(body["data"]["activeConcerns"], 1);
    assert_eq!(body["data"]["resolvedConcerns"], 0);

    let (_, body) = send(
        &app,
        "GET",
        "/api/analytics/dashboard",
        Some(&token_for(&student)),
        None,
    )
    .await;
    assert_eq!(body["data"]["recentConcerns"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concern_report_scoped_for_department_heads() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let head = insert_user(&db, "head@bestlink.edu.ph", Role::DepartmentHead, Some(BSIT)).await;
    let token = token_for(&student);
    submit(&app, &token, "IT concern", BSIT, false).await;
    submit(&app, &token, "CE concern", BSCE, false).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/analytics/reports/concerns",
        Some(&token_for(&head)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["subject"], "IT concern");

    let uri = format!("/api/analytics/reports/concerns?department_id={}", BSCE);
    let (status, _) = send(&app, "GET", &uri, Some(&token_for(&head)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics/reports/concerns",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_rejects_inverted_range() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics/reports/concerns?date_from=2025-06-10&date_to=2025-06-01",
        Some(&token_for(&admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_export_concerns_csv() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    submit(&app, &token_for(&student), "Broken chair", BSIT, true).await;

    let (status, headers, body) = send_raw(
        &app,
        "GET",
        "/api/analytics/reports/export",
        Some(&token_for(&admin)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"concerns_report_"));

    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("reference_number,subject,"));
    let row = lines.next().unwrap();
    assert!(row.contains("Broken chair"));
    assert!(row.contains("Anonymous"));
    assert!(!row.contains("Test juan"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_export_departments_csv() {
    let db = create_test_db().await;
    let app = build_app(&db);
    let admin = insert_user(&db, "admin@bestlink.edu.ph", Role::Admin, None).await;

    let (status, _, body) = send_raw(
        &app,
        "GET",
        "/api/analytics/reports/export?report=departments",
        Some(&token_for(&admin)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.lines().any(|line| line.contains("BSIT")));
}
