//! AI assistant integration tests against a stub completion server
//!
//! Covers:
//! - `POST /api/ai/chat`: session persistence and the `ai_enabled` switch
//! - `POST /api/ai/suggestions`
//! - `GET|DELETE /api/ai/sessions/{session_id}`: ownership

use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

mod common;
use common::{build_app, build_app_with_openai, create_test_db, insert_user, send, token_for, BSIT};

use studentlink::models::enums::Role;
use studentlink::services::settings;

/// Start a stub OpenAI server and return its base URL
async fn start_stub() -> String {
    async fn completions(Json(payload): Json<Value>) -> Json<Value> {
        let turns = payload["messages"].as_array().map(|m| m.len()).unwrap_or(0);
        Json(json!({
            "model": "gpt-stub",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": format!("stub reply to {} turns", turns),
                },
                "finish_reason": "stop"
            }],
            "usage": { "total_tokens": 42 }
        }))
    }

    let app = Router::new().route("/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_chat_keeps_session_history() {
    let db = create_test_db().await;
    let app = build_app_with_openai(&db, Some(start_stub().await));
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);

    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/chat",
        Some(&token),
        Some(json!({ "message": "How do I file a concern?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    // system prompt plus one user turn
    assert_eq!(body["data"]["message"], "stub reply to 2 turns");
    assert_eq!(body["data"]["metadata"]["tokens_used"], 42);
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/chat",
        Some(&token),
        Some(json!({ "message": "And then?", "session_id": session_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "stub reply to 4 turns");

    let uri = format!("/api/ai/sessions/{}", session_id);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[3]["role"], "assistant");
    assert_eq!(body["data"]["metadata"]["total_tokens"], 84);

    // Sessions are private to their owner
    let other = insert_user(&db, "maria@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let (status, _) = send(&app, "GET", &uri, Some(&token_for(&other)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_suggestions_collects_replies() {
    let db = create_test_db().await;
    let app = build_app_with_openai(&db, Some(start_stub().await));
    let staff = insert_user(&db, "staff@bestlink.edu.ph", Role::Staff, Some(BSIT)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/suggestions",
        Some(&token_for(&staff)),
        Some(json!({
            "context": "Student reports a broken projector",
            "type": "concern_reply",
            "tone": "friendly",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["data"]["type"], "concern_reply");
    assert!(!body["data"]["suggestions"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        "POST",
        "/api/ai/suggestions",
        Some(&token_for(&staff)),
        Some(json!({ "context": "x", "type": "poem" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_chat_unavailable_when_disabled_or_unconfigured() {
    let db = create_test_db().await;
    let student = insert_user(&db, "juan@bestlink.edu.ph", Role::Student, Some(BSIT)).await;
    let token = token_for(&student);
    let request = json!({ "message": "Hello" });

    // No API key configured
    let app = build_app(&db);
    let (status, _) = send(&app, "POST", "/api/ai/chat", Some(&token), Some(request.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    settings::update(&db, settings::AI_ENABLED, &json!(false))
        .await
        .unwrap();
    let app = build_app_with_openai(&db, Some(start_stub().await));
    let (status, body) = send(&app, "POST", "/api/ai/chat", Some(&token), Some(request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "AI features are currently disabled");
}
