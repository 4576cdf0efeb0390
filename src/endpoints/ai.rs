use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::Authenticated;
use crate::models::audit_log::{AuditAction, ModelType};
use crate::models::enums::ChatContext;
use crate::models::prelude::*;
use crate::models::{ai_chat_session, user};
use crate::schemas::{ApiResponse, PageParams};
use crate::services::openai::{AudioFile, ChatMessage, PromptContext, SuggestionRequest};
use crate::services::{settings, AuditEntry};
use crate::state::AppState;

/// Whisper rejects uploads above 25 MB
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "m4a", "webm", "ogg", "mp4"];

/// Create AI assistant routes
pub fn ai_routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/suggestions", post(suggestions))
        .route(
            "/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES + 64 * 1024)),
        )
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{session_id}", get(get_session).delete(delete_session))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "The message must be between 1 and 2000 characters"
    ))]
    pub message: String,
    pub session_id: Option<String>,
    pub context: Option<ChatContext>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestionsRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "The context must be between 1 and 1000 characters"
    ))]
    pub context: String,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_suggestion_type"))]
    pub suggestion_type: String,
    #[validate(length(
        max = 2000,
        message = "The existing text may not be greater than 2000 characters"
    ))]
    pub existing_text: Option<String>,
    #[validate(custom(function = "validate_tone"))]
    pub tone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub context: Option<ChatContext>,
    pub related_concern_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
    pub context: String,
    #[serde(rename = "type")]
    pub suggestion_type: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
    pub language: Option<String>,
    pub duration: Option<f64>,
    /// Whisper does not report a confidence score
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub context: ChatContext,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session_id: String,
    pub context: ChatContext,
    pub messages: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn validate_suggestion_type(value: &str) -> std::result::Result<(), ValidationError> {
    match value {
        "concern_reply" | "announcement" | "message_completion" | "general" => Ok(()),
        _ => Err(ValidationError::new("type").with_message("The selected type is invalid".into())),
    }
}

fn validate_tone(value: &str) -> std::result::Result<(), ValidationError> {
    match value {
        "professional" | "friendly" | "formal" | "casual" => Ok(()),
        _ => Err(ValidationError::new("tone").with_message("The selected tone is invalid".into())),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn ensure_ai_enabled(state: &AppState) -> Result<()> {
    if !settings::get_bool(&state.db, settings::AI_ENABLED, true).await? {
        return Err(AppError::ServiceUnavailable(
            "AI features are currently disabled".to_string(),
        ));
    }
    Ok(())
}

/// Keep "not configured" as 503; anything else becomes a generic 500
fn upstream_failure(message: &'static str) -> impl Fn(AppError) -> AppError {
    move |e| match e {
        AppError::ServiceUnavailable(msg) => AppError::ServiceUnavailable(msg),
        other => {
            tracing::error!("{}: {}", message, other);
            AppError::Internal(message.to_string())
        }
    }
}

fn session_metadata(user: &user::Model, department: Option<String>) -> serde_json::Value {
    json!({
        "created_by_role": user.role,
        "department": department,
    })
}

async fn department_name(state: &AppState, user: &user::Model) -> Result<Option<String>> {
    let Some(department_id) = user.department_id else {
        return Ok(None);
    };
    Ok(Department::find_by_id(department_id)
        .one(&state.db)
        .await?
        .map(|d| d.name))
}

async fn new_session(
    state: &AppState,
    user: &user::Model,
    context: ChatContext,
    related_concern_id: Option<i64>,
) -> Result<ai_chat_session::Model> {
    let now = Utc::now();
    let department = department_name(state, user).await?;

    Ok(ai_chat_session::ActiveModel {
        user_id: Set(user.id),
        session_id: Set(uuid::Uuid::new_v4().to_string()),
        context: Set(context),
        related_concern_id: Set(related_concern_id),
        messages: Set(json!([])),
        metadata: Set(Some(session_metadata(user, department))),
        is_active: Set(true),
        last_activity_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?)
}

async fn find_session(
    state: &AppState,
    user_id: i64,
    session_id: &str,
) -> Result<Option<ai_chat_session::Model>> {
    Ok(AiChatSession::find()
        .filter(ai_chat_session::Column::SessionId.eq(session_id))
        .filter(ai_chat_session::Column::UserId.eq(user_id))
        .filter(ai_chat_session::Column::IsActive.eq(true))
        .one(&state.db)
        .await?)
}

/// Stored history as the chat turns sent upstream
fn history(messages: &serde_json::Value) -> Vec<ChatMessage> {
    serde_json::from_value(messages.clone()).unwrap_or_default()
}

/// Merge the running counters into the session metadata
fn accumulate_usage(
    metadata: Option<serde_json::Value>,
    total_messages: usize,
    tokens_used: Option<i64>,
) -> serde_json::Value {
    let mut metadata = match metadata {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let total_tokens = metadata
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        + tokens_used.unwrap_or(0);
    metadata.insert("total_messages".to_string(), json!(total_messages));
    metadata.insert("total_tokens".to_string(), json!(total_tokens));
    serde_json::Value::Object(metadata)
}

fn is_audio_upload(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ============================================================================
// Handlers
// ============================================================================

async fn chat(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> Result<ApiResponse<ChatResponse>> {
    ensure_ai_enabled(&state).await?;
    let context = req.context.unwrap_or_default();

    let existing = match req.session_id.as_deref() {
        Some(session_id) => find_session(&state, user.id, session_id).await?,
        None => None,
    };
    let session = match existing {
        Some(session) => session,
        None => new_session(&state, &user, context, None).await?,
    };

    let mut messages = match session.messages.clone() {
        serde_json::Value::Array(items) => items,
        _ => Vec::new(),
    };
    messages.push(json!({
        "role": "user",
        "content": req.message,
        "timestamp": Utc::now(),
    }));

    let completion = state
        .openai
        .chat_completion(
            &history(&serde_json::Value::Array(messages.clone())),
            PromptContext {
                user_role: user.role,
                context,
            },
        )
        .await
        .map_err(upstream_failure("Failed to process AI chat request"))?;

    let now = Utc::now();
    messages.push(json!({
        "role": "assistant",
        "content": completion.content,
        "timestamp": now,
        "model": completion.model,
        "tokens_used": completion.tokens_used,
    }));

    let total_messages = messages.len();
    let session_key = session.session_id.clone();
    let metadata = accumulate_usage(
        session.metadata.clone(),
        total_messages,
        completion.tokens_used,
    );

    let mut active = session.into_active_model();
    active.messages = Set(serde_json::Value::Array(messages));
    active.metadata = Set(Some(metadata));
    active.last_activity_at = Set(now);
    active.updated_at = Set(now);
    let saved = active.update(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::AiChat)
                .subject(ModelType::AiChatSession, saved.id)
                .metadata(json!({
                    "message_length": req.message.len(),
                    "response_length": completion.content.len(),
                    "tokens_used": completion.tokens_used,
                    "context": context,
                }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::ok(ChatResponse {
        session_id: session_key,
        message: completion.content,
        timestamp: now,
        metadata: json!({
            "model": completion.model,
            "tokens_used": completion.tokens_used,
        }),
    }))
}

async fn suggestions(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<SuggestionsRequest>,
) -> Result<ApiResponse<SuggestionsResponse>> {
    ensure_ai_enabled(&state).await?;

    let request = SuggestionRequest {
        context: &req.context,
        suggestion_type: &req.suggestion_type,
        existing_text: req.existing_text.as_deref().unwrap_or(""),
        tone: req.tone.as_deref().unwrap_or("professional"),
    };
    let suggestions = state
        .openai
        .suggestions(
            &request,
            PromptContext {
                user_role: user.role,
                context: ChatContext::Assistance,
            },
        )
        .await
        .map_err(upstream_failure("Failed to generate suggestions"))?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::AiSuggestions)
                .metadata(json!({
                    "context": req.context,
                    "type": req.suggestion_type,
                    "suggestions_count": suggestions.len(),
                }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::ok(SuggestionsResponse {
        suggestions,
        context: req.context,
        suggestion_type: req.suggestion_type,
    }))
}

async fn transcribe(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    mut multipart: Multipart,
) -> Result<ApiResponse<TranscriptionResponse>> {
    ensure_ai_enabled(&state).await?;

    let mut audio = None;
    let mut language = "en".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("audio") => {
                let file_name = field.file_name().unwrap_or("audio.webm").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid audio upload: {}", e)))?;
                audio = Some(AudioFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid language field: {}", e)))?;
                if !value.trim().is_empty() {
                    language = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let audio =
        audio.ok_or_else(|| AppError::invalid_field("audio", "The audio field is required"))?;
    if audio.bytes.is_empty() || !is_audio_upload(&audio.file_name) {
        return Err(AppError::BadRequest("Invalid audio file".to_string()));
    }
    if audio.bytes.len() > MAX_AUDIO_BYTES {
        return Err(AppError::invalid_field(
            "audio",
            "The audio may not be greater than 25 MB",
        ));
    }
    let file_size = audio.bytes.len();

    let transcription = state
        .openai
        .transcribe(audio, &language)
        .await
        .map_err(upstream_failure("Failed to transcribe audio"))?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::AiTranscribe)
                .metadata(json!({
                    "file_size": file_size,
                    "duration": transcription.duration,
                    "language": language,
                }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::ok(TranscriptionResponse {
        text: transcription.text,
        language: transcription.language,
        duration: transcription.duration,
        confidence: None,
    }))
}

async fn list_sessions(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<SessionListQuery>,
) -> Result<ApiResponse<Vec<ai_chat_session::Model>>> {
    let select = AiChatSession::find()
        .filter(ai_chat_session::Column::UserId.eq(user.id))
        .filter(ai_chat_session::Column::IsActive.eq(true))
        .order_by_desc(ai_chat_session::Column::LastActivityAt);

    let (sessions, pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;

    Ok(ApiResponse::paginated(sessions, pagination))
}

async fn create_session(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<(StatusCode, ApiResponse<SessionCreated>)> {
    if let Some(concern_id) = req.related_concern_id {
        if Concern::find_by_id(concern_id).one(&state.db).await?.is_none() {
            return Err(AppError::invalid_field(
                "related_concern_id",
                "The selected related concern id is invalid",
            ));
        }
    }

    let session = new_session(
        &state,
        &user,
        req.context.unwrap_or_default(),
        req.related_concern_id,
    )
    .await?;

    Ok(ApiResponse::ok(SessionCreated {
        session_id: session.session_id,
        context: session.context,
        created_at: session.created_at,
    })
    .created())
}

async fn get_session(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<SessionDetail>> {
    let session = find_session(&state, user.id, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(ApiResponse::ok(SessionDetail {
        session_id: session.session_id,
        context: session.context,
        messages: session.messages,
        metadata: session.metadata,
        last_activity_at: session.last_activity_at,
        created_at: session.created_at,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<()>> {
    let session = AiChatSession::find()
        .filter(ai_chat_session::Column::SessionId.eq(&session_id))
        .filter(ai_chat_session::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let mut active = session.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    Ok(ApiResponse::message("Session deleted successfully"))
}
