use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::config::CONFIG;
use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, Authorized};
use crate::models::audit_log::{self, AuditAction};
use crate::schemas::{ApiResponse, Pagination};
use crate::services::audit::{get_audit_logs, AuditLogQuery};
use crate::services::{settings, AuditEntry};
use crate::state::AppState;

const SERVICE_NAME: &str = "StudentLink Backend API";

/// Public liveness routes
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/detailed", get(detailed_health))
        .with_state(state)
}

/// Administrator-only system routes
pub fn system_routes(state: AppState) -> Router {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/audit-logs", get(list_audit_logs))
        .route("/system-info", get(system_info))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub version: String,
    pub environment: String,
    pub database: &'static str,
    pub cache: &'static str,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, message = "The settings field is required"))]
    pub settings: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub version: String,
    pub environment: String,
    pub database_backend: String,
    pub ai_configured: bool,
    pub push_configured: bool,
    pub rust_version: &'static str,
}

// ============================================================================
// Health
// ============================================================================

fn health_now() -> HealthResponse {
    HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        service: SERVICE_NAME,
    }
}

async fn health() -> Json<HealthResponse> {
    Json(health_now())
}

async fn detailed_health(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let database = match state.db.execute_unprepared("SELECT 1").await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            "disconnected"
        }
    };

    let mut health = health_now();
    if database != "connected" {
        health.status = "degraded";
    }

    Json(DetailedHealthResponse {
        health,
        version: CONFIG.version.clone(),
        environment: CONFIG.app_env.clone(),
        database,
        cache: "in_process",
    })
}

// ============================================================================
// Settings
// ============================================================================

async fn settings_map(state: &AppState) -> Result<BTreeMap<String, serde_json::Value>> {
    Ok(settings::list(&state.db)
        .await?
        .into_iter()
        .map(|s| {
            let value = s.typed_value();
            (s.key, value)
        })
        .collect())
}

async fn get_settings(
    State(state): State<AppState>,
    _authorized: Authorized<AdminOnly>,
) -> Result<ApiResponse<BTreeMap<String, serde_json::Value>>> {
    Ok(ApiResponse::ok(settings_map(&state).await?))
}

async fn update_settings(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    ValidatedJson(req): ValidatedJson<UpdateSettingsRequest>,
) -> Result<ApiResponse<BTreeMap<String, serde_json::Value>>> {
    let before = settings_map(&state).await?;

    let txn = state.db.begin().await?;
    for (key, value) in &req.settings {
        settings::update(&txn, key, value)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::invalid_field(key, "Unknown setting"),
                AppError::BadRequest(msg) => AppError::invalid_field(key, msg),
                other => other,
            })?;
    }
    txn.commit().await?;

    let after = settings_map(&state).await?;
    let old_values: serde_json::Map<String, serde_json::Value> = req
        .settings
        .keys()
        .filter_map(|k| before.get(k).map(|v| (k.clone(), v.clone())))
        .collect();
    let new_values: serde_json::Map<String, serde_json::Value> = req
        .settings
        .keys()
        .filter_map(|k| after.get(k).map(|v| (k.clone(), v.clone())))
        .collect();

    tracing::info!(
        "User {} updated settings: {:?}",
        authorized.user_id(),
        req.settings.keys().collect::<Vec<_>>()
    );

    state
        .audit
        .log(
            AuditEntry::new(Some(authorized.user_id()), AuditAction::SettingsUpdated)
                .old_values(serde_json::Value::Object(old_values))
                .new_values(serde_json::Value::Object(new_values))
                .metadata(json!({ "keys": req.settings.keys().collect::<Vec<_>>() }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::ok(after).with_message("Settings updated successfully"))
}

// ============================================================================
// Audit log and system info
// ============================================================================

async fn list_audit_logs(
    State(state): State<AppState>,
    _authorized: Authorized<AdminOnly>,
    Query(query): Query<AuditLogQuery>,
) -> Result<ApiResponse<Vec<audit_log::Model>>> {
    let page = get_audit_logs(&state.db, query).await?;
    let pagination = Pagination::new(page.page, page.per_page, page.total);
    Ok(ApiResponse::paginated(page.logs, pagination))
}

async fn system_info(
    State(state): State<AppState>,
    _authorized: Authorized<AdminOnly>,
) -> Result<ApiResponse<SystemInfo>> {
    Ok(ApiResponse::ok(SystemInfo {
        version: CONFIG.version.clone(),
        environment: CONFIG.app_env.clone(),
        database_backend: format!("{:?}", state.db.get_database_backend()),
        ai_configured: state.openai.is_configured(),
        push_configured: state.notification.push_configured(),
        rust_version: "1.83",
    }))
}
