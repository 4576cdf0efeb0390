use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::CONFIG;
use crate::endpoints::extractors::ValidatedJson;
use crate::error::{AppError, Result};
use crate::middleware::Authenticated;
use crate::models::enums::{DeviceType, Priority};
use crate::models::prelude::*;
use crate::models::{fcm_token, notification};
use crate::schemas::{ApiResponse, PageParams};
use crate::services::notification::PushMessage;
use crate::state::AppState;

/// Create notifications routes
pub fn notifications_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/mark-read", post(mark_read))
        .route("/mark-all-read", post(mark_all_read))
        .route("/fcm-token", post(store_fcm_token).delete(remove_fcm_token))
        .route("/fcm-tokens", get(list_fcm_tokens))
        .route("/test-push", post(test_push))
        .route("/{id}", delete(delete_notification))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub unread_only: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadRequest {
    #[validate(length(min = 1, message = "The notification ids field is required"))]
    pub notification_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StoreFcmTokenRequest {
    #[validate(length(min = 1, max = 500, message = "The token field is required"))]
    pub token: String,
    pub device_type: DeviceType,
    #[validate(length(max = 255))]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveFcmTokenRequest {
    #[validate(length(min = 1, message = "The token field is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TestPushRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "The title may not be greater than 100 characters"
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 200,
        message = "The body may not be greater than 200 characters"
    ))]
    pub body: String,
}

/// Device token as shown to its owner; the token itself is never echoed
#[derive(Debug, Serialize)]
pub struct FcmTokenInfo {
    pub device_type: DeviceType,
    pub device_id: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<fcm_token::Model> for FcmTokenInfo {
    fn from(token: fcm_token::Model) -> Self {
        Self {
            device_type: token.device_type,
            device_id: token.device_id,
            last_used_at: token.last_used_at,
            created_at: token.created_at,
        }
    }
}

// ============================================================================
// Inbox
// ============================================================================

async fn unread_count(state: &AppState, user_id: i64) -> Result<u64> {
    Ok(Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::ReadAt.is_null())
        .count(&state.db)
        .await?)
}

async fn list_notifications(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<NotificationListQuery>,
) -> Result<ApiResponse<Vec<notification::Model>>> {
    let mut select = Notification::find().filter(notification::Column::UserId.eq(user.id));

    if query.unread_only.unwrap_or(false) {
        select = select.filter(notification::Column::ReadAt.is_null());
    }
    if let Some(notification_type) = query.notification_type.filter(|t| !t.is_empty()) {
        select = select.filter(notification::Column::NotificationType.eq(notification_type));
    }
    if let Some(priority) = query.priority {
        select = select.filter(notification::Column::Priority.eq(priority));
    }
    let select = select
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id);

    let (notifications, mut pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;
    pagination.unread_count = Some(unread_count(&state, user.id).await?);

    Ok(ApiResponse::paginated(notifications, pagination))
}

async fn mark_read(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<MarkReadRequest>,
) -> Result<ApiResponse<()>> {
    let result = Notification::update_many()
        .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
        .filter(notification::Column::UserId.eq(user.id))
        .filter(notification::Column::Id.is_in(req.notification_ids))
        .filter(notification::Column::ReadAt.is_null())
        .exec(&state.db)
        .await?;

    Ok(ApiResponse::message("Notifications marked as read")
        .with_extra("updated_count", result.rows_affected))
}

async fn mark_all_read(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
) -> Result<ApiResponse<()>> {
    let result = Notification::update_many()
        .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
        .filter(notification::Column::UserId.eq(user.id))
        .filter(notification::Column::ReadAt.is_null())
        .exec(&state.db)
        .await?;

    Ok(ApiResponse::message("All notifications marked as read")
        .with_extra("updated_count", result.rows_affected))
}

async fn delete_notification(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    // Someone else's notification is indistinguishable from a missing one
    let found = Notification::find_by_id(id)
        .filter(notification::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    found.delete(&state.db).await?;

    Ok(ApiResponse::message("Notification deleted successfully"))
}

// ============================================================================
// Device tokens
// ============================================================================

async fn store_fcm_token(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<StoreFcmTokenRequest>,
) -> Result<ApiResponse<()>> {
    let now = Utc::now();
    let existing = FcmToken::find()
        .filter(fcm_token::Column::UserId.eq(user.id))
        .filter(fcm_token::Column::Token.eq(&req.token))
        .one(&state.db)
        .await?;

    match existing {
        Some(token) => {
            let mut active = token.into_active_model();
            active.device_type = Set(req.device_type);
            active.device_id = Set(req.device_id);
            active.is_active = Set(true);
            active.last_used_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(&state.db).await?;
        }
        None => {
            fcm_token::ActiveModel {
                user_id: Set(user.id),
                token: Set(req.token),
                device_type: Set(req.device_type),
                device_id: Set(req.device_id),
                is_active: Set(true),
                last_used_at: Set(Some(now)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
        }
    }

    tracing::debug!("Stored FCM token for user {}", user.id);
    Ok(ApiResponse::message("FCM token stored successfully"))
}

async fn remove_fcm_token(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<RemoveFcmTokenRequest>,
) -> Result<ApiResponse<()>> {
    FcmToken::update_many()
        .col_expr(fcm_token::Column::IsActive, Expr::value(false))
        .col_expr(fcm_token::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(fcm_token::Column::UserId.eq(user.id))
        .filter(fcm_token::Column::Token.eq(req.token))
        .exec(&state.db)
        .await?;

    Ok(ApiResponse::message("FCM token removed successfully"))
}

async fn list_fcm_tokens(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
) -> Result<ApiResponse<Vec<FcmTokenInfo>>> {
    let tokens: Vec<FcmTokenInfo> = FcmToken::find()
        .filter(fcm_token::Column::UserId.eq(user.id))
        .filter(fcm_token::Column::IsActive.eq(true))
        .order_by_desc(fcm_token::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .map(FcmTokenInfo::from)
        .collect();

    let total = tokens.len();
    Ok(ApiResponse::ok(tokens).with_extra("total_tokens", total))
}

async fn test_push(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<TestPushRequest>,
) -> Result<ApiResponse<()>> {
    if !CONFIG.is_local() {
        return Err(AppError::Forbidden(
            "This endpoint is only available in development".to_string(),
        ));
    }

    let mut data = HashMap::new();
    data.insert("test".to_string(), "true".to_string());
    data.insert("timestamp".to_string(), Utc::now().to_rfc3339());

    let message = PushMessage {
        title: req.title,
        body: req.body,
        data,
    };

    let delivered = state.notification.push_to_user(user.id, &message).await?;

    let mut response = if delivered > 0 {
        ApiResponse::message("Test notification sent")
    } else {
        ApiResponse::message("Failed to send test notification")
    };
    response.success = delivered > 0;
    Ok(response)
}
