use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::config::CONFIG;
use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::Authenticated;
use crate::models::audit_log::AuditAction;
use crate::models::prelude::*;
use crate::models::{password_reset_token, revoked_token, user};
use crate::schemas::{ApiResponse, UserResponse};
use crate::services::security::Claims;
use crate::services::{
    create_access_token, generate_random_string, hash_password, hash_reset_token,
    verify_password, AuditEntry,
};
use crate::state::AppState;

/// Routes reachable without a token
pub fn public_auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .with_state(state)
}

/// Routes for the holder of a valid token
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl TokenResponse {
    fn new(token: String, user: Option<UserResponse>) -> Self {
        Self {
            token,
            token_type: "bearer",
            expires_in: CONFIG.auth.jwt_ttl_seconds,
            user,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "The token field is required"))]
    pub token: String,
    #[validate(
        length(min = 8, message = "The password must be at least 8 characters"),
        must_match(
            other = "password_confirmation",
            message = "The password confirmation does not match"
        )
    )]
    pub password: String,
    pub password_confirmation: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn login(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>> {
    let email = req.email.trim().to_lowercase();

    let found = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;

    let found = match found {
        Some(u) if verify_password(&req.password, &u.password) => u,
        other => {
            state
                .audit
                .log(
                    AuditEntry::new(other.map(|u| u.id), AuditAction::LoginFailed)
                        .metadata(json!({ "email": email }))
                        .origin(&origin),
                )
                .await;
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    if !found.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let mut active = found.into_active_model();
    active.last_login_at = Set(Some(Utc::now()));
    let logged_in = active.update(&state.db).await?;

    let token = create_access_token(&logged_in)?;

    state
        .audit
        .log(AuditEntry::new(Some(logged_in.id), AuditAction::Login).origin(&origin))
        .await;
    tracing::info!("User {} logged in", logged_in.id);

    let user = UserResponse::load(&state.db, logged_in).await?;
    Ok(ApiResponse::ok(TokenResponse::new(token, Some(user))).with_message("Login successful"))
}

async fn me(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
) -> Result<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(UserResponse::load(&state.db, user).await?))
}

async fn logout(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, claims): Authenticated,
) -> Result<ApiResponse<()>> {
    revoke(&state, &claims, user.id).await?;

    state
        .audit
        .log(AuditEntry::new(Some(user.id), AuditAction::Logout).origin(&origin))
        .await;

    Ok(ApiResponse::message("Successfully logged out"))
}

async fn refresh(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, claims): Authenticated,
) -> Result<ApiResponse<TokenResponse>> {
    revoke(&state, &claims, user.id).await?;
    let token = create_access_token(&user)?;

    state
        .audit
        .log(AuditEntry::new(Some(user.id), AuditAction::TokenRefresh).origin(&origin))
        .await;

    Ok(ApiResponse::ok(TokenResponse::new(token, None)).with_message("Token refreshed"))
}

/// Remember the token ID until the token would have expired anyway
async fn revoke(state: &AppState, claims: &Claims, user_id: i64) -> Result<()> {
    revoked_token::ActiveModel {
        jti: Set(claims.jti.clone()),
        user_id: Set(user_id),
        expires_at: Set(claims.expires_at()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    Ok(())
}

async fn forgot_password(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    let email = req.email.trim().to_lowercase();
    let message = "If the email exists, a password reset link has been sent";

    let found = User::find()
        .filter(user::Column::Email.eq(&email))
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await?;

    let Some(found) = found else {
        return Ok(ApiResponse::ok(json!({})).with_message(message));
    };

    PasswordResetToken::delete_many()
        .filter(password_reset_token::Column::Email.eq(&email))
        .exec(&state.db)
        .await?;

    let token = generate_random_string(32);
    let now = Utc::now();
    password_reset_token::ActiveModel {
        email: Set(email),
        token_hash: Set(hash_reset_token(&token)),
        expires_at: Set(now + Duration::minutes(CONFIG.auth.reset_token_ttl_minutes)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    state
        .audit
        .log(AuditEntry::new(Some(found.id), AuditAction::PasswordResetRequested).origin(&origin))
        .await;

    // No mail transport; the token is only handed out in local development
    let data = if CONFIG.is_local() {
        json!({ "reset_token": token })
    } else {
        json!({})
    };

    Ok(ApiResponse::ok(data).with_message(message))
}

async fn reset_password(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>> {
    let email = req.email.trim().to_lowercase();
    let invalid = || AppError::BadRequest("Invalid or expired reset token".to_string());

    let reset = PasswordResetToken::find()
        .filter(password_reset_token::Column::Email.eq(&email))
        .filter(password_reset_token::Column::TokenHash.eq(hash_reset_token(&req.token)))
        .filter(password_reset_token::Column::ExpiresAt.gt(Utc::now()))
        .one(&state.db)
        .await?;
    if reset.is_none() {
        return Err(invalid());
    }

    let found = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(invalid)?;

    let user_id = found.id;
    let token_version = found.token_version + 1;
    let mut active = found.into_active_model();
    active.password = Set(hash_password(&req.password)?);
    active.token_version = Set(token_version);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    PasswordResetToken::delete_many()
        .filter(password_reset_token::Column::Email.eq(&email))
        .exec(&state.db)
        .await?;

    state
        .audit
        .log(AuditEntry::new(Some(user_id), AuditAction::PasswordReset).origin(&origin))
        .await;

    Ok(ApiResponse::message("Password has been reset successfully"))
}
