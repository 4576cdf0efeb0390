//! Authentication middleware for protected API routes
//!
//! Requires a valid, unrevoked Bearer token belonging to an active user.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::models::prelude::*;
use crate::models::{revoked_token, user};
use crate::services::security::{decode_token, Claims};
use crate::state::AppState;

/// Authenticated user and the claims of the token used, stored in request extensions
#[derive(Clone)]
pub struct AuthenticatedUser(pub user::Model, pub Claims);

/// Auth middleware that validates Bearer tokens
///
/// Returns 401 Unauthorized if the token is missing, invalid, revoked, issued
/// before the user's last password change, or belongs to an inactive user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&req) {
        Some(t) => t,
        None => {
            return unauthorized_response("Unauthenticated.");
        }
    };

    let (user, claims) = match validate_token_and_get_user(&state, &token).await {
        Ok(found) => found,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    req.extensions_mut()
        .insert(AuthenticatedUser(user, claims));

    next.run(req).await
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Option<String> {
    let auth_header = req.headers().get(AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Validate JWT token, check revocation and fetch the user
async fn validate_token_and_get_user(
    state: &AppState,
    token: &str,
) -> Result<(user::Model, Claims), String> {
    let claims = decode_token(token).map_err(|_| "Invalid or expired token".to_string())?;

    let user_id = claims
        .user_id()
        .map_err(|_| "Invalid token subject".to_string())?;

    let revoked = RevokedToken::find()
        .filter(revoked_token::Column::Jti.eq(&claims.jti))
        .one(&state.db)
        .await
        .map_err(|e| format!("Database error: {}", e))?;
    if revoked.is_some() {
        return Err("Token has been revoked".to_string());
    }

    let found_user = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let found_user = found_user.ok_or_else(|| "User not found or inactive".to_string())?;
    if claims.ver != found_user.token_version {
        return Err("Token has been revoked".to_string());
    }

    Ok((found_user, claims))
}

/// Create a 401 Unauthorized JSON response
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "success": false,
            "message": message
        })),
    )
        .into_response()
}
