//! Maintenance mode gate
//!
//! While the `maintenance_mode` setting is on, only administrators reach the
//! protected API. Must run after [`require_auth`](super::require_auth).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::middleware::AuthenticatedUser;
use crate::services::settings;
use crate::state::AppState;

pub async fn maintenance_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let is_admin = req
        .extensions()
        .get::<AuthenticatedUser>()
        .is_some_and(|AuthenticatedUser(user, _)| user.is_admin());

    if !is_admin {
        match settings::get_bool(&state.db, settings::MAINTENANCE_MODE, false).await {
            Ok(true) => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "success": false,
                        "message": "The system is under maintenance. Please try again later."
                    })),
                )
                    .into_response();
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Could not read maintenance mode: {}", e);
            }
        }
    }

    next.run(req).await
}
