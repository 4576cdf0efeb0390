pub mod ai;
pub mod analytics;
pub mod announcements;
pub mod auth;
pub mod concerns;
pub mod departments;
pub mod emergency;
pub mod extractors;
pub mod notifications;
pub mod system;
pub mod users;

use axum::{middleware as axum_middleware, Router};

use crate::middleware::{maintenance_guard, require_auth};
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .nest("/api/health", system::health_routes(state.clone()))
        .nest("/api/auth", auth::public_auth_routes(state.clone()));

    // Protected routes; auth runs first, then the maintenance gate
    let protected_routes = Router::new()
        .nest("/api", api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            maintenance_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}

/// API routes under /api/* (protected by auth middleware)
fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::auth_routes(state.clone()))
        .nest("/concerns", concerns::concerns_routes(state.clone()))
        .nest("/announcements", announcements::announcements_routes(state.clone()))
        .nest("/users", users::users_routes(state.clone()))
        .nest("/departments", departments::departments_routes(state.clone()))
        .nest("/emergency", emergency::emergency_routes(state.clone()))
        .nest("/notifications", notifications::notifications_routes(state.clone()))
        .nest("/ai", ai::ai_routes(state.clone()))
        .nest("/analytics", analytics::analytics_routes(state.clone()))
        .nest("/system", system::system_routes(state))
}
