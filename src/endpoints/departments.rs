use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::is_unique_violation;
use crate::endpoints::concerns::visible_to;
use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, AdminOrDepartmentHead, Authenticated, Authorized};
use crate::models::audit_log::ModelType;
use crate::models::enums::{ConcernStatus, DepartmentType, Role};
use crate::models::prelude::*;
use crate::models::{concern, department, user};
use crate::schemas::{ApiResponse, ConcernResponse, PageParams, UserResponse};
use crate::services::analytics::{self, StatusCounts};
use crate::state::AppState;

/// Create departments routes
pub fn departments_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/{id}/stats", get(department_stats))
        .route("/{id}/concerns", get(department_concerns))
        .route("/{id}/users", get(department_users))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentListQuery {
    #[serde(rename = "type")]
    pub department_type: Option<DepartmentType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentConcernsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<ConcernStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentUsersQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "The code must be between 1 and 20 characters"))]
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub department_type: DepartmentType,
    pub is_active: Option<bool>,
    pub contact_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDepartmentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "The code must be between 1 and 20 characters"))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub department_type: Option<DepartmentType>,
    pub is_active: Option<bool>,
    pub contact_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentWithCounts {
    #[serde(flatten)]
    pub department: department::Model,
    pub users_count: u64,
    pub concerns_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentStatsResponse {
    pub department_id: i64,
    pub users_count: u64,
    pub concerns: StatusCounts,
    pub active_concerns: i64,
}

// ============================================================================
// Helpers
// ============================================================================

async fn find_department(state: &AppState, id: i64) -> Result<department::Model> {
    Department::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))
}

async fn ensure_code_free(state: &AppState, code: &str, except: Option<i64>) -> Result<()> {
    let mut query = Department::find().filter(department::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(department::Column::Id.ne(id));
    }
    if query.one(&state.db).await?.is_some() {
        return Err(AppError::invalid_field("code", "The code has already been taken"));
    }
    Ok(())
}

/// Department heads only look into their own department
fn ensure_department_scope(viewer: &user::Model, department_id: i64) -> Result<()> {
    if viewer.role == Role::DepartmentHead && viewer.department_id != Some(department_id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

fn duplicate_code(e: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("A department with this code already exists".to_string())
    } else {
        e.into()
    }
}

async fn with_counts(
    state: &AppState,
    department: department::Model,
) -> Result<DepartmentWithCounts> {
    let users_count = department.find_related(User).count(&state.db).await?;
    let concerns_count = department.find_related(Concern).count(&state.db).await?;
    Ok(DepartmentWithCounts {
        department,
        users_count,
        concerns_count,
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_departments(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<DepartmentListQuery>,
) -> Result<ApiResponse<Vec<department::Model>>> {
    let mut select = Department::find();

    // Only admins see deactivated departments unless they ask for them
    match query.is_active {
        Some(is_active) if user.is_admin() => {
            select = select.filter(department::Column::IsActive.eq(is_active));
        }
        None if user.is_admin() => {}
        _ => select = select.filter(department::Column::IsActive.eq(true)),
    }
    if let Some(department_type) = query.department_type {
        select = select.filter(department::Column::DepartmentType.eq(department_type));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(department::Column::Name.contains(search))
                .add(department::Column::Code.contains(search)),
        );
    }

    let departments = select
        .order_by_asc(department::Column::Name)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(departments))
}

async fn create_department(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    ValidatedJson(req): ValidatedJson<CreateDepartmentRequest>,
) -> Result<(StatusCode, ApiResponse<department::Model>)> {
    let code = req.code.trim().to_uppercase();
    ensure_code_free(&state, &code, None).await?;

    let now = Utc::now();
    let created = department::ActiveModel {
        name: Set(req.name.trim().to_string()),
        code: Set(code),
        description: Set(req.description),
        department_type: Set(req.department_type),
        is_active: Set(req.is_active.unwrap_or(true)),
        contact_info: Set(req.contact_info),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(duplicate_code)?;

    tracing::info!("Department {} ({}) created", created.id, created.code);

    state
        .audit
        .log_create(
            authorized.user_id(),
            ModelType::Department,
            created.id,
            serde_json::to_value(&created)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(created)
        .with_message("Department created successfully")
        .created())
}

async fn get_department(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<DepartmentWithCounts>> {
    let department = find_department(&state, id).await?;
    Ok(ApiResponse::ok(with_counts(&state, department).await?))
}

async fn update_department(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDepartmentRequest>,
) -> Result<ApiResponse<department::Model>> {
    let existing = find_department(&state, id).await?;
    let old_values = serde_json::to_value(&existing)?;

    let mut active = existing.into_active_model();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(code) = req.code {
        let code = code.trim().to_uppercase();
        ensure_code_free(&state, &code, Some(id)).await?;
        active.code = Set(code);
    }
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    if let Some(department_type) = req.department_type {
        active.department_type = Set(department_type);
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(contact_info) = req.contact_info {
        active.contact_info = Set(Some(contact_info));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(duplicate_code)?;

    state
        .audit
        .log_update(
            authorized.user_id(),
            ModelType::Department,
            updated.id,
            old_values,
            serde_json::to_value(&updated)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(updated).with_message("Department updated successfully"))
}

async fn delete_department(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let existing = find_department(&state, id).await?;

    if existing.find_related(Concern).count(&state.db).await? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a department that still has concerns".to_string(),
        ));
    }

    let old_values = serde_json::to_value(&existing)?;
    existing.delete(&state.db).await?;

    tracing::info!("Department {} deleted", id);

    state
        .audit
        .log_delete(
            authorized.user_id(),
            ModelType::Department,
            id,
            old_values,
            &origin,
        )
        .await;

    Ok(ApiResponse::message("Department deleted successfully"))
}

async fn department_stats(
    State(state): State<AppState>,
    authorized: Authorized<AdminOrDepartmentHead>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<DepartmentStatsResponse>> {
    ensure_department_scope(authorized.user(), id)?;
    let department = find_department(&state, id).await?;

    let users_count = department.find_related(User).count(&state.db).await?;
    let concerns = analytics::concern_status_counts(
        &state.db,
        Condition::all().add(concern::Column::DepartmentId.eq(id)),
    )
    .await?;

    Ok(ApiResponse::ok(DepartmentStatsResponse {
        department_id: department.id,
        users_count,
        active_concerns: concerns.active(),
        concerns,
    }))
}

async fn department_concerns(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
    Query(query): Query<DepartmentConcernsQuery>,
) -> Result<ApiResponse<Vec<ConcernResponse>>> {
    find_department(&state, id).await?;

    let mut select = visible_to(
        Concern::find().filter(concern::Column::DepartmentId.eq(id)),
        &user,
    );
    if let Some(status) = query.status {
        select = select.filter(concern::Column::Status.eq(status));
    }
    let select = select
        .order_by_desc(concern::Column::CreatedAt)
        .order_by_desc(concern::Column::Id);

    let (concerns, pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;

    let data = ConcernResponse::load_many(&state.db, concerns).await?;
    Ok(ApiResponse::paginated(data, pagination))
}

async fn department_users(
    State(state): State<AppState>,
    authorized: Authorized<AdminOrDepartmentHead>,
    Path(id): Path<i64>,
    Query(query): Query<DepartmentUsersQuery>,
) -> Result<ApiResponse<Vec<UserResponse>>> {
    ensure_department_scope(authorized.user(), id)?;
    find_department(&state, id).await?;

    let mut select = User::find().filter(user::Column::DepartmentId.eq(id));
    if let Some(role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    let select = select.order_by_asc(user::Column::Name);

    let (users, pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;

    let data = UserResponse::load_many(&state.db, users).await?;
    Ok(ApiResponse::paginated(data, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role, department_id: Option<i64>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 1,
            student_id: None,
            employee_id: Some("EMP-001".to_string()),
            name: "Member".to_string(),
            email: "member@bestlink.edu.ph".to_string(),
            password: String::new(),
            role,
            department_id,
            phone: None,
            avatar: None,
            preferences: None,
            is_active: true,
            token_version: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_department_head_scope() {
        assert!(ensure_department_scope(&member(Role::DepartmentHead, Some(2)), 2).is_ok());
        assert!(ensure_department_scope(&member(Role::DepartmentHead, Some(2)), 3).is_err());
        assert!(ensure_department_scope(&member(Role::DepartmentHead, None), 3).is_err());
        assert!(ensure_department_scope(&member(Role::Admin, None), 3).is_ok());
    }
}
