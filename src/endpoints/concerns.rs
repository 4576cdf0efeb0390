use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{Authenticated, Authorized, StaffOnly};
use crate::models::audit_log::{AuditAction, ModelType};
use crate::models::enums::{ConcernStatus, ConcernType, MessageType, Priority, Role};
use crate::models::prelude::*;
use crate::models::{concern, concern_message, department, facility, user};
use crate::schemas::{ApiResponse, ConcernResponse, MessageResponse, PageParams};
use crate::services::{sequence, AuditEntry};
use crate::state::AppState;

/// Create concern routes
pub fn concerns_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_concerns).post(create_concern))
        .route(
            "/{id}",
            get(get_concern).put(update_concern).delete(delete_concern),
        )
        .route("/{id}/messages", get(list_messages).post(add_message))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/assign", post(assign_concern))
        .route("/{id}/history", get(get_history))
        .route("/{id}/attachments", post(upload_attachment))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ConcernListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<ConcernStatus>,
    pub department_id: Option<i64>,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub concern_type: Option<ConcernType>,
    pub assigned_to: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConcernRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The subject must be between 1 and 255 characters"
    ))]
    pub subject: String,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "The description must be between 1 and 5000 characters"
    ))]
    pub description: String,
    #[serde(rename = "type")]
    pub concern_type: ConcernType,
    #[serde(default)]
    pub priority: Priority,
    pub department_id: i64,
    pub facility_id: Option<i64>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateConcernRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "The subject must be between 1 and 255 characters"
    ))]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 5000,
        message = "The description must be between 1 and 5000 characters"
    ))]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub concern_type: Option<ConcernType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMessageRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "The message must be between 1 and 2000 characters"
    ))]
    pub message: String,
    pub attachments: Option<Vec<String>>,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: ConcernStatus,
    #[validate(length(max = 500, message = "The note may not be greater than 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    pub assigned_to: i64,
}

#[derive(Debug, Serialize)]
pub struct ConcernDetail {
    #[serde(flatten)]
    pub concern: ConcernResponse,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize)]
pub struct HistoryAuthor {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: MessageType,
    pub message: String,
    pub author: Option<HistoryAuthor>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Visibility
// ============================================================================

/// Restrict a concern query to what `user` may see
pub(crate) fn visible_to(query: Select<Concern>, user: &user::Model) -> Select<Concern> {
    match user.role {
        Role::Student => query.filter(concern::Column::StudentId.eq(user.id)),
        Role::DepartmentHead => query.filter(concern::Column::DepartmentId.eq(user.department_id)),
        Role::Faculty | Role::Staff | Role::Admin => query,
    }
}

pub(crate) fn can_see(user: &user::Model, concern: &concern::Model) -> bool {
    match user.role {
        Role::Student => concern.student_id == user.id,
        Role::DepartmentHead => user.department_id == Some(concern.department_id),
        Role::Faculty | Role::Staff | Role::Admin => true,
    }
}

async fn find_concern(state: &AppState, id: i64) -> Result<Option<concern::Model>> {
    Ok(Concern::find_by_id(id).one(&state.db).await?)
}

/// Load a concern the user may see; anything else is reported as missing
async fn find_visible(state: &AppState, id: i64, user: &user::Model) -> Result<concern::Model> {
    find_concern(state, id)
        .await?
        .filter(|c| can_see(user, c))
        .ok_or_else(|| AppError::NotFound("Concern not found".to_string()))
}

async fn ensure_department(state: &AppState, id: i64) -> Result<department::Model> {
    Department::find_by_id(id)
        .filter(department::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::invalid_field("department_id", "The selected department is invalid")
        })
}

async fn ensure_facility(state: &AppState, id: i64) -> Result<facility::Model> {
    Facility::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::invalid_field("facility_id", "The selected facility is invalid"))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_concerns(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<ConcernListQuery>,
) -> Result<ApiResponse<Vec<ConcernResponse>>> {
    let mut select = visible_to(Concern::find(), &user);

    if let Some(status) = query.status {
        select = select.filter(concern::Column::Status.eq(status));
    }
    if let Some(department_id) = query.department_id {
        select = select.filter(concern::Column::DepartmentId.eq(department_id));
    }
    if let Some(priority) = query.priority {
        select = select.filter(concern::Column::Priority.eq(priority));
    }
    if let Some(concern_type) = query.concern_type {
        select = select.filter(concern::Column::ConcernType.eq(concern_type));
    }
    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(concern::Column::AssignedTo.eq(assigned_to));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(concern::Column::Subject.contains(search))
                .add(concern::Column::Description.contains(search))
                .add(concern::Column::ReferenceNumber.contains(search)),
        );
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

async fn create_concern(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<CreateConcernRequest>,
) -> Result<(axum::http::StatusCode, ApiResponse<ConcernResponse>)> {
    ensure_department(&state, req.department_id).await?;
    if let Some(facility_id) = req.facility_id {
        ensure_facility(&state, facility_id).await?;
    }

    let now = Utc::now();
    let txn = state.db.begin().await?;

    let reference_number = sequence::next_reference_number(&txn).await?;
    let created = concern::ActiveModel {
        reference_number: Set(reference_number),
        subject: Set(req.subject.trim().to_string()),
        description: Set(req.description),
        concern_type: Set(req.concern_type),
        priority: Set(req.priority),
        status: Set(ConcernStatus::Pending),
        is_anonymous: Set(req.is_anonymous),
        student_id: Set(user.id),
        department_id: Set(req.department_id),
        facility_id: Set(req.facility_id),
        assigned_to: Set(None),
        attachments: Set(req.attachments.map(|a| json!(a))),
        metadata: Set(None),
        due_date: Set(None),
        resolved_at: Set(None),
        closed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Concern {} submitted by user {}",
        created.reference_number,
        user.id
    );

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::Create)
                .subject(ModelType::Concern, created.id)
                .new_values(serde_json::to_value(&created)?)
                .metadata(json!({
                    "subject": created.subject,
                    "type": created.concern_type,
                    "priority": created.priority,
                }))
                .origin(&origin),
        )
        .await;

    let data = ConcernResponse::load(&state.db, created).await?;
    Ok(ApiResponse::ok(data)
        .with_message("Concern submitted successfully")
        .created())
}

async fn get_concern(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<ConcernDetail>> {
    let found = find_visible(&state, id, &user).await?;

    let mut messages = found.find_related(ConcernMessage);
    if user.role.is_student() {
        messages = messages.filter(concern_message::Column::IsInternal.eq(false));
    }
    let messages = messages
        .order_by_asc(concern_message::Column::CreatedAt)
        .order_by_asc(concern_message::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(ConcernDetail {
        concern: ConcernResponse::load(&state.db, found).await?,
        messages: MessageResponse::load_many(&state.db, messages).await?,
    }))
}

async fn update_concern(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateConcernRequest>,
) -> Result<ApiResponse<ConcernResponse>> {
    let found = find_visible(&state, id, &user).await?;

    if user.role.is_student() && found.status != ConcernStatus::Pending {
        return Err(AppError::Forbidden(
            "Only pending concerns can be edited".to_string(),
        ));
    }

    if let Some(department_id) = req.department_id {
        ensure_department(&state, department_id).await?;
    }
    if let Some(facility_id) = req.facility_id {
        ensure_facility(&state, facility_id).await?;
    }

    let changes: Vec<String> = match serde_json::to_value(&req)? {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    let old_values = serde_json::to_value(&found)?;

    let mut active = found.into_active_model();
    if let Some(subject) = req.subject {
        active.subject = Set(subject.trim().to_string());
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    if let Some(concern_type) = req.concern_type {
        active.concern_type = Set(concern_type);
    }
    if let Some(priority) = req.priority {
        active.priority = Set(priority);
    }
    if let Some(department_id) = req.department_id {
        active.department_id = Set(department_id);
    }
    if let Some(facility_id) = req.facility_id {
        active.facility_id = Set(Some(facility_id));
    }
    if let Some(is_anonymous) = req.is_anonymous {
        active.is_anonymous = Set(is_anonymous);
    }
    if let Some(due_date) = req.due_date {
        active.due_date = Set(Some(due_date));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::Update)
                .subject(ModelType::Concern, updated.id)
                .old_values(old_values)
                .new_values(serde_json::to_value(&updated)?)
                .metadata(json!({ "subject": updated.subject, "changes": changes }))
                .origin(&origin),
        )
        .await;

    let data = ConcernResponse::load(&state.db, updated).await?;
    Ok(ApiResponse::ok(data).with_message("Concern updated successfully"))
}

async fn delete_concern(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let found = find_concern(&state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Concern not found".to_string()))?;

    let allowed = match user.role {
        Role::Student => found.student_id == user.id && found.status == ConcernStatus::Pending,
        Role::DepartmentHead => can_see(&user, &found),
        Role::Admin => true,
        Role::Faculty | Role::Staff => false,
    };
    if !allowed {
        return Err(AppError::Forbidden("Cannot delete this concern".to_string()));
    }

    let old_values = serde_json::to_value(&found)?;
    let reference_number = found.reference_number.clone();
    let subject = found.subject.clone();
    found.delete(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::Delete)
                .subject(ModelType::Concern, id)
                .old_values(old_values)
                .metadata(json!({ "subject": subject, "reference_number": reference_number }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::message("Concern deleted successfully"))
}

async fn add_message(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AddMessageRequest>,
) -> Result<(axum::http::StatusCode, ApiResponse<MessageResponse>)> {
    let found = find_concern(&state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Concern not found".to_string()))?;
    if !can_see(&user, &found) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    if req.is_internal && user.role.is_student() {
        return Err(AppError::Forbidden(
            "Students cannot post internal messages".to_string(),
        ));
    }

    let now = Utc::now();
    let has_attachments = req.attachments.as_ref().is_some_and(|a| !a.is_empty());
    let message_length = req.message.len();

    let created = concern_message::ActiveModel {
        concern_id: Set(found.id),
        author_id: Set(user.id),
        message: Set(req.message),
        message_type: Set(MessageType::Message),
        attachments: Set(req.attachments.map(|a| json!(a))),
        metadata: Set(None),
        is_internal: Set(req.is_internal),
        is_ai_generated: Set(false),
        read_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let mut touched = found.clone().into_active_model();
    touched.updated_at = Set(now);
    touched.update(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::ConcernMessage)
                .subject(ModelType::Concern, found.id)
                .metadata(json!({
                    "message_length": message_length,
                    "has_attachments": has_attachments,
                }))
                .origin(&origin),
        )
        .await;

    if !created.is_internal {
        state.notification.concern_message_posted(&found, &user).await;
    }

    let mut data = MessageResponse::load_many(&state.db, vec![created]).await?;
    Ok(ApiResponse::ok(data.remove(0))
        .with_message("Message added successfully")
        .created())
}

async fn list_messages(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Vec<MessageResponse>>> {
    let found = find_concern(&state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Concern not found".to_string()))?;
    if !can_see(&user, &found) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let mut query = found.find_related(ConcernMessage);
    if user.role.is_student() {
        query = query.filter(concern_message::Column::IsInternal.eq(false));
    }
    let messages = query
        .order_by_asc(concern_message::Column::CreatedAt)
        .order_by_asc(concern_message::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        MessageResponse::load_many(&state.db, messages).await?,
    ))
}

/// Timestamps stamped by a status change: `(resolved_at, closed_at)`
pub(crate) fn status_timestamps(
    status: ConcernStatus,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match status {
        ConcernStatus::Resolved => (Some(now), None),
        ConcernStatus::Closed => (None, Some(now)),
        ConcernStatus::Pending | ConcernStatus::InProgress | ConcernStatus::Cancelled => {
            (None, None)
        }
    }
}

async fn update_status(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> Result<ApiResponse<ConcernResponse>> {
    let found = find_visible(&state, id, &user).await?;

    if user.role.is_student() && req.status != ConcernStatus::Cancelled {
        return Err(AppError::Forbidden(
            "Students can only cancel their own concerns".to_string(),
        ));
    }

    let old_status = found.status;
    let new_status = req.status;
    let note = req.note.filter(|n| !n.trim().is_empty());
    let now = Utc::now();
    let (resolved_at, closed_at) = status_timestamps(new_status, now);

    let txn = state.db.begin().await?;

    let mut active = found.into_active_model();
    active.status = Set(new_status);
    active.resolved_at = Set(resolved_at);
    active.closed_at = Set(closed_at);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    if let Some(note) = &note {
        concern_message::ActiveModel {
            concern_id: Set(updated.id),
            author_id: Set(user.id),
            message: Set(note.clone()),
            message_type: Set(MessageType::StatusChange),
            attachments: Set(None),
            metadata: Set(Some(json!({
                "old_status": old_status,
                "new_status": new_status,
            }))),
            is_internal: Set(false),
            is_ai_generated: Set(false),
            read_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        "Concern {} moved from {} to {} by user {}",
        updated.reference_number,
        old_status,
        new_status,
        user.id
    );

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::StatusChange)
                .subject(ModelType::Concern, updated.id)
                .metadata(json!({
                    "old_status": old_status,
                    "new_status": new_status,
                    "has_note": note.is_some(),
                }))
                .origin(&origin),
        )
        .await;

    if updated.student_id != user.id && old_status != new_status {
        state
            .notification
            .concern_status_changed(&updated, old_status, new_status)
            .await;
    }

    let data = ConcernResponse::load(&state.db, updated).await?;
    Ok(ApiResponse::ok(data).with_message("Status updated successfully"))
}

async fn assign_concern(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<StaffOnly>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AssignRequest>,
) -> Result<ApiResponse<ConcernResponse>> {
    let user = authorized.user();
    let found = find_visible(&state, id, user).await?;

    let assignee = User::find_by_id(req.assigned_to)
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::Role.ne(Role::Student))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::invalid_field("assigned_to", "The selected assignee is invalid")
        })?;

    let old_assignee = found.assigned_to;
    let now = Utc::now();

    let txn = state.db.begin().await?;

    let mut active = found.into_active_model();
    active.assigned_to = Set(Some(assignee.id));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    concern_message::ActiveModel {
        concern_id: Set(updated.id),
        author_id: Set(user.id),
        message: Set(format!("Concern assigned to {}", assignee.name)),
        message_type: Set(MessageType::Assignment),
        attachments: Set(None),
        metadata: Set(Some(json!({
            "old_assignee": old_assignee,
            "new_assignee": assignee.id,
        }))),
        is_internal: Set(false),
        is_ai_generated: Set(false),
        read_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::Assign)
                .subject(ModelType::Concern, updated.id)
                .metadata(json!({
                    "old_assignee": old_assignee,
                    "new_assignee": assignee.id,
                }))
                .origin(&origin),
        )
        .await;

    state.notification.concern_assigned(&updated, &assignee).await;

    let data = ConcernResponse::load(&state.db, updated).await?;
    Ok(ApiResponse::ok(data).with_message("Concern assigned successfully"))
}

async fn get_history(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Vec<HistoryEntry>>> {
    let found = find_visible(&state, id, &user).await?;

    let mut query = found.find_related(ConcernMessage);
    if user.role.is_student() {
        query = query.filter(concern_message::Column::IsInternal.eq(false));
    }
    let messages = query
        .order_by_desc(concern_message::Column::CreatedAt)
        .order_by_desc(concern_message::Column::Id)
        .all(&state.db)
        .await?;

    let history = MessageResponse::load_many(&state.db, messages)
        .await?
        .into_iter()
        .map(|m| HistoryEntry {
            id: m.message.id,
            entry_type: m.message.message_type,
            message: m.message.message,
            author: m.author.map(|a| HistoryAuthor {
                id: a.id,
                name: a.name,
                role: a.role,
            }),
            metadata: m.message.metadata,
            created_at: m.message.created_at,
        })
        .collect();

    Ok(ApiResponse::ok(history))
}

async fn upload_attachment(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    find_visible(&state, id, &user).await?;
    Err(AppError::NotImplemented(
        "File upload functionality not yet implemented".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: Role, id: i64, department_id: Option<i64>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id,
            student_id: None,
            employee_id: None,
            name: "Test".to_string(),
            email: format!("user{}@test.local", id),
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

    fn concern_owned_by(student_id: i64, department_id: i64) -> concern::Model {
        let now = Utc::now();
        concern::Model {
            id: 1,
            reference_number: "CNR2025060001".to_string(),
            subject: "Wifi down".to_string(),
            description: "No signal in the library".to_string(),
            concern_type: ConcernType::Technical,
            priority: Priority::High,
            status: ConcernStatus::Pending,
            is_anonymous: false,
            student_id,
            department_id,
            facility_id: None,
            assigned_to: None,
            attachments: None,
            metadata: None,
            due_date: None,
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_visibility_by_role() {
        let concern = concern_owned_by(10, 2);

        assert!(can_see(&user_with(Role::Student, 10, Some(2)), &concern));
        assert!(!can_see(&user_with(Role::Student, 11, Some(2)), &concern));
        assert!(can_see(&user_with(Role::DepartmentHead, 20, Some(2)), &concern));
        assert!(!can_see(&user_with(Role::DepartmentHead, 21, Some(3)), &concern));
        assert!(!can_see(&user_with(Role::DepartmentHead, 22, None), &concern));
        assert!(can_see(&user_with(Role::Faculty, 30, None), &concern));
        assert!(can_see(&user_with(Role::Admin, 1, None), &concern));
    }

    #[test]
    fn test_status_timestamps() {
        let now = Utc::now();
        assert_eq!(status_timestamps(ConcernStatus::Resolved, now), (Some(now), None));
        assert_eq!(status_timestamps(ConcernStatus::Closed, now), (None, Some(now)));
        assert_eq!(status_timestamps(ConcernStatus::InProgress, now), (None, None));
        assert_eq!(status_timestamps(ConcernStatus::Cancelled, now), (None, None));
    }
}
