use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, Authenticated, Authorized};
use crate::models::audit_log::ModelType;
use crate::models::enums::ContactStatus;
use crate::models::prelude::*;
use crate::models::{emergency_contact, emergency_protocol};
use crate::schemas::ApiResponse;
use crate::state::AppState;

/// Create emergency directory routes
pub fn emergency_routes(state: AppState) -> Router {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/{id}", put(update_contact).delete(delete_contact))
        .route("/protocols", get(list_protocols).post(create_protocol))
        .route("/protocols/{id}", put(update_protocol).delete(delete_protocol))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct EmergencyListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub contact_type: String,
    #[validate(length(min = 1, max = 30))]
    pub phone: String,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub operating_hours: Option<serde_json::Value>,
    pub status: Option<ContactStatus>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub contact_type: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub phone: Option<String>,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub operating_hours: Option<serde_json::Value>,
    pub status: Option<ContactStatus>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProtocolRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub protocol_type: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(custom(function = "validate_steps"))]
    pub steps: serde_json::Value,
    pub icon: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProtocolRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub protocol_type: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_steps"))]
    pub steps: Option<serde_json::Value>,
    pub icon: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Steps are a non-empty list of strings
fn validate_steps(steps: &serde_json::Value) -> std::result::Result<(), ValidationError> {
    match steps.as_array() {
        Some(items) if !items.is_empty() && items.iter().all(|s| s.is_string()) => Ok(()),
        _ => Err(ValidationError::new("steps")
            .with_message("The steps must be a non-empty list of strings".into())),
    }
}

// ============================================================================
// Contacts
// ============================================================================

async fn list_contacts(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
    Query(query): Query<EmergencyListQuery>,
) -> Result<ApiResponse<Vec<emergency_contact::Model>>> {
    let mut select = EmergencyContact::find().filter(emergency_contact::Column::IsActive.eq(true));
    if let Some(kind) = query.kind {
        select = select.filter(emergency_contact::Column::ContactType.eq(kind));
    }

    let contacts = select
        .order_by_asc(emergency_contact::Column::Priority)
        .order_by_asc(emergency_contact::Column::Name)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(contacts))
}

async fn find_contact(state: &AppState, id: i64) -> Result<emergency_contact::Model> {
    EmergencyContact::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Emergency contact not found".to_string()))
}

async fn create_contact(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    ValidatedJson(req): ValidatedJson<CreateContactRequest>,
) -> Result<(StatusCode, ApiResponse<emergency_contact::Model>)> {
    let now = Utc::now();
    let created = emergency_contact::ActiveModel {
        name: Set(req.name),
        contact_type: Set(req.contact_type),
        phone: Set(req.phone),
        email: Set(req.email),
        location: Set(req.location),
        description: Set(req.description),
        operating_hours: Set(req.operating_hours),
        status: Set(req.status.unwrap_or_default()),
        is_active: Set(req.is_active.unwrap_or(true)),
        priority: Set(req.priority.unwrap_or(0)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    state
        .audit
        .log_create(
            authorized.user_id(),
            ModelType::EmergencyContact,
            created.id,
            serde_json::to_value(&created)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(created)
        .with_message("Emergency contact created successfully")
        .created())
}

async fn update_contact(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateContactRequest>,
) -> Result<ApiResponse<emergency_contact::Model>> {
    let existing = find_contact(&state, id).await?;
    let old_values = serde_json::to_value(&existing)?;

    let mut active = existing.into_active_model();
    if let Some(name) = req.name {
        active.name = Set(name);
    }
    if let Some(contact_type) = req.contact_type {
        active.contact_type = Set(contact_type);
    }
    if let Some(phone) = req.phone {
        active.phone = Set(phone);
    }
    if req.email.is_some() {
        active.email = Set(req.email);
    }
    if req.location.is_some() {
        active.location = Set(req.location);
    }
    if req.description.is_some() {
        active.description = Set(req.description);
    }
    if req.operating_hours.is_some() {
        active.operating_hours = Set(req.operating_hours);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(priority) = req.priority {
        active.priority = Set(priority);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    state
        .audit
        .log_update(
            authorized.user_id(),
            ModelType::EmergencyContact,
            updated.id,
            old_values,
            serde_json::to_value(&updated)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(updated).with_message("Emergency contact updated successfully"))
}

async fn delete_contact(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let existing = find_contact(&state, id).await?;
    let old_values = serde_json::to_value(&existing)?;
    existing.delete(&state.db).await?;

    state
        .audit
        .log_delete(
            authorized.user_id(),
            ModelType::EmergencyContact,
            id,
            old_values,
            &origin,
        )
        .await;

    Ok(ApiResponse::message("Emergency contact deleted successfully"))
}

// ============================================================================
// Protocols
// ============================================================================

async fn list_protocols(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
    Query(query): Query<EmergencyListQuery>,
) -> Result<ApiResponse<Vec<emergency_protocol::Model>>> {
    let mut select =
        EmergencyProtocol::find().filter(emergency_protocol::Column::IsActive.eq(true));
    if let Some(kind) = query.kind {
        select = select.filter(emergency_protocol::Column::ProtocolType.eq(kind));
    }

    let protocols = select
        .order_by_asc(emergency_protocol::Column::Priority)
        .order_by_asc(emergency_protocol::Column::Title)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(protocols))
}

async fn find_protocol(state: &AppState, id: i64) -> Result<emergency_protocol::Model> {
    EmergencyProtocol::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Emergency protocol not found".to_string()))
}

async fn create_protocol(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    ValidatedJson(req): ValidatedJson<CreateProtocolRequest>,
) -> Result<(StatusCode, ApiResponse<emergency_protocol::Model>)> {
    let now = Utc::now();
    let created = emergency_protocol::ActiveModel {
        title: Set(req.title),
        protocol_type: Set(req.protocol_type),
        description: Set(req.description),
        steps: Set(req.steps),
        icon: Set(req.icon),
        priority: Set(req.priority.unwrap_or(0)),
        is_active: Set(req.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    state
        .audit
        .log_create(
            authorized.user_id(),
            ModelType::EmergencyProtocol,
            created.id,
            serde_json::to_value(&created)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(created)
        .with_message("Emergency protocol created successfully")
        .created())
}

async fn update_protocol(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateProtocolRequest>,
) -> Result<ApiResponse<emergency_protocol::Model>> {
    let existing = find_protocol(&state, id).await?;
    let old_values = serde_json::to_value(&existing)?;

    let mut active = existing.into_active_model();
    if let Some(title) = req.title {
        active.title = Set(title);
    }
    if let Some(protocol_type) = req.protocol_type {
        active.protocol_type = Set(protocol_type);
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    if let Some(steps) = req.steps {
        active.steps = Set(steps);
    }
    if req.icon.is_some() {
        active.icon = Set(req.icon);
    }
    if let Some(priority) = req.priority {
        active.priority = Set(priority);
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    state
        .audit
        .log_update(
            authorized.user_id(),
            ModelType::EmergencyProtocol,
            updated.id,
            old_values,
            serde_json::to_value(&updated)?,
            &origin,
        )
        .await;

    Ok(ApiResponse::ok(updated).with_message("Emergency protocol updated successfully"))
}

async fn delete_protocol(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let existing = find_protocol(&state, id).await?;
    let old_values = serde_json::to_value(&existing)?;
    existing.delete(&state.db).await?;

    state
        .audit
        .log_delete(
            authorized.user_id(),
            ModelType::EmergencyProtocol,
            id,
            old_values,
            &origin,
        )
        .await;

    Ok(ApiResponse::message("Emergency protocol deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_must_be_strings() {
        assert!(validate_steps(&json!(["Stay calm", "Call security"])).is_ok());
        assert!(validate_steps(&json!([])).is_err());
        assert!(validate_steps(&json!([1, 2])).is_err());
        assert!(validate_steps(&json!("Stay calm")).is_err());
    }
}
