use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::config::CONFIG;
use crate::db::is_unique_violation;
use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, AdminOrDepartmentHead, Authenticated, Authorized};
use crate::models::audit_log::{AuditAction, ModelType};
use crate::models::enums::Role;
use crate::models::prelude::*;
use crate::models::{department, user};
use crate::schemas::{avatar_url, ApiResponse, PageParams, ProfileResponse, UserResponse};
use crate::services::{hash_password, sequence, verify_password, AuditEntry};
use crate::state::AppState;

/// Create users routes
pub fn users_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/profile/me", get(get_profile).put(update_profile))
        .route(
            "/profile/avatar",
            post(upload_avatar)
                .layer(DefaultBodyLimit::max(CONFIG.storage.max_avatar_bytes + 64 * 1024)),
        )
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

const AVATAR_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub role: Option<Role>,
    pub department_id: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
    pub department_id: Option<i64>,
    #[validate(length(min = 1, max = 20))]
    pub student_id: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub employee_id: Option<String>,
    #[validate(length(max = 20, message = "The phone may not be greater than 20 characters"))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "The name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    #[validate(length(min = 8, message = "The password must be at least 8 characters"))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 20))]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 20))]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "The phone may not be greater than 20 characters"))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "The name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "The phone may not be greater than 20 characters"))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
    #[serde(skip_serializing)]
    pub current_password: Option<String>,
    #[serde(skip_serializing)]
    #[validate(length(min = 8, message = "The password must be at least 8 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn provided_fields<T: Serialize>(req: &T) -> Result<Vec<String>> {
    Ok(match serde_json::to_value(req)? {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    })
}

async fn find_user(state: &AppState, id: i64) -> Result<user::Model> {
    User::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn ensure_department(state: &AppState, id: i64) -> Result<department::Model> {
    Department::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::invalid_field("department_id", "The selected department is invalid")
        })
}

async fn ensure_email_free(state: &AppState, email: &str, except: Option<i64>) -> Result<()> {
    let mut query = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.one(&state.db).await?.is_some() {
        return Err(AppError::invalid_field("email", "The email has already been taken"));
    }
    Ok(())
}

/// Department heads only see users of their own department
fn same_department(viewer: &user::Model, other: &user::Model) -> bool {
    viewer.role == Role::DepartmentHead
        && viewer.department_id.is_some()
        && viewer.department_id == other.department_id
}

fn duplicate_identifier(e: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("A user with this email or ID already exists".to_string())
    } else {
        e.into()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_users(
    State(state): State<AppState>,
    authorized: Authorized<AdminOrDepartmentHead>,
    Query(query): Query<UserListQuery>,
) -> Result<ApiResponse<Vec<UserResponse>>> {
    let viewer = authorized.user();
    let mut select = User::find();

    if viewer.role == Role::DepartmentHead {
        select = select.filter(user::Column::DepartmentId.eq(viewer.department_id));
    }
    if let Some(role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(department_id) = query.department_id {
        select = select.filter(user::Column::DepartmentId.eq(department_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(user::Column::IsActive.eq(is_active));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(user::Column::Name.contains(search))
                .add(user::Column::Email.contains(search))
                .add(user::Column::StudentId.contains(search))
                .add(user::Column::EmployeeId.contains(search)),
        );
    }

    let select = select
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id);

    let (users, pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;

    let data = UserResponse::load_many(&state.db, users).await?;
    Ok(ApiResponse::paginated(data, pagination))
}

async fn create_user(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, ApiResponse<UserResponse>)> {
    let email = req.email.trim().to_lowercase();
    ensure_email_free(&state, &email, None).await?;
    if let Some(department_id) = req.department_id {
        ensure_department(&state, department_id).await?;
    }

    let password = hash_password(&req.password)?;
    let now = Utc::now();

    let txn = state.db.begin().await?;

    let (student_id, employee_id) = if req.role.is_student() {
        let student_id = match req.student_id {
            Some(id) => id,
            None => sequence::next_student_id(&txn).await?,
        };
        (Some(student_id), None)
    } else {
        (None, req.employee_id)
    };

    let created = user::ActiveModel {
        student_id: Set(student_id),
        employee_id: Set(employee_id),
        name: Set(req.name.trim().to_string()),
        email: Set(email),
        password: Set(password),
        role: Set(req.role),
        department_id: Set(req.department_id),
        phone: Set(req.phone),
        avatar: Set(None),
        preferences: Set(None),
        is_active: Set(req.is_active.unwrap_or(true)),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(duplicate_identifier)?;

    txn.commit().await?;

    tracing::info!("User {} created with role {}", created.id, created.role);

    state
        .audit
        .log(
            AuditEntry::new(Some(authorized.user_id()), AuditAction::Create)
                .subject(ModelType::User, created.id)
                .new_values(serde_json::to_value(&created)?)
                .metadata(json!({
                    "name": created.name,
                    "email": created.email,
                    "role": created.role,
                }))
                .origin(&origin),
        )
        .await;

    let data = UserResponse::load(&state.db, created).await?;
    Ok(ApiResponse::ok(data)
        .with_message("User created successfully")
        .created())
}

async fn get_user(
    State(state): State<AppState>,
    Authenticated(viewer, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<UserResponse>> {
    let found = find_user(&state, id).await?;

    let allowed = viewer.id == found.id
        || viewer.role == Role::Admin
        || same_department(&viewer, &found);
    if !allowed {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    Ok(ApiResponse::ok(UserResponse::load(&state.db, found).await?))
}

async fn update_user(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOrDepartmentHead>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<ApiResponse<UserResponse>> {
    let editor = authorized.user();
    let found = find_user(&state, id).await?;

    if editor.role == Role::DepartmentHead {
        if !same_department(editor, &found) {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }
        if found.id != editor.id && matches!(found.role, Role::Admin | Role::DepartmentHead) {
            return Err(AppError::Forbidden(
                "Department heads cannot modify admins or other department heads".to_string(),
            ));
        }
        if req.role == Some(Role::Admin) {
            return Err(AppError::Forbidden(
                "Department heads cannot grant the admin role".to_string(),
            ));
        }
        if req.department_id.is_some_and(|d| Some(d) != editor.department_id) {
            return Err(AppError::Forbidden(
                "Department heads cannot move users to another department".to_string(),
            ));
        }
    }

    let email = req.email.as_deref().map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        ensure_email_free(&state, email, Some(found.id)).await?;
    }
    if let Some(department_id) = req.department_id {
        ensure_department(&state, department_id).await?;
    }

    let mut changes = provided_fields(&req)?;
    if req.password.is_some() {
        changes.push("password".to_string());
    }
    let old_values = serde_json::to_value(&found)?;
    let token_version = found.token_version + 1;

    let mut active = found.into_active_model();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(password) = req.password {
        active.password = Set(hash_password(&password)?);
        active.token_version = Set(token_version);
    }
    if let Some(role) = req.role {
        active.role = Set(role);
    }
    if let Some(department_id) = req.department_id {
        active.department_id = Set(Some(department_id));
    }
    if let Some(student_id) = req.student_id {
        active.student_id = Set(Some(student_id));
    }
    if let Some(employee_id) = req.employee_id {
        active.employee_id = Set(Some(employee_id));
    }
    if let Some(phone) = req.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(duplicate_identifier)?;

    state
        .audit
        .log(
            AuditEntry::new(Some(editor.id), AuditAction::Update)
                .subject(ModelType::User, updated.id)
                .old_values(old_values)
                .new_values(serde_json::to_value(&updated)?)
                .metadata(json!({ "name": updated.name, "changes": changes }))
                .origin(&origin),
        )
        .await;

    let data = UserResponse::load(&state.db, updated).await?;
    Ok(ApiResponse::ok(data).with_message("User updated successfully"))
}

async fn delete_user(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    if authorized.user_id() == id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    let found = find_user(&state, id).await?;
    let old_values = serde_json::to_value(&found)?;
    let metadata = json!({ "name": found.name, "email": found.email, "id": found.id });
    found.delete(&state.db).await?;

    tracing::info!("User {} deleted by {}", id, authorized.user_id());

    state
        .audit
        .log(
            AuditEntry::new(Some(authorized.user_id()), AuditAction::Delete)
                .subject(ModelType::User, id)
                .old_values(old_values)
                .metadata(metadata)
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::message("User deleted successfully"))
}

async fn get_profile(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
) -> Result<ApiResponse<ProfileResponse>> {
    let department = match user.department_id {
        Some(id) => Department::find_by_id(id).one(&state.db).await?,
        None => None,
    };
    Ok(ApiResponse::ok(ProfileResponse::new(&user, department.as_ref())))
}

async fn update_profile(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserResponse>> {
    if let Some(preferences) = &req.preferences {
        if !preferences.is_object() {
            return Err(AppError::invalid_field(
                "preferences",
                "The preferences must be an object",
            ));
        }
    }

    let mut changes = provided_fields(&req)?;
    let new_password = match req.password {
        Some(password) => {
            let current = req.current_password.as_deref().unwrap_or_default();
            if !verify_password(current, &user.password) {
                return Err(AppError::invalid_field(
                    "current_password",
                    "The current password is incorrect",
                ));
            }
            changes.push("password".to_string());
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let mut active = user.into_active_model();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = req.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(preferences) = req.preferences {
        active.preferences = Set(Some(preferences));
    }
    if let Some(password) = new_password {
        active.password = Set(password);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(updated.id), AuditAction::ProfileUpdate)
                .subject(ModelType::User, updated.id)
                .metadata(json!({ "changes": changes }))
                .origin(&origin),
        )
        .await;

    let data = UserResponse::load(&state.db, updated).await?;
    Ok(ApiResponse::ok(data).with_message("Profile updated successfully"))
}

/// File extension for an accepted avatar upload
fn avatar_extension(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    let from_type = content_type.and_then(|ct| {
        AVATAR_TYPES
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(ct))
            .map(|(_, ext)| *ext)
    });

    from_type.or_else(|| {
        let ext = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some("jpg"),
            "png" => Some("png"),
            "gif" => Some("gif"),
            _ => None,
        }
    })
}

async fn upload_avatar(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    mut multipart: Multipart,
) -> Result<ApiResponse<AvatarResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let extension = avatar_extension(field.content_type(), field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((extension, bytes));
    }

    let (extension, bytes) =
        upload.ok_or_else(|| AppError::invalid_field("avatar", "The avatar field is required"))?;
    let extension = extension.ok_or_else(|| {
        AppError::invalid_field("avatar", "The avatar must be a file of type: jpeg, png, jpg, gif")
    })?;
    if bytes.len() > CONFIG.storage.max_avatar_bytes {
        return Err(AppError::invalid_field(
            "avatar",
            "The avatar may not be greater than 2048 kilobytes",
        ));
    }

    let file_name = format!("{}_{}.{}", user.id, Utc::now().timestamp(), extension);
    let relative = format!("avatars/{}", file_name);
    let directory = CONFIG.storage.storage_dir.join("avatars");
    tokio::fs::create_dir_all(&directory).await?;
    tokio::fs::write(directory.join(&file_name), &bytes).await?;

    if let Some(previous) = user.avatar.as_deref().filter(|p| p.starts_with("avatars/")) {
        if let Err(e) = tokio::fs::remove_file(CONFIG.storage.storage_dir.join(previous)).await {
            tracing::warn!("Failed to remove previous avatar {}: {}", previous, e);
        }
    }

    let user_id = user.id;
    let mut active = user.into_active_model();
    active.avatar = Set(Some(relative.clone()));
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user_id), AuditAction::AvatarUpload)
                .subject(ModelType::User, user_id)
                .metadata(json!({ "filename": file_name, "size": bytes.len() }))
                .origin(&origin),
        )
        .await;

    Ok(ApiResponse::ok(AvatarResponse {
        avatar: avatar_url(&relative),
    })
    .with_message("Avatar uploaded successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_extension() {
        assert_eq!(avatar_extension(Some("image/png"), None), Some("png"));
        assert_eq!(avatar_extension(Some("image/jpeg"), Some("me.jpeg")), Some("jpg"));
        assert_eq!(avatar_extension(None, Some("ME.GIF")), Some("gif"));
        assert_eq!(avatar_extension(Some("application/pdf"), Some("cv.pdf")), None);
        assert_eq!(avatar_extension(None, Some("noext")), None);
    }
}
