use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query as SqlQuery};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::endpoints::extractors::{ClientInfo, ValidatedJson};
use crate::error::{AppError, Result};
use crate::middleware::{Authenticated, Authorized, StaffOnly};
use crate::models::audit_log::{AuditAction, ModelType};
use crate::models::enums::{AnnouncementStatus, AnnouncementType, Priority, Role};
use crate::models::prelude::*;
use crate::models::{announcement, announcement_bookmark, announcement_department, department, user};
use crate::schemas::{AnnouncementResponse, ApiResponse, PageParams};
use crate::services::{settings, AuditEntry};
use crate::state::AppState;

/// Create announcement routes
pub fn announcements_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route("/user/bookmarks", get(list_bookmarks))
        .route(
            "/{id}",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
        .route("/{id}/bookmark", post(bookmark).delete(remove_bookmark))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// A status, or `all`
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub announcement_type: Option<AnnouncementType>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct CreateAnnouncementRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The title must be between 1 and 255 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "The content field is required"))]
    pub content: String,
    #[validate(length(max = 500, message = "The excerpt may not be greater than 500 characters"))]
    pub excerpt: Option<String>,
    #[serde(rename = "type", default)]
    pub announcement_type: AnnouncementType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: AnnouncementStatus,
    pub target_roles: Option<Vec<Role>>,
    pub target_departments: Option<Vec<i64>>,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub featured_image: Option<String>,
    pub attachments: Option<Vec<String>>,
}

fn validate_window(req: &CreateAnnouncementRequest) -> std::result::Result<(), ValidationError> {
    check_window(req.published_at, req.expires_at)
}

fn check_window(
    published_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> std::result::Result<(), ValidationError> {
    match (published_at, expires_at) {
        (Some(from), Some(until)) if until <= from => Err(ValidationError::new("expires_at")
            .with_message("The expiry date must be after the publish date".into())),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateAnnouncementRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "The title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "The content field is required"))]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "The excerpt may not be greater than 500 characters"))]
    pub excerpt: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub announcement_type: Option<AnnouncementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnnouncementStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_departments: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

// ============================================================================
// Visibility
// ============================================================================

/// Published, inside its window, and untargeted or aimed at `department_id`
pub(crate) fn student_filter(
    query: Select<Announcement>,
    department_id: Option<i64>,
    now: DateTime<Utc>,
) -> Select<Announcement> {
    let targeted = SqlQuery::select()
        .column(announcement_department::Column::AnnouncementId)
        .from(announcement_department::Entity)
        .to_owned();

    let mut audience = Condition::any().add(announcement::Column::Id.not_in_subquery(targeted));
    if let Some(department_id) = department_id {
        audience = audience.add(
            announcement::Column::Id.in_subquery(
                SqlQuery::select()
                    .column(announcement_department::Column::AnnouncementId)
                    .from(announcement_department::Entity)
                    .and_where(announcement_department::Column::DepartmentId.eq(department_id))
                    .to_owned(),
            ),
        );
    }

    query
        .filter(announcement::Column::Status.eq(AnnouncementStatus::Published))
        .filter(announcement::Column::PublishedAt.lte(now))
        .filter(
            Condition::any()
                .add(announcement::Column::ExpiresAt.is_null())
                .add(announcement::Column::ExpiresAt.gt(now)),
        )
        .filter(audience)
}

/// Whether a student in `department_id` may read the announcement
pub(crate) fn visible_to_student(
    announcement: &announcement::Model,
    target_departments: &[i64],
    department_id: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    let published = announcement.status == AnnouncementStatus::Published
        && announcement.published_at.is_some_and(|at| at <= now);
    let in_window = announcement.expires_at.is_none_or(|until| until > now);
    let targeted = target_departments.is_empty()
        || department_id.is_some_and(|d| target_departments.contains(&d));

    published && in_window && targeted
}

async fn target_department_ids<C: ConnectionTrait>(
    conn: &C,
    announcement_id: i64,
) -> Result<Vec<i64>> {
    Ok(AnnouncementDepartment::find()
        .select_only()
        .column(announcement_department::Column::DepartmentId)
        .filter(announcement_department::Column::AnnouncementId.eq(announcement_id))
        .into_tuple()
        .all(conn)
        .await?)
}

/// Load an announcement the user may read; hidden ones are reported as missing
async fn find_readable(
    state: &AppState,
    id: i64,
    user: &user::Model,
) -> Result<announcement::Model> {
    let not_found = || AppError::NotFound("Announcement not found".to_string());
    let found = Announcement::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;

    if user.role.is_student() {
        let targets = target_department_ids(&state.db, found.id).await?;
        if !visible_to_student(&found, &targets, user.department_id, Utc::now()) {
            return Err(not_found());
        }
    }

    Ok(found)
}

/// Only the author or an administrator may change an announcement
fn ensure_can_modify(user: &user::Model, announcement: &announcement::Model) -> Result<()> {
    if user.role == Role::Admin || announcement.author_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only modify your own announcements".to_string(),
        ))
    }
}

async fn ensure_publishing_enabled(state: &AppState) -> Result<()> {
    if settings::get_bool(&state.db, settings::ANNOUNCEMENTS_ENABLED, true).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Announcement publishing is disabled".to_string(),
        ))
    }
}

async fn ensure_departments_exist(state: &AppState, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: Vec<i64> = Department::find()
        .select_only()
        .column(department::Column::Id)
        .filter(department::Column::Id.is_in(ids.to_vec()))
        .into_tuple()
        .all(&state.db)
        .await?;
    if ids.iter().all(|id| found.contains(id)) {
        Ok(())
    } else {
        Err(AppError::invalid_field(
            "target_departments",
            "The selected target departments are invalid",
        ))
    }
}

/// Replace the target departments of an announcement
async fn sync_targets<C: ConnectionTrait>(
    conn: &C,
    announcement_id: i64,
    ids: &[i64],
) -> Result<()> {
    AnnouncementDepartment::delete_many()
        .filter(announcement_department::Column::AnnouncementId.eq(announcement_id))
        .exec(conn)
        .await?;

    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(());
    }

    AnnouncementDepartment::insert_many(ids.into_iter().map(|department_id| {
        announcement_department::ActiveModel {
            announcement_id: Set(announcement_id),
            department_id: Set(department_id),
            ..Default::default()
        }
    }))
    .exec(conn)
    .await?;
    Ok(())
}

fn is_live(announcement: &announcement::Model, now: DateTime<Utc>) -> bool {
    announcement.status == AnnouncementStatus::Published
        && announcement.published_at.is_some_and(|at| at <= now)
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_announcements(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<AnnouncementListQuery>,
) -> Result<ApiResponse<Vec<AnnouncementResponse>>> {
    let mut select = Announcement::find();

    if user.role.is_student() {
        select = student_filter(select, user.department_id, Utc::now());
    } else {
        match query.status.as_deref().unwrap_or("all") {
            "all" => {}
            other => {
                let status: AnnouncementStatus =
                    serde_json::from_value(json!(other)).map_err(|_| {
                        AppError::invalid_field("status", "The selected status is invalid")
                    })?;
                select = select.filter(announcement::Column::Status.eq(status));
            }
        }
    }
    if let Some(announcement_type) = query.announcement_type {
        select = select.filter(announcement::Column::AnnouncementType.eq(announcement_type));
    }
    if let Some(priority) = query.priority {
        select = select.filter(announcement::Column::Priority.eq(priority));
    }

    let select = select
        .order_by_desc(announcement::Column::PublishedAt)
        .order_by_desc(announcement::Column::CreatedAt)
        .order_by_desc(announcement::Column::Id);

    let (announcements, pagination) = crate::db::paginate(
        select,
        &state.db,
        PageParams::new(query.page, query.per_page),
    )
    .await?;

    let data = AnnouncementResponse::load_many(&state.db, announcements, user.id).await?;
    Ok(ApiResponse::paginated(data, pagination))
}

async fn create_announcement(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<StaffOnly>,
    ValidatedJson(req): ValidatedJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, ApiResponse<AnnouncementResponse>)> {
    let user = authorized.user();

    if req.status == AnnouncementStatus::Published {
        ensure_publishing_enabled(&state).await?;
    }
    let targets = req.target_departments.clone().unwrap_or_default();
    ensure_departments_exist(&state, &targets).await?;

    let now = Utc::now();
    let published_at = match req.status {
        AnnouncementStatus::Published => Some(req.published_at.unwrap_or(now)),
        AnnouncementStatus::Draft | AnnouncementStatus::Archived => req.published_at,
    };

    let txn = state.db.begin().await?;

    let created = announcement::ActiveModel {
        title: Set(req.title.trim().to_string()),
        content: Set(req.content),
        excerpt: Set(req.excerpt),
        announcement_type: Set(req.announcement_type),
        priority: Set(req.priority),
        status: Set(req.status),
        author_id: Set(user.id),
        target_roles: Set(req.target_roles.map(|roles| json!(roles))),
        published_at: Set(published_at),
        expires_at: Set(req.expires_at),
        featured_image: Set(req.featured_image),
        attachments: Set(req.attachments.map(|a| json!(a))),
        view_count: Set(0),
        bookmark_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    sync_targets(&txn, created.id, &targets).await?;
    txn.commit().await?;

    state
        .audit
        .log(
            AuditEntry::new(Some(user.id), AuditAction::Create)
                .subject(ModelType::Announcement, created.id)
                .new_values(serde_json::to_value(&created)?)
                .metadata(json!({
                    "title": created.title,
                    "type": created.announcement_type,
                    "priority": created.priority,
                }))
                .origin(&origin),
        )
        .await;

    if is_live(&created, now) {
        state.notification.announcement_published(&created).await;
    }

    let data = AnnouncementResponse::load(&state.db, created, user.id).await?;
    Ok(ApiResponse::ok(data)
        .with_message("Announcement created successfully")
        .created())
}

async fn get_announcement(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<AnnouncementResponse>> {
    let mut found = find_readable(&state, id, &user).await?;

    Announcement::update_many()
        .col_expr(
            announcement::Column::ViewCount,
            Expr::col(announcement::Column::ViewCount).add(1),
        )
        .filter(announcement::Column::Id.eq(found.id))
        .exec(&state.db)
        .await?;
    found.view_count += 1;

    Ok(ApiResponse::ok(
        AnnouncementResponse::load(&state.db, found, user.id).await?,
    ))
}

async fn update_announcement(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<StaffOnly>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateAnnouncementRequest>,
) -> Result<ApiResponse<AnnouncementResponse>> {
    let user = authorized.user();
    let found = Announcement::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;
    ensure_can_modify(user, &found)?;

    let was_live = is_live(&found, Utc::now());
    let publishing = req.status == Some(AnnouncementStatus::Published)
        && found.status != AnnouncementStatus::Published;
    if publishing {
        ensure_publishing_enabled(&state).await?;
    }
    if let Some(targets) = &req.target_departments {
        ensure_departments_exist(&state, targets).await?;
    }

    let published_at = req.published_at.or(found.published_at);
    let expires_at = req.expires_at.or(found.expires_at);
    check_window(published_at, expires_at).map_err(|e| {
        AppError::invalid_field(
            "expires_at",
            e.message.map(|m| m.to_string()).unwrap_or_default(),
        )
    })?;

    let old_values = serde_json::to_value(&found)?;
    let now = Utc::now();

    let txn = state.db.begin().await?;

    let mut active = found.into_active_model();
    if let Some(title) = req.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = req.content {
        active.content = Set(content);
    }
    if let Some(excerpt) = req.excerpt {
        active.excerpt = Set(Some(excerpt));
    }
    if let Some(announcement_type) = req.announcement_type {
        active.announcement_type = Set(announcement_type);
    }
    if let Some(priority) = req.priority {
        active.priority = Set(priority);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    if let Some(roles) = req.target_roles {
        active.target_roles = Set(Some(json!(roles)));
    }
    if req.published_at.is_some() {
        active.published_at = Set(req.published_at);
    } else if publishing && published_at.is_none() {
        active.published_at = Set(Some(now));
    }
    if req.expires_at.is_some() {
        active.expires_at = Set(req.expires_at);
    }
    if let Some(image) = req.featured_image {
        active.featured_image = Set(Some(image));
    }
    if let Some(attachments) = req.attachments {
        active.attachments = Set(Some(json!(attachments)));
    }
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    if let Some(targets) = &req.target_departments {
        sync_targets(&txn, updated.id, targets).await?;
    }
    txn.commit().await?;

    state
        .audit
        .log_update(
            user.id,
            ModelType::Announcement,
            updated.id,
            old_values,
            serde_json::to_value(&updated)?,
            &origin,
        )
        .await;

    if !was_live && is_live(&updated, now) {
        state.notification.announcement_published(&updated).await;
    }

    let data = AnnouncementResponse::load(&state.db, updated, user.id).await?;
    Ok(ApiResponse::ok(data).with_message("Announcement updated successfully"))
}

async fn delete_announcement(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<StaffOnly>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let user = authorized.user();
    let found = Announcement::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;
    ensure_can_modify(user, &found)?;

    let old_values = serde_json::to_value(&found)?;
    found.delete(&state.db).await?;

    state
        .audit
        .log_delete(user.id, ModelType::Announcement, id, old_values, &origin)
        .await;

    Ok(ApiResponse::message("Announcement deleted successfully"))
}

async fn bookmark(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let found = find_readable(&state, id, &user).await?;
    let now = Utc::now();

    let txn = state.db.begin().await?;

    let inserted = AnnouncementBookmark::insert(announcement_bookmark::ActiveModel {
        user_id: Set(user.id),
        announcement_id: Set(found.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([
            announcement_bookmark::Column::UserId,
            announcement_bookmark::Column::AnnouncementId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(&txn)
    .await?;

    if inserted > 0 {
        Announcement::update_many()
            .col_expr(
                announcement::Column::BookmarkCount,
                Expr::col(announcement::Column::BookmarkCount).add(1),
            )
            .filter(announcement::Column::Id.eq(found.id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    if inserted > 0 {
        state
            .audit
            .log(
                AuditEntry::new(Some(user.id), AuditAction::Bookmark)
                    .subject(ModelType::Announcement, found.id)
                    .origin(&origin),
            )
            .await;
    }

    Ok(ApiResponse::message("Announcement bookmarked successfully"))
}

async fn remove_bookmark(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    Authenticated(user, _): Authenticated,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>> {
    let txn = state.db.begin().await?;

    let deleted = AnnouncementBookmark::delete_many()
        .filter(announcement_bookmark::Column::UserId.eq(user.id))
        .filter(announcement_bookmark::Column::AnnouncementId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;

    if deleted > 0 {
        Announcement::update_many()
            .col_expr(
                announcement::Column::BookmarkCount,
                Expr::col(announcement::Column::BookmarkCount).sub(1),
            )
            .filter(announcement::Column::Id.eq(id))
            .filter(announcement::Column::BookmarkCount.gt(0))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    if deleted > 0 {
        state
            .audit
            .log(
                AuditEntry::new(Some(user.id), AuditAction::RemoveBookmark)
                    .subject(ModelType::Announcement, id)
                    .origin(&origin),
            )
            .await;
    }

    Ok(ApiResponse::message("Bookmark removed successfully"))
}

async fn list_bookmarks(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(params): Query<PageParams>,
) -> Result<ApiResponse<Vec<AnnouncementResponse>>> {
    let select = AnnouncementBookmark::find()
        .filter(announcement_bookmark::Column::UserId.eq(user.id))
        .order_by_desc(announcement_bookmark::Column::CreatedAt)
        .order_by_desc(announcement_bookmark::Column::Id);

    let (bookmarks, pagination) = crate::db::paginate(select, &state.db, params).await?;

    let ids: Vec<i64> = bookmarks.iter().map(|b| b.announcement_id).collect();
    let announcements = Announcement::find()
        .filter(announcement::Column::Id.is_in(ids))
        .all(&state.db)
        .await?;
    let mut responses = AnnouncementResponse::load_many(&state.db, announcements, user.id).await?;

    let data = bookmarks
        .iter()
        .filter_map(|b| {
            let position = responses
                .iter()
                .position(|r| r.announcement.id == b.announcement_id)?;
            Some(responses.swap_remove(position).with_bookmarked_at(b.created_at))
        })
        .collect();

    Ok(ApiResponse::paginated(data, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn published(at: DateTime<Utc>, expires: Option<DateTime<Utc>>) -> announcement::Model {
        announcement::Model {
            id: 1,
            title: "Enrollment schedule".to_string(),
            content: "Enrollment opens next week".to_string(),
            excerpt: None,
            announcement_type: AnnouncementType::Academic,
            priority: Priority::Medium,
            status: AnnouncementStatus::Published,
            author_id: 1,
            target_roles: None,
            published_at: Some(at),
            expires_at: expires,
            featured_image: None,
            attachments: None,
            view_count: 0,
            bookmark_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_student_visibility_window() {
        let now = Utc::now();
        let live = published(now - Duration::hours(1), None);
        assert!(visible_to_student(&live, &[], Some(2), now));

        let scheduled = published(now + Duration::hours(1), None);
        assert!(!visible_to_student(&scheduled, &[], Some(2), now));

        let expired = published(now - Duration::days(2), Some(now - Duration::days(1)));
        assert!(!visible_to_student(&expired, &[], Some(2), now));

        let mut draft = published(now - Duration::hours(1), None);
        draft.status = AnnouncementStatus::Draft;
        assert!(!visible_to_student(&draft, &[], Some(2), now));
    }

    #[test]
    fn test_student_visibility_targets() {
        let now = Utc::now();
        let live = published(now - Duration::hours(1), None);

        assert!(visible_to_student(&live, &[2, 3], Some(2), now));
        assert!(!visible_to_student(&live, &[3], Some(2), now));
        assert!(!visible_to_student(&live, &[3], None, now));
    }

    #[test]
    fn test_window_must_be_ordered() {
        let now = Utc::now();
        assert!(check_window(Some(now), Some(now + Duration::days(1))).is_ok());
        assert!(check_window(Some(now), Some(now)).is_err());
        assert!(check_window(None, Some(now)).is_ok());
    }
}
