use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::endpoints::announcements::student_filter;
use crate::endpoints::extractors::ClientInfo;
use crate::error::{AppError, Result};
use crate::middleware::{AdminOrDepartmentHead, Authenticated, Authorized};
use crate::models::audit_log::AuditAction;
use crate::models::enums::{AnnouncementStatus, AnnouncementType, ConcernStatus, Priority, Role};
use crate::models::prelude::*;
use crate::models::{announcement, audit_log, concern, user};
use crate::schemas::{AnnouncementResponse, ApiResponse, ConcernResponse};
use crate::services::analytics::{
    self, parse_date_bound, ConcernReportFilter, DepartmentStats, StatusCounts, UserStats,
};
use crate::services::notification::excerpt;
use crate::services::AuditEntry;
use crate::state::AppState;

/// Create analytics and report routes
pub fn analytics_routes(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/concerns", get(concern_stats))
        .route("/departments", get(department_stats))
        .route("/users", get(user_stats))
        .route("/reports/concerns", get(concern_report))
        .route("/reports/departments", get(department_report))
        .route("/reports/users", get(user_report))
        .route("/reports/export", get(export_report))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Concerns,
    Departments,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub report: ReportKind,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub department_id: Option<i64>,
    pub status: Option<ConcernStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_concerns: i64,
    pub resolved_concerns: i64,
    pub pending_concerns: i64,
    /// Percentage of health checks passing
    pub system_health: u8,
    pub ai_interactions: u64,
    pub department_stats: Vec<DashboardDepartment>,
    pub recent_concerns: Vec<RecentConcern>,
    pub recent_announcements: Vec<RecentAnnouncement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDepartment {
    pub department: String,
    pub concern_count: i64,
    pub resolved_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentConcern {
    pub id: i64,
    pub title: String,
    pub department: Option<String>,
    pub facility: String,
    pub status: ConcernStatus,
    pub submitted_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnnouncement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: AnnouncementType,
    pub is_bookmarked: bool,
}

impl From<ConcernResponse> for RecentConcern {
    fn from(row: ConcernResponse) -> Self {
        Self {
            id: row.concern.id,
            title: row.concern.subject,
            department: row.department.map(|d| d.name),
            facility: row
                .facility
                .map(|f| f.name)
                .unwrap_or_else(|| "General".to_string()),
            status: row.concern.status,
            submitted_at: row.concern.created_at,
            description: row.concern.description,
        }
    }
}

impl From<AnnouncementResponse> for RecentAnnouncement {
    fn from(row: AnnouncementResponse) -> Self {
        let a = row.announcement;
        Self {
            id: a.id,
            content: a
                .excerpt
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| excerpt(&a.content, 150)),
            title: a.title,
            author: row.author.map(|u| u.name),
            published_at: a.published_at,
            priority: a.priority,
            category: a.announcement_type,
            is_bookmarked: row.is_bookmarked,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Department heads only report on their own department
fn scope_report(
    viewer: &user::Model,
    mut filter: ConcernReportFilter,
) -> Result<ConcernReportFilter> {
    if viewer.role == Role::DepartmentHead {
        let own = viewer
            .department_id
            .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;
        if filter.department_id.is_some_and(|id| id != own) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        filter.department_id = Some(own);
    }
    Ok(filter)
}

/// Share of health probes that pass, as a percentage
async fn system_health(state: &AppState) -> u8 {
    let checks = [
        state.db.execute_unprepared("SELECT 1").await.is_ok(),
        state.openai.is_configured(),
        state.notification.push_configured(),
    ];
    let passing = checks.iter().filter(|ok| **ok).count();
    (passing * 100 / checks.len()) as u8
}

fn csv_response(file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn dashboard(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
) -> Result<ApiResponse<DashboardStats>> {
    let now = Utc::now();

    let total_users = User::find()
        .filter(user::Column::IsActive.eq(true))
        .count(&state.db)
        .await?;
    let counts = analytics::concern_status_counts(&state.db, Condition::all()).await?;

    let mut ai_query =
        AuditLog::find().filter(audit_log::Column::Action.eq(AuditAction::AiChat.to_string()));
    if !user.is_admin() {
        ai_query = ai_query.filter(audit_log::Column::UserId.eq(user.id));
    }
    let ai_interactions = ai_query.count(&state.db).await?;

    let department_stats = analytics::department_stats(&state.db)
        .await?
        .into_iter()
        .map(|d| DashboardDepartment {
            department: d.name,
            concern_count: d.concerns_count,
            resolved_count: d.resolved_concerns,
        })
        .collect();

    let recent_concerns = if user.role == Role::Student {
        let concerns = Concern::find()
            .filter(concern::Column::StudentId.eq(user.id))
            .order_by_desc(concern::Column::CreatedAt)
            .order_by_desc(concern::Column::Id)
            .limit(5)
            .all(&state.db)
            .await?;
        ConcernResponse::load_many(&state.db, concerns)
            .await?
            .into_iter()
            .map(RecentConcern::from)
            .collect()
    } else {
        Vec::new()
    };

    let announcements = if user.role == Role::Student {
        student_filter(Announcement::find(), user.department_id, now)
    } else {
        Announcement::find()
            .filter(announcement::Column::Status.eq(AnnouncementStatus::Published))
            .filter(announcement::Column::PublishedAt.lte(now))
            .filter(
                Condition::any()
                    .add(announcement::Column::ExpiresAt.is_null())
                    .add(announcement::Column::ExpiresAt.gt(now)),
            )
    };
    let announcements = announcements
        .order_by_desc(announcement::Column::PublishedAt)
        .limit(3)
        .all(&state.db)
        .await?;
    let recent_announcements = AnnouncementResponse::load_many(&state.db, announcements, user.id)
        .await?
        .into_iter()
        .map(RecentAnnouncement::from)
        .collect();

    Ok(ApiResponse::ok(DashboardStats {
        total_users,
        active_concerns: counts.active(),
        resolved_concerns: counts.resolved,
        pending_concerns: counts.pending,
        system_health: system_health(&state).await,
        ai_interactions,
        department_stats,
        recent_concerns,
        recent_announcements,
    }))
}

async fn concern_stats(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
    Query(query): Query<DateRangeQuery>,
) -> Result<ApiResponse<StatusCounts>> {
    let now = Utc::now();
    let from = match query.date_from.as_deref() {
        Some(s) => parse_date_bound(s, false).ok_or_else(|| {
            AppError::invalid_field("date_from", "The date from is not a valid date")
        })?,
        None => now - Duration::days(30),
    };
    let to = match query.date_to.as_deref() {
        Some(s) => parse_date_bound(s, true)
            .ok_or_else(|| AppError::invalid_field("date_to", "The date to is not a valid date"))?,
        None => now,
    };

    let counts =
        analytics::concern_status_counts(&state.db, analytics::created_between(from, to)).await?;
    Ok(ApiResponse::ok(counts))
}

async fn department_stats(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
) -> Result<ApiResponse<Vec<DepartmentStats>>> {
    Ok(ApiResponse::ok(analytics::department_stats(&state.db).await?))
}

async fn user_stats(
    State(state): State<AppState>,
    Authenticated(_, _): Authenticated,
) -> Result<ApiResponse<UserStats>> {
    Ok(ApiResponse::ok(analytics::user_stats(&state.db).await?))
}

async fn concern_report(
    State(state): State<AppState>,
    authorized: Authorized<AdminOrDepartmentHead>,
    Query(filter): Query<ConcernReportFilter>,
) -> Result<ApiResponse<Vec<ConcernResponse>>> {
    let filter = scope_report(authorized.user(), filter)?;
    let rows = analytics::concern_report(&state.db, &filter).await?;
    let total = rows.len();
    Ok(ApiResponse::ok(rows).with_extra("total", total))
}

async fn department_report(
    State(state): State<AppState>,
    authorized: Authorized<AdminOrDepartmentHead>,
) -> Result<ApiResponse<Vec<DepartmentStats>>> {
    let viewer = authorized.user();
    let mut rows = analytics::department_stats(&state.db).await?;
    if viewer.role == Role::DepartmentHead {
        rows.retain(|d| Some(d.id) == viewer.department_id);
    }
    let total = rows.len();
    Ok(ApiResponse::ok(rows).with_extra("total", total))
}

async fn user_report(
    State(state): State<AppState>,
    _authorized: Authorized<AdminOrDepartmentHead>,
) -> Result<ApiResponse<UserStats>> {
    Ok(ApiResponse::ok(analytics::user_stats(&state.db).await?))
}

async fn export_report(
    State(state): State<AppState>,
    ClientInfo(origin): ClientInfo,
    authorized: Authorized<AdminOrDepartmentHead>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let viewer = authorized.user();
    let stamp = Utc::now().format("%Y%m%d%H%M%S");

    let (file_name, body, rows) = match query.report {
        ReportKind::Concerns => {
            let filter = scope_report(
                viewer,
                ConcernReportFilter {
                    date_from: query.date_from,
                    date_to: query.date_to,
                    department_id: query.department_id,
                    status: query.status,
                },
            )?;
            let rows = analytics::concern_report(&state.db, &filter).await?;
            (
                format!("concerns_report_{}.csv", stamp),
                analytics::concerns_csv(&rows)?,
                rows.len(),
            )
        }
        ReportKind::Departments => {
            let mut rows = analytics::department_stats(&state.db).await?;
            if viewer.role == Role::DepartmentHead {
                rows.retain(|d| Some(d.id) == viewer.department_id);
            }
            (
                format!("departments_report_{}.csv", stamp),
                analytics::departments_csv(&rows)?,
                rows.len(),
            )
        }
    };

    state
        .audit
        .log(
            AuditEntry::new(Some(authorized.user_id()), AuditAction::ReportExported)
                .metadata(json!({
                    "report": file_name,
                    "rows": rows,
                }))
                .origin(&origin),
        )
        .await;

    tracing::info!("User {} exported {} ({} rows)", authorized.user_id(), file_name, rows);
    Ok(csv_response(&file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(role: Role, department_id: Option<i64>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 4,
            student_id: None,
            employee_id: Some("EMP-004".to_string()),
            name: "Viewer".to_string(),
            email: "viewer@bestlink.edu.ph".to_string(),
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
    fn test_department_head_reports_are_scoped() {
        let head = viewer(Role::DepartmentHead, Some(2));

        let scoped = scope_report(&head, ConcernReportFilter::default()).unwrap();
        assert_eq!(scoped.department_id, Some(2));

        let other = ConcernReportFilter {
            department_id: Some(5),
            ..Default::default()
        };
        assert!(scope_report(&head, other).is_err());

        let admin = viewer(Role::Admin, None);
        let unscoped = scope_report(&admin, ConcernReportFilter::default()).unwrap();
        assert_eq!(unscoped.department_id, None);
    }

    #[test]
    fn test_recent_announcement_falls_back_to_content() {
        let now = Utc::now();
        let row = AnnouncementResponse {
            announcement: announcement::Model {
                id: 1,
                title: "Enrollment".to_string(),
                content: "x".repeat(200),
                excerpt: None,
                announcement_type: AnnouncementType::Academic,
                priority: Priority::High,
                status: AnnouncementStatus::Published,
                author_id: 1,
                target_roles: None,
                published_at: Some(now),
                expires_at: None,
                featured_image: None,
                attachments: None,
                view_count: 0,
                bookmark_count: 0,
                created_at: now,
                updated_at: now,
            },
            author: None,
            target_departments: Vec::new(),
            is_bookmarked: true,
            bookmarked_at: None,
        };

        let recent = RecentAnnouncement::from(row);
        assert!(recent.content.len() < 200);
        assert!(recent.is_bookmarked);
        let json = serde_json::to_value(&recent).unwrap();
        assert_eq!(json["category"], "academic");
        assert!(json.get("publishedAt").is_some());
    }
}
