//! Aggregate counts behind the dashboard, statistics and report endpoints.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::enums::{ConcernStatus, Role};
use crate::models::{concern, department, user};
use crate::schemas::ConcernResponse;

/// Concern counts per status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    fn add(&mut self, status: ConcernStatus, count: i64) {
        self.total += count;
        match status {
            ConcernStatus::Pending => self.pending += count,
            ConcernStatus::InProgress => self.in_progress += count,
            ConcernStatus::Resolved => self.resolved += count,
            ConcernStatus::Closed => self.closed += count,
            ConcernStatus::Cancelled => self.cancelled += count,
        }
    }

    pub fn active(&self) -> i64 {
        self.pending + self.in_progress
    }
}

/// Count concerns matching `condition`, grouped by status
pub async fn concern_status_counts(db: &DbConn, condition: Condition) -> Result<StatusCounts> {
    let rows: Vec<(ConcernStatus, i64)> = concern::Entity::find()
        .select_only()
        .column(concern::Column::Status)
        .column_as(Expr::col(concern::Column::Id).count(), "count")
        .filter(condition)
        .group_by(concern::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        counts.add(status, count);
    }
    Ok(counts)
}

/// Concerns created inside `[from, to]`
pub fn created_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(concern::Column::CreatedAt.gte(from))
        .add(concern::Column::CreatedAt.lte(to))
}

/// Per-department user and concern counts
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentStats {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub users_count: i64,
    pub concerns_count: i64,
    pub pending_concerns: i64,
    pub in_progress_concerns: i64,
    pub resolved_concerns: i64,
    pub closed_concerns: i64,
}

pub async fn department_stats(db: &DbConn) -> Result<Vec<DepartmentStats>> {
    let departments = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await?;

    let user_counts: HashMap<i64, i64> = user::Entity::find()
        .select_only()
        .column(user::Column::DepartmentId)
        .column_as(Expr::col(user::Column::Id).count(), "count")
        .filter(user::Column::DepartmentId.is_not_null())
        .group_by(user::Column::DepartmentId)
        .into_tuple::<(Option<i64>, i64)>()
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(id, count)| id.map(|id| (id, count)))
        .collect();

    let concern_rows: Vec<(i64, ConcernStatus, i64)> = concern::Entity::find()
        .select_only()
        .column(concern::Column::DepartmentId)
        .column(concern::Column::Status)
        .column_as(Expr::col(concern::Column::Id).count(), "count")
        .group_by(concern::Column::DepartmentId)
        .group_by(concern::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut concern_counts: HashMap<i64, StatusCounts> = HashMap::new();
    for (department_id, status, count) in concern_rows {
        concern_counts
            .entry(department_id)
            .or_default()
            .add(status, count);
    }

    Ok(departments
        .into_iter()
        .map(|d| {
            let counts = concern_counts.remove(&d.id).unwrap_or_default();
            DepartmentStats {
                users_count: user_counts.get(&d.id).copied().unwrap_or(0),
                concerns_count: counts.total,
                pending_concerns: counts.pending,
                in_progress_concerns: counts.in_progress,
                resolved_concerns: counts.resolved,
                closed_concerns: counts.closed,
                id: d.id,
                name: d.name,
                code: d.code,
            }
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub by_role: BTreeMap<String, i64>,
    /// Users who logged in during the last seven days
    pub recent_logins: u64,
}

pub async fn user_stats(db: &DbConn) -> Result<UserStats> {
    let total_users = user::Entity::find().count(db).await?;
    let active_users = user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await?;

    let by_role = user::Entity::find()
        .select_only()
        .column(user::Column::Role)
        .column_as(Expr::col(user::Column::Id).count(), "count")
        .group_by(user::Column::Role)
        .into_tuple::<(Role, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(role, count)| (role.to_string(), count))
        .collect();

    let recent_logins = user::Entity::find()
        .filter(user::Column::LastLoginAt.gte(Utc::now() - Duration::days(7)))
        .count(db)
        .await?;

    Ok(UserStats {
        total_users,
        active_users,
        by_role,
        recent_logins,
    })
}

/// Filters shared by the concern report and its CSV export
///
/// Dates accept either RFC 3339 timestamps or plain `YYYY-MM-DD` days; a
/// plain `date_to` covers the whole day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConcernReportFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub department_id: Option<i64>,
    pub status: Option<ConcernStatus>,
}

impl ConcernReportFilter {
    pub fn range(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let from = self
            .date_from
            .as_deref()
            .map(|s| parse_date_bound(s, false).ok_or_else(|| invalid_date("date_from")))
            .transpose()?;
        let to = self
            .date_to
            .as_deref()
            .map(|s| parse_date_bound(s, true).ok_or_else(|| invalid_date("date_to")))
            .transpose()?;

        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(AppError::invalid_field(
                    "date_to",
                    "The date to must be a date after or equal to date from",
                ));
            }
        }
        Ok((from, to))
    }

    pub fn condition(&self) -> Result<Condition> {
        let (from, to) = self.range()?;
        let mut condition = Condition::all();
        if let Some(from) = from {
            condition = condition.add(concern::Column::CreatedAt.gte(from));
        }
        if let Some(to) = to {
            condition = condition.add(concern::Column::CreatedAt.lte(to));
        }
        if let Some(department_id) = self.department_id {
            condition = condition.add(concern::Column::DepartmentId.eq(department_id));
        }
        if let Some(status) = self.status {
            condition = condition.add(concern::Column::Status.eq(status));
        }
        Ok(condition)
    }
}

fn invalid_date(field: &str) -> AppError {
    AppError::invalid_field(field, format!("The {} is not a valid date", field.replace('_', " ")))
}

/// Parse a report date; `end_of_day` stretches a plain day to 23:59:59
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        day.and_hms_opt(23, 59, 59)?
    } else {
        day.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

/// Concerns matching the report filter, newest first
pub async fn concern_report(
    db: &DbConn,
    filter: &ConcernReportFilter,
) -> Result<Vec<ConcernResponse>> {
    let concerns = concern::Entity::find()
        .filter(filter.condition()?)
        .order_by_desc(concern::Column::CreatedAt)
        .order_by_desc(concern::Column::Id)
        .all(db)
        .await?;
    ConcernResponse::load_many(db, concerns).await
}

/// Render report rows as CSV with a header line
pub fn concerns_csv(rows: &[ConcernResponse]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "reference_number",
        "subject",
        "type",
        "priority",
        "status",
        "department",
        "student",
        "assignee",
        "created_at",
        "resolved_at",
        "closed_at",
    ])?;

    for row in rows {
        let c = &row.concern;
        let student = if c.is_anonymous {
            "Anonymous".to_string()
        } else {
            row.student.as_ref().map(|s| s.name.clone()).unwrap_or_default()
        };
        writer.write_record([
            c.reference_number.clone(),
            c.subject.clone(),
            enum_label(&c.concern_type),
            enum_label(&c.priority),
            c.status.to_string(),
            row.department.as_ref().map(|d| d.name.clone()).unwrap_or_default(),
            student,
            row.assignee.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
            c.created_at.to_rfc3339(),
            c.resolved_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            c.closed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to finish CSV: {}", e)))
}

pub fn departments_csv(rows: &[DepartmentStats]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "code",
        "name",
        "users",
        "concerns",
        "pending",
        "in_progress",
        "resolved",
        "closed",
    ])?;
    for row in rows {
        writer.write_record([
            row.code.clone(),
            row.name.clone(),
            row.users_count.to_string(),
            row.concerns_count.to_string(),
            row.pending_concerns.to_string(),
            row.in_progress_concerns.to_string(),
            row.resolved_concerns.to_string(),
            row.closed_concerns.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to finish CSV: {}", e)))
}

/// snake_case name of a serde enum value
fn enum_label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ConcernType, Priority};
    use crate::schemas::DepartmentSummary;

    #[test]
    fn test_status_counts_accumulate() {
        let mut counts = StatusCounts::default();
        counts.add(ConcernStatus::Pending, 3);
        counts.add(ConcernStatus::InProgress, 2);
        counts.add(ConcernStatus::Resolved, 1);

        assert_eq!(counts.total, 6);
        assert_eq!(counts.active(), 5);
        assert_eq!(counts.closed, 0);
    }

    #[test]
    fn test_concerns_csv_hides_anonymous_students() {
        let now = Utc::now();
        let row = ConcernResponse {
            concern: concern::Model {
                id: 1,
                reference_number: "CNR2025060001".to_string(),
                subject: "Broken projector, room 301".to_string(),
                description: "It flickers".to_string(),
                concern_type: ConcernType::Technical,
                priority: Priority::High,
                status: ConcernStatus::InProgress,
                is_anonymous: true,
                student_id: 5,
                department_id: 2,
                facility_id: None,
                assigned_to: None,
                attachments: None,
                metadata: None,
                due_date: None,
                resolved_at: None,
                closed_at: None,
                created_at: now,
                updated_at: now,
            },
            student: None,
            department: Some(DepartmentSummary {
                id: 2,
                name: "BS Information Technology".to_string(),
                code: "BSIT".to_string(),
            }),
            facility: None,
            assignee: None,
        };

        let csv = String::from_utf8(concerns_csv(&[row]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("reference_number,subject,type"));
        let line = lines.next().unwrap();
        assert!(line.contains("\"Broken projector, room 301\""));
        assert!(line.contains("technical,high,in_progress"));
        assert!(line.contains("Anonymous"));
    }

    #[test]
    fn test_report_dates() {
        let from = parse_date_bound("2025-06-01", false).unwrap();
        let to = parse_date_bound("2025-06-01", true).unwrap();
        assert_eq!(from.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2025-06-01T23:59:59+00:00");
        assert!(parse_date_bound("2025-06-01T08:30:00+08:00", false).is_some());
        assert!(parse_date_bound("June 1st", false).is_none());

        let reversed = ConcernReportFilter {
            date_from: Some("2025-06-10".to_string()),
            date_to: Some("2025-06-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(reversed.range(), Err(AppError::Validation { .. })));

        let garbage = ConcernReportFilter {
            date_from: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(garbage.condition().is_err());
    }
}
