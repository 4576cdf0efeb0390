//! String-backed enums shared by the entities.
//!
//! Every enum is stored as its snake_case name, so the same values appear in
//! the database, in request bodies and in JSON responses.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "faculty")]
    Faculty,
    #[sea_orm(string_value = "staff")]
    Staff,
    #[sea_orm(string_value = "department_head")]
    DepartmentHead,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Staff => "staff",
            Role::DepartmentHead => "department_head",
            Role::Admin => "admin",
        }
    }

    /// Employees carry an employee ID; students a student ID.
    pub fn is_student(&self) -> bool {
        matches!(self, Role::Student)
    }

    /// Roles that handle concerns on behalf of a department
    pub fn is_staff_member(&self) -> bool {
        !self.is_student()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ConcernStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ConcernStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcernStatus::Pending => "pending",
            ConcernStatus::InProgress => "in_progress",
            ConcernStatus::Resolved => "resolved",
            ConcernStatus::Closed => "closed",
            ConcernStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses counted as "active" on dashboards
    pub fn active() -> [ConcernStatus; 2] {
        [ConcernStatus::Pending, ConcernStatus::InProgress]
    }
}

impl std::fmt::Display for ConcernStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ConcernType {
    #[sea_orm(string_value = "academic")]
    Academic,
    #[sea_orm(string_value = "administrative")]
    Administrative,
    #[sea_orm(string_value = "technical")]
    Technical,
    #[sea_orm(string_value = "health")]
    Health,
    #[sea_orm(string_value = "safety")]
    Safety,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "status_change")]
    StatusChange,
    #[sea_orm(string_value = "assignment")]
    Assignment,
    #[sea_orm(string_value = "system")]
    System,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementType {
    #[default]
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "academic")]
    Academic,
    #[sea_orm(string_value = "administrative")]
    Administrative,
    #[sea_orm(string_value = "event")]
    Event,
    #[sea_orm(string_value = "emergency")]
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DepartmentType {
    #[sea_orm(string_value = "academic")]
    Academic,
    #[sea_orm(string_value = "administrative")]
    Administrative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[sea_orm(string_value = "android")]
    Android,
    #[sea_orm(string_value = "ios")]
    Ios,
    #[sea_orm(string_value = "web")]
    Web,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "busy")]
    Busy,
    #[sea_orm(string_value = "unavailable")]
    Unavailable,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ChatContext {
    #[default]
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "concern")]
    Concern,
    #[sea_orm(string_value = "assistance")]
    Assistance,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    #[default]
    #[sea_orm(string_value = "string")]
    #[serde(rename = "string")]
    Text,
    #[sea_orm(string_value = "integer")]
    Integer,
    #[sea_orm(string_value = "boolean")]
    Boolean,
    #[sea_orm(string_value = "json")]
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::DepartmentHead).unwrap();
        assert_eq!(json, "\"department_head\"");
        assert_eq!(Role::DepartmentHead.to_string(), "department_head");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let parsed: Result<ConcernStatus, _> = serde_json::from_str("\"reopened\"");
        assert!(parsed.is_err());
        let parsed: ConcernStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(parsed, ConcernStatus::InProgress);
    }

    #[test]
    fn test_staff_member_roles() {
        assert!(!Role::Student.is_staff_member());
        assert!(Role::Faculty.is_staff_member());
        assert!(Role::Admin.is_staff_member());
    }
}
