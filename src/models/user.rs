use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub student_id: Option<String>,
    #[sea_orm(unique)]
    pub employee_id: Option<String>,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Json>,
    pub is_active: bool,
    /// Bumped on password changes; tokens carrying an older value are rejected
    #[serde(skip_serializing)]
    pub token_version: i32,
    pub last_login_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Student ID for students, employee ID for everyone else
    pub fn display_id(&self) -> Option<&str> {
        if self.role.is_student() {
            self.student_id.as_deref()
        } else {
            self.employee_id.as_deref()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user manages concerns and users of the given department
    pub fn heads_department(&self, department_id: Option<i64>) -> bool {
        self.role == Role::DepartmentHead
            && self.department_id.is_some()
            && self.department_id == department_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "SetNull"
    )]
    Department,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
    #[sea_orm(has_many = "super::fcm_token::Entity")]
    FcmTokens,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::fcm_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FcmTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
