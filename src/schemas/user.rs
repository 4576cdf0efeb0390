use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::config::CONFIG;
use crate::db::DbConn;
use crate::error::Result;
use crate::models::enums::Role;
use crate::models::{department, user};

/// Compact user embedded in other resources
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.as_deref().map(avatar_url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentSummary {
    pub id: i64,
    pub name: String,
    pub code: String,
}

impl From<&department::Model> for DepartmentSummary {
    fn from(department: &department::Model) -> Self {
        Self {
            id: department.id,
            name: department.name.clone(),
            code: department.code.clone(),
        }
    }
}

/// Full user record with its department
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: user::Model,
    pub display_id: Option<String>,
    pub department: Option<DepartmentSummary>,
}

impl UserResponse {
    pub fn new(user: user::Model, department: Option<&department::Model>) -> Self {
        Self {
            display_id: display_id(&user),
            department: department.map(DepartmentSummary::from),
            user,
        }
    }

    /// Build responses for many users with one department query
    pub async fn load_many(db: &DbConn, users: Vec<user::Model>) -> Result<Vec<Self>> {
        let departments =
            departments_by_id(db, users.iter().filter_map(|u| u.department_id)).await?;

        Ok(users
            .into_iter()
            .map(|u| {
                let department = u.department_id.and_then(|id| departments.get(&id));
                Self::new(u, department)
            })
            .collect())
    }

    pub async fn load(db: &DbConn, user: user::Model) -> Result<Self> {
        let mut responses = Self::load_many(db, vec![user]).await?;
        Ok(responses.remove(0))
    }
}

/// Profile of the current user
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub department_id: Option<i64>,
    pub display_id: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub preferences: Option<serde_json::Value>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn new(user: &user::Model, department: Option<&department::Model>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            department: department.map(|d| d.name.clone()),
            department_id: user.department_id,
            display_id: display_id(user),
            avatar: user.avatar.as_deref().map(avatar_url),
            phone: user.phone.clone(),
            preferences: user.preferences.clone(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Student ID for students, employee ID for everyone else
pub fn display_id(user: &user::Model) -> Option<String> {
    if user.role.is_student() {
        user.student_id.clone()
    } else {
        user.employee_id.clone()
    }
}

/// Public URL of a stored avatar path
pub fn avatar_url(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        CONFIG.storage.public_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub async fn users_by_id(
    db: &DbConn,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, user::Model>> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn departments_by_id(
    db: &DbConn,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, department::Model>> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let departments = department::Entity::find()
        .filter(department::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(departments.into_iter().map(|d| (d.id, d)).collect())
}
