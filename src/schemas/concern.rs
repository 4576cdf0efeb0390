use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::db::DbConn;
use crate::error::Result;
use crate::models::{concern, concern_message, facility};
use crate::schemas::user::{departments_by_id, users_by_id, DepartmentSummary, UserSummary};

#[derive(Debug, Clone, Serialize)]
pub struct FacilitySummary {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub building: Option<String>,
}

impl From<&facility::Model> for FacilitySummary {
    fn from(facility: &facility::Model) -> Self {
        Self {
            id: facility.id,
            name: facility.name.clone(),
            code: facility.code.clone(),
            building: facility.building.clone(),
        }
    }
}

/// Concern with the people and places it refers to
#[derive(Debug, Clone, Serialize)]
pub struct ConcernResponse {
    #[serde(flatten)]
    pub concern: concern::Model,
    pub student: Option<UserSummary>,
    pub department: Option<DepartmentSummary>,
    pub facility: Option<FacilitySummary>,
    pub assignee: Option<UserSummary>,
}

impl ConcernResponse {
    pub async fn load_many(db: &DbConn, concerns: Vec<concern::Model>) -> Result<Vec<Self>> {
        let users = users_by_id(
            db,
            concerns
                .iter()
                .flat_map(|c| std::iter::once(c.student_id).chain(c.assigned_to)),
        )
        .await?;
        let departments = departments_by_id(db, concerns.iter().map(|c| c.department_id)).await?;
        let facilities = facilities_by_id(db, concerns.iter().filter_map(|c| c.facility_id)).await?;

        Ok(concerns
            .into_iter()
            .map(|c| Self {
                student: users.get(&c.student_id).map(UserSummary::from),
                department: departments.get(&c.department_id).map(DepartmentSummary::from),
                facility: c
                    .facility_id
                    .and_then(|id| facilities.get(&id))
                    .map(FacilitySummary::from),
                assignee: c
                    .assigned_to
                    .and_then(|id| users.get(&id))
                    .map(UserSummary::from),
                concern: c,
            })
            .collect())
    }

    pub async fn load(db: &DbConn, concern: concern::Model) -> Result<Self> {
        let mut responses = Self::load_many(db, vec![concern]).await?;
        Ok(responses.remove(0))
    }
}

/// Concern message with its author
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    #[serde(flatten)]
    pub message: concern_message::Model,
    pub author: Option<UserSummary>,
}

impl MessageResponse {
    pub async fn load_many(
        db: &DbConn,
        messages: Vec<concern_message::Model>,
    ) -> Result<Vec<Self>> {
        let authors = users_by_id(db, messages.iter().map(|m| m.author_id)).await?;
        Ok(messages
            .into_iter()
            .map(|m| Self {
                author: authors.get(&m.author_id).map(UserSummary::from),
                message: m,
            })
            .collect())
    }
}

async fn facilities_by_id(
    db: &DbConn,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, facility::Model>> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let facilities = facility::Entity::find()
        .filter(facility::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(facilities.into_iter().map(|f| (f.id, f)).collect())
}
