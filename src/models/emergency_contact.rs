use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::ContactStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "emergency_contacts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// medical, security, fire, police, guidance
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub contact_type: String,
    pub phone: String,
    pub email: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub operating_hours: Option<Json>,
    pub status: ContactStatus,
    pub is_active: bool,
    /// Display order
    pub priority: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
