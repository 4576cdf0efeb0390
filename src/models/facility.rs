use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub building: Option<String>,
    pub floor: Option<String>,
    pub is_active: bool,
    pub operating_hours: Option<Json>,
    pub contact_info: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::concern::Entity")]
    Concerns,
}

impl Related<super::concern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Concerns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
