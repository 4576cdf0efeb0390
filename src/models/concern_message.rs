use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::MessageType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "concern_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub concern_id: i64,
    pub author_id: i64,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub attachments: Option<Json>,
    pub metadata: Option<Json>,
    /// Visible to staff only
    pub is_internal: bool,
    pub is_ai_generated: bool,
    pub read_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::concern::Entity",
        from = "Column::ConcernId",
        to = "super::concern::Column::Id",
        on_delete = "Cascade"
    )]
    Concern,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::concern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Concern.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
