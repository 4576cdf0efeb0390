use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::SettingType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub key: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub value: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub group: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Decode the stored string according to the declared type
    pub fn typed_value(&self) -> Json {
        let Some(raw) = self.value.as_deref() else {
            return Json::Null;
        };
        match self.setting_type {
            SettingType::Boolean => Json::Bool(matches!(raw, "1" | "true" | "on" | "yes")),
            SettingType::Integer => raw
                .parse::<i64>()
                .map(Json::from)
                .unwrap_or(Json::Null),
            SettingType::Json => serde_json::from_str(raw).unwrap_or(Json::Null),
            SettingType::Text => Json::String(raw.to_string()),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
