//! Runtime switches stored in `system_settings`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::error::{AppError, Result};
use crate::models::enums::SettingType;
use crate::models::system_setting;

pub const MAINTENANCE_MODE: &str = "maintenance_mode";
pub const AI_ENABLED: &str = "ai_enabled";
pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
pub const ANNOUNCEMENTS_ENABLED: &str = "announcements_enabled";

/// Read a boolean setting, falling back to `default` when it is missing
pub async fn get_bool<C: ConnectionTrait>(conn: &C, key: &str, default: bool) -> Result<bool> {
    let setting = system_setting::Entity::find()
        .filter(system_setting::Column::Key.eq(key))
        .one(conn)
        .await?;

    Ok(match setting {
        Some(s) => s.typed_value().as_bool().unwrap_or(default),
        None => default,
    })
}

/// All settings, grouped by `group` then ordered by key
pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<system_setting::Model>> {
    Ok(system_setting::Entity::find()
        .order_by_asc(system_setting::Column::Group)
        .order_by_asc(system_setting::Column::Key)
        .all(conn)
        .await?)
}

/// Encode a JSON value as the string stored for a setting of `setting_type`
pub fn encode_value(
    setting_type: SettingType,
    value: &serde_json::Value,
) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }

    let encoded = match setting_type {
        SettingType::Boolean => match value {
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::String(s) if matches!(s.as_str(), "true" | "false" | "1" | "0") => {
                (s == "true" || s == "1").to_string()
            }
            _ => return Err(AppError::BadRequest("Expected a boolean value".to_string())),
        },
        SettingType::Integer => match value {
            serde_json::Value::Number(n) if n.is_i64() => n.to_string(),
            serde_json::Value::String(s) if s.parse::<i64>().is_ok() => s.clone(),
            _ => return Err(AppError::BadRequest("Expected an integer value".to_string())),
        },
        SettingType::Json => value.to_string(),
        SettingType::Text => match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };

    Ok(Some(encoded))
}

/// Set the value of an existing setting
pub async fn update<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    value: &serde_json::Value,
) -> Result<system_setting::Model> {
    let existing = system_setting::Entity::find()
        .filter(system_setting::Column::Key.eq(key))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Setting '{}' not found", key)))?;

    let encoded = encode_value(existing.setting_type, value)?;

    let mut model: system_setting::ActiveModel = existing.into();
    model.value = Set(encoded);
    model.updated_at = Set(Utc::now());
    Ok(model.update(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_seeded_switches() {
        let db = create_test_db().await;

        assert!(!get_bool(&db, MAINTENANCE_MODE, true).await.unwrap());
        assert!(get_bool(&db, AI_ENABLED, false).await.unwrap());
        assert!(get_bool(&db, "missing_key", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_boolean_setting() {
        let db = create_test_db().await;

        let updated = update(&db, AI_ENABLED, &json!(false)).await.unwrap();
        assert_eq!(updated.value.as_deref(), Some("false"));
        assert!(!get_bool(&db, AI_ENABLED, true).await.unwrap());

        assert!(update(&db, AI_ENABLED, &json!("maybe")).await.is_err());
        assert!(matches!(
            update(&db, "nope", &json!(true)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(
            encode_value(SettingType::Integer, &json!(25)).unwrap().as_deref(),
            Some("25")
        );
        assert_eq!(
            encode_value(SettingType::Json, &json!({"a": 1})).unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(encode_value(SettingType::Text, &json!(null)).unwrap(), None);
        assert!(encode_value(SettingType::Integer, &json!("x")).is_err());
    }
}
