use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;

use crate::db::DbConn;
use crate::error::Result;
use crate::models::audit_log::{self, AuditAction, ModelType};

/// Request origin recorded next to each audit entry
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One audit event before it is written
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub model_type: Option<ModelType>,
    pub model_id: Option<i64>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub origin: RequestOrigin,
}

impl AuditEntry {
    pub fn new(user_id: Option<i64>, action: AuditAction) -> Self {
        Self {
            user_id,
            action,
            model_type: None,
            model_id: None,
            old_values: None,
            new_values: None,
            metadata: None,
            origin: RequestOrigin::default(),
        }
    }

    pub fn subject(mut self, model_type: ModelType, model_id: i64) -> Self {
        self.model_type = Some(model_type);
        self.model_id = Some(model_id);
        self
    }

    pub fn old_values(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn origin(mut self, origin: &RequestOrigin) -> Self {
        self.origin = origin.clone();
        self
    }
}

/// Audit service for logging user actions
#[derive(Clone)]
pub struct AuditService {
    db: DbConn,
}

impl AuditService {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Write an audit entry. Failures are logged and swallowed so the
    /// originating request still succeeds.
    pub async fn log(&self, entry: AuditEntry) {
        if let Err(e) = self.write(entry).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }

    async fn write(&self, entry: AuditEntry) -> Result<audit_log::Model> {
        let now = chrono::Utc::now();

        let row = audit_log::ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action.to_string()),
            model_type: Set(entry.model_type.map(|t| t.to_string())),
            model_id: Set(entry.model_id),
            old_values: Set(entry.old_values),
            new_values: Set(entry.new_values),
            ip_address: Set(entry.origin.ip_address),
            user_agent: Set(entry.origin.user_agent),
            metadata: Set(entry.metadata),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(row.insert(&self.db).await?)
    }

    /// Log the creation of a record
    pub async fn log_create(
        &self,
        user_id: i64,
        model_type: ModelType,
        model_id: i64,
        new_values: serde_json::Value,
        origin: &RequestOrigin,
    ) {
        self.log(
            AuditEntry::new(Some(user_id), AuditAction::Create)
                .subject(model_type, model_id)
                .new_values(new_values)
                .origin(origin),
        )
        .await
    }

    /// Log an update with before/after snapshots
    pub async fn log_update(
        &self,
        user_id: i64,
        model_type: ModelType,
        model_id: i64,
        old_values: serde_json::Value,
        new_values: serde_json::Value,
        origin: &RequestOrigin,
    ) {
        self.log(
            AuditEntry::new(Some(user_id), AuditAction::Update)
                .subject(model_type, model_id)
                .old_values(old_values)
                .new_values(new_values)
                .origin(origin),
        )
        .await
    }

    /// Log a deletion; only the old values are kept
    pub async fn log_delete(
        &self,
        user_id: i64,
        model_type: ModelType,
        model_id: i64,
        old_values: serde_json::Value,
        origin: &RequestOrigin,
    ) {
        self.log(
            AuditEntry::new(Some(user_id), AuditAction::Delete)
                .subject(model_type, model_id)
                .old_values(old_values)
                .origin(origin),
        )
        .await
    }
}

/// Query parameters for fetching audit logs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub model_type: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

/// One page of audit logs
#[derive(Debug, Clone)]
pub struct AuditLogPage {
    pub logs: Vec<audit_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Get audit logs with filtering and pagination, newest first
pub async fn get_audit_logs(db: &DbConn, query: AuditLogQuery) -> Result<AuditLogPage> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut select = audit_log::Entity::find();

    if let Some(user_id) = query.user_id {
        select = select.filter(audit_log::Column::UserId.eq(user_id));
    }

    if let Some(action) = &query.action {
        select = select.filter(audit_log::Column::Action.eq(action.clone()));
    }

    if let Some(model_type) = &query.model_type {
        select = select.filter(audit_log::Column::ModelType.eq(model_type.clone()));
    }

    if let Some(from) = query.from {
        select = select.filter(audit_log::Column::CreatedAt.gte(from));
    }

    if let Some(to) = query.to {
        select = select.filter(audit_log::Column::CreatedAt.lte(to));
    }

    let total = select.clone().count(db).await?;

    let logs = select
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .offset(offset)
        .limit(per_page)
        .all(db)
        .await?;

    Ok(AuditLogPage {
        logs,
        total,
        page,
        per_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_delete_keeps_only_old_values() {
        let db = create_test_db().await;
        let audit = AuditService::new(db.clone());

        audit
            .log_delete(
                1,
                ModelType::User,
                7,
                json!({"email": "gone@bestlink.edu.ph"}),
                &RequestOrigin::default(),
            )
            .await;

        let rows = audit_log::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "delete");
        assert_eq!(rows[0].model_type.as_deref(), Some("user"));
        assert_eq!(rows[0].model_id, Some(7));
        assert!(rows[0].old_values.is_some());
        assert!(rows[0].new_values.is_none());
    }

    #[tokio::test]
    async fn test_audit_log_filters() {
        let db = create_test_db().await;
        let audit = AuditService::new(db.clone());
        let origin = RequestOrigin {
            ip_address: Some("10.0.0.5".to_string()),
            user_agent: Some("test-agent".to_string()),
        };

        audit
            .log(AuditEntry::new(Some(1), AuditAction::Login).origin(&origin))
            .await;
        audit
            .log_create(1, ModelType::Concern, 3, json!({"subject": "Wifi"}), &origin)
            .await;
        audit
            .log(AuditEntry::new(Some(2), AuditAction::Login))
            .await;

        let logins = get_audit_logs(
            &db,
            AuditLogQuery {
                action: Some("login".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(logins.total, 2);

        let by_user = get_audit_logs(
            &db,
            AuditLogQuery {
                user_id: Some(1),
                model_type: Some("concern".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_user.total, 1);
        assert_eq!(by_user.logs[0].ip_address.as_deref(), Some("10.0.0.5"));
    }
}
