//! In-app notifications with optional push delivery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde_json::json;

use crate::db::DbConn;
use crate::error::Result;
use crate::models::enums::{ConcernStatus, Priority};
use crate::models::{announcement, announcement_department, concern, fcm_token, notification, user};
use crate::services::settings;

/// Payload of a single push message
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// FCM only accepts string values in the data map
    pub data: HashMap<String, String>,
}

/// Result of delivering to one device token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The provider no longer knows the token; it should be deactivated
    InvalidToken,
    Failed(String),
}

/// Trait for push providers
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> PushOutcome;
}

/// A notification about to be created
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
    pub priority: Priority,
}

impl NewNotification {
    pub fn new(
        notification_type: &str,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: notification_type.to_string(),
            title: title.into(),
            message: message.into(),
            data: None,
            related_type: None,
            related_id: None,
            priority: Priority::default(),
        }
    }

    pub fn related(mut self, related_type: &str, related_id: i64) -> Self {
        self.related_type = Some(related_type.to_string());
        self.related_id = Some(related_id);
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    fn push_message(&self, notification_id: i64) -> PushMessage {
        let mut data = HashMap::new();
        data.insert("notification_id".to_string(), notification_id.to_string());
        data.insert("type".to_string(), self.notification_type.clone());
        if let (Some(t), Some(id)) = (&self.related_type, self.related_id) {
            data.insert("related_type".to_string(), t.clone());
            data.insert("related_id".to_string(), id.to_string());
        }
        if let Some(serde_json::Value::Object(extra)) = &self.data {
            for (key, value) in extra {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                data.entry(key.clone()).or_insert(value);
            }
        }

        PushMessage {
            title: self.title.clone(),
            body: self.message.clone(),
            data,
        }
    }
}

/// Notification service that stores notifications and pushes them to devices
#[derive(Clone)]
pub struct NotificationService {
    db: DbConn,
    push: Option<Arc<dyn PushProvider>>,
}

impl NotificationService {
    pub fn new(db: DbConn, push: Option<Arc<dyn PushProvider>>) -> Self {
        Self { db, push }
    }

    pub fn push_configured(&self) -> bool {
        self.push.is_some()
    }

    /// Create a notification for one user and push it to their devices
    pub async fn notify_user(
        &self,
        user_id: i64,
        new: &NewNotification,
    ) -> Result<notification::Model> {
        let now = Utc::now();

        let created = notification::ActiveModel {
            user_id: Set(user_id),
            notification_type: Set(new.notification_type.clone()),
            title: Set(new.title.clone()),
            message: Set(new.message.clone()),
            data: Set(new.data.clone()),
            related_type: Set(new.related_type.clone()),
            related_id: Set(new.related_id),
            read_at: Set(None),
            priority: Set(new.priority),
            push_sent: Set(false),
            email_sent: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        let delivered = self
            .push_to_user(user_id, &new.push_message(created.id))
            .await?;

        if delivered == 0 {
            return Ok(created);
        }

        let mut model: notification::ActiveModel = created.into();
        model.push_sent = Set(true);
        Ok(model.update(&self.db).await?)
    }

    /// Fan a notification out to several users. Failures are logged per user.
    pub async fn notify_users(&self, user_ids: &[i64], new: &NewNotification) -> usize {
        let mut sent = 0;
        for &user_id in user_ids {
            match self.notify_user(user_id, new).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    tracing::warn!("Failed to notify user {}: {}", user_id, e);
                }
            }
        }
        sent
    }

    /// Push to every active device of a user, returning the number of deliveries
    pub async fn push_to_user(&self, user_id: i64, message: &PushMessage) -> Result<usize> {
        let Some(push) = &self.push else {
            return Ok(0);
        };

        if !settings::get_bool(&self.db, settings::NOTIFICATIONS_ENABLED, true).await? {
            tracing::debug!("Push notifications disabled by settings");
            return Ok(0);
        }

        let tokens = fcm_token::Entity::find()
            .filter(fcm_token::Column::UserId.eq(user_id))
            .filter(fcm_token::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        let mut delivered = 0;
        for token in tokens {
            match push.send(&token.token, message).await {
                PushOutcome::Delivered => {
                    delivered += 1;
                    fcm_token::Entity::update_many()
                        .col_expr(fcm_token::Column::LastUsedAt, Expr::value(Utc::now()))
                        .filter(fcm_token::Column::Id.eq(token.id))
                        .exec(&self.db)
                        .await?;
                }
                PushOutcome::InvalidToken => {
                    tracing::info!("Deactivating unregistered FCM token {}", token.id);
                    fcm_token::Entity::update_many()
                        .col_expr(fcm_token::Column::IsActive, Expr::value(false))
                        .filter(fcm_token::Column::Id.eq(token.id))
                        .exec(&self.db)
                        .await?;
                }
                PushOutcome::Failed(reason) => {
                    tracing::warn!("Push to token {} failed: {}", token.id, reason);
                }
            }
        }

        Ok(delivered)
    }

    /// Tell the owner that their concern changed status
    pub async fn concern_status_changed(
        &self,
        concern: &concern::Model,
        old_status: ConcernStatus,
        new_status: ConcernStatus,
    ) {
        let new = NewNotification::new(
            "concern_update",
            "Concern status updated",
            format!(
                "Your concern {} is now {}",
                concern.reference_number,
                new_status.as_str().replace('_', " ")
            ),
        )
        .related("concern", concern.id)
        .data(json!({
            "reference_number": concern.reference_number,
            "old_status": old_status,
            "new_status": new_status,
        }))
        .priority(concern.priority);

        self.notify_users(&[concern.student_id], &new).await;
    }

    /// Tell the assignee and the owner about an assignment
    pub async fn concern_assigned(&self, concern: &concern::Model, assignee: &user::Model) {
        let to_assignee = NewNotification::new(
            "concern_assigned",
            "New concern assigned",
            format!(
                "Concern {} \"{}\" was assigned to you",
                concern.reference_number, concern.subject
            ),
        )
        .related("concern", concern.id)
        .data(json!({ "reference_number": concern.reference_number }))
        .priority(concern.priority);
        self.notify_users(&[assignee.id], &to_assignee).await;

        if concern.student_id != assignee.id {
            let to_owner = NewNotification::new(
                "concern_update",
                "Concern assigned",
                format!(
                    "Your concern {} was assigned to {}",
                    concern.reference_number, assignee.name
                ),
            )
            .related("concern", concern.id)
            .data(json!({ "reference_number": concern.reference_number }));
            self.notify_users(&[concern.student_id], &to_owner).await;
        }
    }

    /// Tell the owner about a new reply from staff
    pub async fn concern_message_posted(&self, concern: &concern::Model, author: &user::Model) {
        if author.id == concern.student_id {
            return;
        }

        let new = NewNotification::new(
            "concern_message",
            "New reply on your concern",
            format!("{} replied to concern {}", author.name, concern.reference_number),
        )
        .related("concern", concern.id)
        .data(json!({ "reference_number": concern.reference_number }));

        self.notify_users(&[concern.student_id], &new).await;
    }

    /// Notify the audience of a newly published announcement
    pub async fn announcement_published(&self, announcement: &announcement::Model) {
        let recipients = match self.announcement_audience(announcement).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    "Failed to resolve audience of announcement {}: {}",
                    announcement.id,
                    e
                );
                return;
            }
        };

        let message = announcement
            .excerpt
            .clone()
            .unwrap_or_else(|| excerpt(&announcement.content, 150));

        let new = NewNotification::new("announcement", announcement.title.clone(), message)
            .related("announcement", announcement.id)
            .priority(announcement.priority);

        let sent = self.notify_users(&recipients, &new).await;
        tracing::info!(
            "Announcement {} delivered to {} users",
            announcement.id,
            sent
        );
    }

    async fn announcement_audience(&self, announcement: &announcement::Model) -> Result<Vec<i64>> {
        let department_ids: Vec<i64> = announcement_department::Entity::find()
            .select_only()
            .column(announcement_department::Column::DepartmentId)
            .filter(announcement_department::Column::AnnouncementId.eq(announcement.id))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut query = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::Id.ne(announcement.author_id));

        if !department_ids.is_empty() {
            query = query.filter(user::Column::DepartmentId.is_in(department_ids));
        }

        Ok(query.into_tuple().all(&self.db).await?)
    }
}

/// First `max` characters of `text`, with an ellipsis when cut
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_db, insert_user};
    use crate::models::enums::{DeviceType, Role};
    use parking_lot::Mutex;

    /// Records every push and rejects tokens starting with "dead"
    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<(String, PushMessage)>>,
    }

    #[async_trait]
    impl PushProvider for RecordingPush {
        async fn send(&self, token: &str, message: &PushMessage) -> PushOutcome {
            if token.starts_with("dead") {
                return PushOutcome::InvalidToken;
            }
            self.sent.lock().push((token.to_string(), message.clone()));
            PushOutcome::Delivered
        }
    }

    async fn add_token(db: &DbConn, user_id: i64, token: &str) {
        let now = Utc::now();
        fcm_token::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_string()),
            device_type: Set(DeviceType::Android),
            device_id: Set(None),
            is_active: Set(true),
            last_used_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_notify_without_push_provider() {
        let db = create_test_db().await;
        let student = insert_user(&db, "s@bestlink.edu.ph", Role::Student, Some(2)).await;
        let service = NotificationService::new(db.clone(), None);

        let created = service
            .notify_user(student.id, &NewNotification::new("test", "Hello", "World"))
            .await
            .unwrap();

        assert_eq!(created.user_id, student.id);
        assert!(!created.push_sent);
        assert!(created.read_at.is_none());
    }

    #[tokio::test]
    async fn test_push_marks_sent_and_drops_dead_tokens() {
        let db = create_test_db().await;
        let student = insert_user(&db, "s@bestlink.edu.ph", Role::Student, Some(2)).await;
        add_token(&db, student.id, "live-token").await;
        add_token(&db, student.id, "dead-token").await;

        let push = Arc::new(RecordingPush::default());
        let service = NotificationService::new(db.clone(), Some(push.clone()));

        let created = service
            .notify_user(
                student.id,
                &NewNotification::new("concern_update", "Status", "Resolved").related("concern", 9),
            )
            .await
            .unwrap();

        assert!(created.push_sent);
        let sent = push.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "live-token");
        assert_eq!(sent[0].1.data.get("related_id").map(String::as_str), Some("9"));
        drop(sent);

        let dead = fcm_token::Entity::find()
            .filter(fcm_token::Column::Token.eq("dead-token"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!dead.is_active);
    }

    #[tokio::test]
    async fn test_push_respects_notifications_setting() {
        let db = create_test_db().await;
        let student = insert_user(&db, "s@bestlink.edu.ph", Role::Student, Some(2)).await;
        add_token(&db, student.id, "live-token").await;
        settings::update(&db, settings::NOTIFICATIONS_ENABLED, &json!(false))
            .await
            .unwrap();

        let push = Arc::new(RecordingPush::default());
        let service = NotificationService::new(db.clone(), Some(push.clone()));

        let created = service
            .notify_user(student.id, &NewNotification::new("test", "Hello", "World"))
            .await
            .unwrap();

        assert!(!created.push_sent);
        assert!(push.sent.lock().is_empty());
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
    }
}
