use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::db::DbConn;
use crate::error::Result;
use crate::models::{announcement, announcement_bookmark, announcement_department};
use crate::schemas::user::{departments_by_id, users_by_id, DepartmentSummary, UserSummary};

/// Announcement as seen by one user
#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementResponse {
    #[serde(flatten)]
    pub announcement: announcement::Model,
    pub author: Option<UserSummary>,
    pub target_departments: Vec<DepartmentSummary>,
    pub is_bookmarked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarked_at: Option<DateTime<Utc>>,
}

impl AnnouncementResponse {
    /// Attach authors, target departments and the viewer's bookmark state
    pub async fn load_many(
        db: &DbConn,
        announcements: Vec<announcement::Model>,
        viewer_id: i64,
    ) -> Result<Vec<Self>> {
        let ids: Vec<i64> = announcements.iter().map(|a| a.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let authors = users_by_id(db, announcements.iter().map(|a| a.author_id)).await?;

        let targets = announcement_department::Entity::find()
            .filter(announcement_department::Column::AnnouncementId.is_in(ids.clone()))
            .all(db)
            .await?;
        let departments = departments_by_id(db, targets.iter().map(|t| t.department_id)).await?;
        let mut targets_by_announcement: HashMap<i64, Vec<DepartmentSummary>> = HashMap::new();
        for target in &targets {
            if let Some(department) = departments.get(&target.department_id) {
                targets_by_announcement
                    .entry(target.announcement_id)
                    .or_default()
                    .push(DepartmentSummary::from(department));
            }
        }

        let bookmarks: HashMap<i64, DateTime<Utc>> = announcement_bookmark::Entity::find()
            .filter(announcement_bookmark::Column::UserId.eq(viewer_id))
            .filter(announcement_bookmark::Column::AnnouncementId.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|b| (b.announcement_id, b.created_at))
            .collect();

        Ok(announcements
            .into_iter()
            .map(|a| {
                let bookmarked_at = bookmarks.get(&a.id).copied();
                Self {
                    author: authors.get(&a.author_id).map(UserSummary::from),
                    target_departments: targets_by_announcement.remove(&a.id).unwrap_or_default(),
                    is_bookmarked: bookmarked_at.is_some(),
                    bookmarked_at: None,
                    announcement: a,
                }
            })
            .collect())
    }

    pub async fn load(
        db: &DbConn,
        announcement: announcement::Model,
        viewer_id: i64,
    ) -> Result<Self> {
        let mut responses = Self::load_many(db, vec![announcement], viewer_id).await?;
        Ok(responses.remove(0))
    }

    pub fn with_bookmarked_at(mut self, at: DateTime<Utc>) -> Self {
        self.is_bookmarked = true;
        self.bookmarked_at = Some(at);
        self
    }
}
