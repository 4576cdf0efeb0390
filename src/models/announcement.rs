use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{AnnouncementStatus, AnnouncementType, Priority};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub excerpt: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub announcement_type: AnnouncementType,
    pub priority: Priority,
    pub status: AnnouncementStatus,
    pub author_id: i64,
    /// Stored for the frontend; visibility is decided by target departments
    pub target_roles: Option<Json>,
    pub published_at: Option<DateTimeUtc>,
    pub expires_at: Option<DateTimeUtc>,
    pub featured_image: Option<String>,
    pub attachments: Option<Json>,
    pub view_count: i32,
    pub bookmark_count: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Published and inside its publish/expiry window
    pub fn is_visible_at(&self, now: DateTimeUtc) -> bool {
        self.status == AnnouncementStatus::Published
            && self.published_at.is_some_and(|p| p <= now)
            && self.expires_at.is_none_or(|e| e > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::announcement_bookmark::Entity")]
    Bookmarks,
    #[sea_orm(has_many = "super::announcement_department::Entity")]
    TargetDepartments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::announcement_bookmark::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookmarks.def()
    }
}

impl Related<super::announcement_department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TargetDepartments.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        super::announcement_department::Relation::Department.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::announcement_department::Relation::Announcement.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn announcement(status: AnnouncementStatus) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            title: "Enrollment".to_string(),
            content: "Enrollment opens Monday".to_string(),
            excerpt: None,
            announcement_type: AnnouncementType::Academic,
            priority: Priority::Medium,
            status,
            author_id: 1,
            target_roles: None,
            published_at: Some(now - Duration::hours(1)),
            expires_at: None,
            featured_image: None,
            attachments: None,
            view_count: 0,
            bookmark_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_visibility_window() {
        let now = Utc::now();
        let mut a = announcement(AnnouncementStatus::Published);
        assert!(a.is_visible_at(now));

        a.expires_at = Some(now - Duration::minutes(1));
        assert!(!a.is_visible_at(now));

        a.expires_at = None;
        a.published_at = Some(now + Duration::days(1));
        assert!(!a.is_visible_at(now));
    }

    #[test]
    fn test_drafts_are_hidden() {
        assert!(!announcement(AnnouncementStatus::Draft).is_visible_at(Utc::now()));
        assert!(!announcement(AnnouncementStatus::Archived).is_visible_at(Utc::now()));
    }
}
