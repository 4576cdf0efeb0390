//! Migration: Create announcement_bookmarks table

use sea_orm_migration::prelude::*;

use super::m20250601_000002_create_users::AppUsers;
use super::m20250601_000006_create_announcements::Announcements;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnnouncementBookmarks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnnouncementBookmarks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementBookmarks::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementBookmarks::AnnouncementId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementBookmarks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementBookmarks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_bookmarks_user")
                            .from(AnnouncementBookmarks::Table, AnnouncementBookmarks::UserId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_bookmarks_announcement")
                            .from(
                                AnnouncementBookmarks::Table,
                                AnnouncementBookmarks::AnnouncementId,
                            )
                            .to(Announcements::Table, Announcements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One bookmark per user and announcement
        manager
            .create_index(
                Index::create()
                    .name("idx_announcement_bookmarks_user_announcement")
                    .table(AnnouncementBookmarks::Table)
                    .col(AnnouncementBookmarks::UserId)
                    .col(AnnouncementBookmarks::AnnouncementId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AnnouncementBookmarks::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "announcement_bookmarks"]
enum AnnouncementBookmarks {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "announcement_id"]
    AnnouncementId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
