//! Migration: Create announcements and announcement_departments tables

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_departments::Departments;
use super::m20250601_000002_create_users::AppUsers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Announcements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Announcements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Announcements::Title).string().not_null())
                    .col(ColumnDef::new(Announcements::Content).text().not_null())
                    .col(ColumnDef::new(Announcements::Excerpt).string_len(500).null())
                    .col(
                        ColumnDef::new(Announcements::Type)
                            .string_len(20)
                            .not_null()
                            .default("general"),
                    )
                    .col(
                        ColumnDef::new(Announcements::Priority)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Announcements::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Announcements::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(Announcements::TargetRoles).json().null())
                    .col(
                        ColumnDef::new(Announcements::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Announcements::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Announcements::FeaturedImage).string().null())
                    .col(ColumnDef::new(Announcements::Attachments).json().null())
                    .col(
                        ColumnDef::new(Announcements::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Announcements::BookmarkCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Announcements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Announcements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcements_author")
                            .from(Announcements::Table, Announcements::AuthorId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_announcements_status_published")
                    .table(Announcements::Table)
                    .col(Announcements::Status)
                    .col(Announcements::PublishedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnnouncementDepartments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnnouncementDepartments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementDepartments::AnnouncementId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementDepartments::DepartmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_departments_announcement")
                            .from(
                                AnnouncementDepartments::Table,
                                AnnouncementDepartments::AnnouncementId,
                            )
                            .to(Announcements::Table, Announcements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_departments_department")
                            .from(
                                AnnouncementDepartments::Table,
                                AnnouncementDepartments::DepartmentId,
                            )
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_announcement_departments_unique")
                    .table(AnnouncementDepartments::Table)
                    .col(AnnouncementDepartments::AnnouncementId)
                    .col(AnnouncementDepartments::DepartmentId)
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
                    .table(AnnouncementDepartments::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Announcements::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Announcements {
    Table,
    Id,
    Title,
    Content,
    Excerpt,
    Type,
    Priority,
    Status,
    #[iden = "author_id"]
    AuthorId,
    #[iden = "target_roles"]
    TargetRoles,
    #[iden = "published_at"]
    PublishedAt,
    #[iden = "expires_at"]
    ExpiresAt,
    #[iden = "featured_image"]
    FeaturedImage,
    Attachments,
    #[iden = "view_count"]
    ViewCount,
    #[iden = "bookmark_count"]
    BookmarkCount,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

#[derive(Iden)]
#[iden = "announcement_departments"]
enum AnnouncementDepartments {
    Table,
    Id,
    #[iden = "announcement_id"]
    AnnouncementId,
    #[iden = "department_id"]
    DepartmentId,
}
