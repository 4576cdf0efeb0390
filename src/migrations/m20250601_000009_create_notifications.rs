//! Migration: Create notifications and fcm_tokens tables

use sea_orm_migration::prelude::*;

use super::m20250601_000002_create_users::AppUsers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Notifications::Type).string_len(50).not_null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::Data).json().null())
                    .col(ColumnDef::new(Notifications::RelatedType).string_len(50).null())
                    .col(ColumnDef::new(Notifications::RelatedId).big_integer().null())
                    .col(
                        ColumnDef::new(Notifications::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Priority)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Notifications::PushSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::EmailSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::ReadAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_related")
                    .table(Notifications::Table)
                    .col(Notifications::RelatedType)
                    .col(Notifications::RelatedId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FcmTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FcmTokens::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FcmTokens::UserId).big_integer().not_null())
                    .col(ColumnDef::new(FcmTokens::Token).string().not_null())
                    .col(ColumnDef::new(FcmTokens::DeviceType).string_len(10).not_null())
                    .col(ColumnDef::new(FcmTokens::DeviceId).string().null())
                    .col(
                        ColumnDef::new(FcmTokens::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(FcmTokens::LastUsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(FcmTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FcmTokens::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fcm_tokens_user")
                            .from(FcmTokens::Table, FcmTokens::UserId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fcm_tokens_user_token")
                    .table(FcmTokens::Table)
                    .col(FcmTokens::UserId)
                    .col(FcmTokens::Token)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FcmTokens::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    Type,
    Title,
    Message,
    Data,
    #[iden = "related_type"]
    RelatedType,
    #[iden = "related_id"]
    RelatedId,
    #[iden = "read_at"]
    ReadAt,
    Priority,
    #[iden = "push_sent"]
    PushSent,
    #[iden = "email_sent"]
    EmailSent,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

#[derive(Iden)]
#[iden = "fcm_tokens"]
enum FcmTokens {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    Token,
    #[iden = "device_type"]
    DeviceType,
    #[iden = "device_id"]
    DeviceId,
    #[iden = "is_active"]
    IsActive,
    #[iden = "last_used_at"]
    LastUsedAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
