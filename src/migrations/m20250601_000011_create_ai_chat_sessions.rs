//! Migration: Create ai_chat_sessions table

use sea_orm_migration::prelude::*;

use super::m20250601_000002_create_users::AppUsers;
use super::m20250601_000004_create_concerns::Concerns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiChatSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AiChatSessions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AiChatSessions::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(AiChatSessions::SessionId)
                            .string_len(36)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AiChatSessions::Context)
                            .string_len(20)
                            .not_null()
                            .default("general"),
                    )
                    .col(
                        ColumnDef::new(AiChatSessions::RelatedConcernId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(AiChatSessions::Messages).json().not_null())
                    .col(ColumnDef::new(AiChatSessions::Metadata).json().null())
                    .col(
                        ColumnDef::new(AiChatSessions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AiChatSessions::LastActivityAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AiChatSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AiChatSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_chat_sessions_user")
                            .from(AiChatSessions::Table, AiChatSessions::UserId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_chat_sessions_concern")
                            .from(AiChatSessions::Table, AiChatSessions::RelatedConcernId)
                            .to(Concerns::Table, Concerns::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_chat_sessions_user_active")
                    .table(AiChatSessions::Table)
                    .col(AiChatSessions::UserId)
                    .col(AiChatSessions::IsActive)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AiChatSessions::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
#[iden = "ai_chat_sessions"]
enum AiChatSessions {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "session_id"]
    SessionId,
    Context,
    #[iden = "related_concern_id"]
    RelatedConcernId,
    Messages,
    Metadata,
    #[iden = "is_active"]
    IsActive,
    #[iden = "last_activity_at"]
    LastActivityAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
