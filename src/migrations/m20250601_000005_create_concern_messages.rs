//! Migration: Create concern_messages table

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
                    .table(ConcernMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConcernMessages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConcernMessages::ConcernId).big_integer().not_null())
                    .col(ColumnDef::new(ConcernMessages::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(ConcernMessages::Message).text().not_null())
                    .col(
                        ColumnDef::new(ConcernMessages::Type)
                            .string_len(20)
                            .not_null()
                            .default("message"),
                    )
                    .col(ColumnDef::new(ConcernMessages::Attachments).json().null())
                    .col(ColumnDef::new(ConcernMessages::Metadata).json().null())
                    .col(
                        ColumnDef::new(ConcernMessages::IsInternal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ConcernMessages::IsAiGenerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ConcernMessages::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ConcernMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConcernMessages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concern_messages_concern")
                            .from(ConcernMessages::Table, ConcernMessages::ConcernId)
                            .to(Concerns::Table, Concerns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concern_messages_author")
                            .from(ConcernMessages::Table, ConcernMessages::AuthorId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_concern_messages_concern_created")
                    .table(ConcernMessages::Table)
                    .col(ConcernMessages::ConcernId)
                    .col(ConcernMessages::CreatedAt)
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
                    .table(ConcernMessages::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "concern_messages"]
enum ConcernMessages {
    Table,
    Id,
    #[iden = "concern_id"]
    ConcernId,
    #[iden = "author_id"]
    AuthorId,
    Message,
    Type,
    Attachments,
    Metadata,
    #[iden = "is_internal"]
    IsInternal,
    #[iden = "is_ai_generated"]
    IsAiGenerated,
    #[iden = "read_at"]
    ReadAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
