//! Migration: Create concerns table

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_departments::Departments;
use super::m20250601_000002_create_users::AppUsers;
use super::m20250601_000003_create_facilities::Facilities;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Concerns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Concerns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Concerns::ReferenceNumber)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Concerns::Subject).string().not_null())
                    .col(ColumnDef::new(Concerns::Description).text().not_null())
                    .col(ColumnDef::new(Concerns::Type).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Concerns::Priority)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Concerns::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Concerns::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Concerns::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(Concerns::DepartmentId).big_integer().not_null())
                    .col(ColumnDef::new(Concerns::FacilityId).big_integer().null())
                    .col(ColumnDef::new(Concerns::AssignedTo).big_integer().null())
                    .col(ColumnDef::new(Concerns::Attachments).json().null())
                    .col(ColumnDef::new(Concerns::Metadata).json().null())
                    .col(
                        ColumnDef::new(Concerns::DueDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Concerns::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Concerns::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Concerns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Concerns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concerns_student")
                            .from(Concerns::Table, Concerns::StudentId)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concerns_department")
                            .from(Concerns::Table, Concerns::DepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concerns_facility")
                            .from(Concerns::Table, Concerns::FacilityId)
                            .to(Facilities::Table, Facilities::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concerns_assignee")
                            .from(Concerns::Table, Concerns::AssignedTo)
                            .to(AppUsers::Table, AppUsers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, cols) in [
            ("idx_concerns_status_priority", vec![Concerns::Status, Concerns::Priority]),
            ("idx_concerns_department_status", vec![Concerns::DepartmentId, Concerns::Status]),
            ("idx_concerns_student_id", vec![Concerns::StudentId]),
            ("idx_concerns_assigned_to", vec![Concerns::AssignedTo]),
            ("idx_concerns_created_at", vec![Concerns::CreatedAt]),
        ] {
            let mut index = Index::create();
            index.name(name).table(Concerns::Table).if_not_exists();
            for col in cols {
                index.col(col);
            }
            manager.create_index(index.to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Concerns::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Concerns {
    Table,
    Id,
    #[iden = "reference_number"]
    ReferenceNumber,
    Subject,
    Description,
    Type,
    Priority,
    Status,
    #[iden = "is_anonymous"]
    IsAnonymous,
    #[iden = "student_id"]
    StudentId,
    #[iden = "department_id"]
    DepartmentId,
    #[iden = "facility_id"]
    FacilityId,
    #[iden = "assigned_to"]
    AssignedTo,
    Attachments,
    Metadata,
    #[iden = "due_date"]
    DueDate,
    #[iden = "resolved_at"]
    ResolvedAt,
    #[iden = "closed_at"]
    ClosedAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
