//! Migration: Create app_users table

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_departments::Departments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AppUsers::StudentId)
                            .string_len(20)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AppUsers::EmployeeId)
                            .string_len(20)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AppUsers::Name).string().not_null())
                    .col(
                        ColumnDef::new(AppUsers::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AppUsers::Password).string().not_null())
                    .col(
                        ColumnDef::new(AppUsers::Role)
                            .string_len(20)
                            .not_null()
                            .default("student"),
                    )
                    .col(ColumnDef::new(AppUsers::DepartmentId).big_integer().null())
                    .col(ColumnDef::new(AppUsers::Phone).string_len(32).null())
                    .col(ColumnDef::new(AppUsers::Avatar).string().null())
                    .col(ColumnDef::new(AppUsers::Preferences).json().null())
                    .col(
                        ColumnDef::new(AppUsers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AppUsers::TokenVersion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AppUsers::LastLoginAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AppUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_users_department")
                            .from(AppUsers::Table, AppUsers::DepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_users_role_active")
                    .table(AppUsers::Table)
                    .col(AppUsers::Role)
                    .col(AppUsers::IsActive)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_users_department_id")
                    .table(AppUsers::Table)
                    .col(AppUsers::DepartmentId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppUsers::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
#[iden = "app_users"]
pub enum AppUsers {
    Table,
    Id,
    #[iden = "student_id"]
    StudentId,
    #[iden = "employee_id"]
    EmployeeId,
    Name,
    Email,
    Password,
    Role,
    #[iden = "department_id"]
    DepartmentId,
    Phone,
    Avatar,
    Preferences,
    #[iden = "is_active"]
    IsActive,
    #[iden = "token_version"]
    TokenVersion,
    #[iden = "last_login_at"]
    LastLoginAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
