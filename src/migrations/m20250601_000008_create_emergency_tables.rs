//! Migration: Create emergency_contacts and emergency_protocols tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmergencyContacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmergencyContacts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmergencyContacts::Name).string().not_null())
                    .col(ColumnDef::new(EmergencyContacts::Type).string_len(50).not_null())
                    .col(ColumnDef::new(EmergencyContacts::Phone).string_len(32).not_null())
                    .col(ColumnDef::new(EmergencyContacts::Email).string().null())
                    .col(ColumnDef::new(EmergencyContacts::Location).string().null())
                    .col(ColumnDef::new(EmergencyContacts::Description).text().null())
                    .col(ColumnDef::new(EmergencyContacts::OperatingHours).json().null())
                    .col(
                        ColumnDef::new(EmergencyContacts::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmergencyProtocols::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmergencyProtocols::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmergencyProtocols::Title).string().not_null())
                    .col(ColumnDef::new(EmergencyProtocols::Type).string_len(50).not_null())
                    .col(ColumnDef::new(EmergencyProtocols::Description).text().not_null())
                    .col(ColumnDef::new(EmergencyProtocols::Steps).json().not_null())
                    .col(ColumnDef::new(EmergencyProtocols::Icon).string().null())
                    .col(
                        ColumnDef::new(EmergencyProtocols::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EmergencyProtocols::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EmergencyProtocols::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmergencyProtocols::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emergency_contacts_type_active")
                    .table(EmergencyContacts::Table)
                    .col(EmergencyContacts::Type)
                    .col(EmergencyContacts::IsActive)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emergency_protocols_type_active")
                    .table(EmergencyProtocols::Table)
                    .col(EmergencyProtocols::Type)
                    .col(EmergencyProtocols::IsActive)
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
                    .table(EmergencyProtocols::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(EmergencyContacts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "emergency_contacts"]
enum EmergencyContacts {
    Table,
    Id,
    Name,
    Type,
    Phone,
    Email,
    Location,
    Description,
    #[iden = "operating_hours"]
    OperatingHours,
    Status,
    #[iden = "is_active"]
    IsActive,
    Priority,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

#[derive(Iden)]
#[iden = "emergency_protocols"]
enum EmergencyProtocols {
    Table,
    Id,
    Title,
    Type,
    Description,
    Steps,
    Icon,
    Priority,
    #[iden = "is_active"]
    IsActive,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
