//! Migration: Create facilities table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Facilities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Facilities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Facilities::Name).string().not_null())
                    .col(
                        ColumnDef::new(Facilities::Code)
                            .string_len(10)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Facilities::Description).text().null())
                    .col(ColumnDef::new(Facilities::Location).string().null())
                    .col(ColumnDef::new(Facilities::Building).string().null())
                    .col(ColumnDef::new(Facilities::Floor).string().null())
                    .col(
                        ColumnDef::new(Facilities::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Facilities::OperatingHours).json().null())
                    .col(ColumnDef::new(Facilities::ContactInfo).json().null())
                    .col(
                        ColumnDef::new(Facilities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Facilities::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_facilities_building_floor")
                    .table(Facilities::Table)
                    .col(Facilities::Building)
                    .col(Facilities::Floor)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Facilities::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Facilities {
    Table,
    Id,
    Name,
    Code,
    Description,
    Location,
    Building,
    Floor,
    #[iden = "is_active"]
    IsActive,
    #[iden = "operating_hours"]
    OperatingHours,
    #[iden = "contact_info"]
    ContactInfo,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
