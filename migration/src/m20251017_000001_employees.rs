use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    EmployeeId,
    Name,
    Email,
    Address1,
    Address2,
    Role,
    Mobile,
    AltMobile,
    Latitude,
    Longitude,
    PhysicalAddress,
    UserStatus,
    Username,
    Password,
    ActiveTimestamp,
    CurrentDeviceId,
    CurrentSession,
}

const EMPLOYEE_ID_INDEX: &str = "idx_employees_employee_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employees::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Employees::EmployeeId).big_integer().not_null())
                    .col(ColumnDef::new(Employees::Name).string().not_null())
                    .col(ColumnDef::new(Employees::Email).string().not_null())
                    .col(ColumnDef::new(Employees::Address1).string().not_null())
                    .col(ColumnDef::new(Employees::Address2).string())
                    .col(ColumnDef::new(Employees::Role).string().not_null())
                    .col(ColumnDef::new(Employees::Mobile).string().not_null())
                    .col(ColumnDef::new(Employees::AltMobile).string())
                    .col(ColumnDef::new(Employees::Latitude).double().not_null())
                    .col(ColumnDef::new(Employees::Longitude).double().not_null())
                    .col(ColumnDef::new(Employees::PhysicalAddress).string().not_null())
                    .col(
                        ColumnDef::new(Employees::UserStatus)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Employees::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employees::Password).text().not_null())
                    .col(
                        ColumnDef::new(Employees::ActiveTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Employees::CurrentDeviceId)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Employees::CurrentSession)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(EMPLOYEE_ID_INDEX)
                    .table(Employees::Table)
                    .col(Employees::EmployeeId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(EMPLOYEE_ID_INDEX)
                    .table(Employees::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Employees::Table).if_exists().to_owned())
            .await
    }
}
