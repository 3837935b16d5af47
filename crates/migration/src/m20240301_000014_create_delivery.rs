//! Create `delivery` table linking a driver, an address and a time slot.
//!
//! Deleting an address that still has deliveries is refused (RESTRICT).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Delivery::Table)
                    .if_not_exists()
                    .col(uuid(Delivery::Id).primary_key())
                    .col(uuid(Delivery::DriverId).not_null())
                    .col(uuid(Delivery::AddressId).not_null())
                    .col(date(Delivery::DeliveryDate).not_null())
                    .col(time(Delivery::StartTime).not_null())
                    .col(time(Delivery::EndTime).not_null())
                    .col(string_len(Delivery::Status, 16).not_null().default("pending"))
                    .col(ColumnDef::new(Delivery::EtaMinutes).integer().null())
                    .col(ColumnDef::new(Delivery::ReturnEtaMinutes).integer().null())
                    .col(ColumnDef::new(Delivery::Notes).text().null())
                    .col(ColumnDef::new(Delivery::AssignedBy).uuid().null())
                    .col(timestamp_with_time_zone(Delivery::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Delivery::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Delivery::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_driver")
                            .from(Delivery::Table, Delivery::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_address")
                            .from(Delivery::Table, Delivery::AddressId)
                            .to(Address::Table, Address::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_assigned_by")
                            .from(Delivery::Table, Delivery::AssignedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Delivery::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Delivery {
    Table,
    Id,
    DriverId,
    AddressId,
    DeliveryDate,
    StartTime,
    EndTime,
    Status,
    EtaMinutes,
    ReturnEtaMinutes,
    Notes,
    AssignedBy,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Address { Table, Id }
