use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: drivers list filters on role
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::Role)
                    .to_owned(),
            )
            .await?;

        // Address: label ordering and per-creator listing
        manager
            .create_index(
                Index::create()
                    .name("idx_address_created_by")
                    .table(Address::Table)
                    .col(Address::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // Delivery: driver schedule and calendar lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_driver_date")
                    .table(Delivery::Table)
                    .col(Delivery::DriverId)
                    .col(Delivery::DeliveryDate)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_date")
                    .table(Delivery::Table)
                    .col(Delivery::DeliveryDate)
                    .to_owned(),
            )
            .await?;

        // Activity / logs: time-window scans
        manager
            .create_index(
                Index::create()
                    .name("idx_user_activity_created")
                    .table(UserActivity::Table)
                    .col(UserActivity::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_system_log_created")
                    .table(SystemLog::Table)
                    .col(SystemLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_user_role").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_address_created_by").table(Address::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_delivery_driver_date").table(Delivery::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_delivery_date").table(Delivery::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_activity_created").table(UserActivity::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_system_log_created").table(SystemLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, Role }

#[derive(DeriveIden)]
enum Address { Table, CreatedBy }

#[derive(DeriveIden)]
enum Delivery { Table, DriverId, DeliveryDate }

#[derive(DeriveIden)]
enum UserActivity { Table, CreatedAt }

#[derive(DeriveIden)]
enum SystemLog { Table, CreatedAt }
