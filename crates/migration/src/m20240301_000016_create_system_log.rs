//! Create `system_log` table for application-level events (not request logs).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemLog::Table)
                    .if_not_exists()
                    .col(big_integer(SystemLog::Id).auto_increment().primary_key())
                    .col(string_len(SystemLog::Level, 16).not_null())
                    .col(string_len(SystemLog::EventType, 64).not_null())
                    .col(ColumnDef::new(SystemLog::Details).text().null())
                    .col(timestamp_with_time_zone(SystemLog::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SystemLog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SystemLog { Table, Id, Level, EventType, Details, CreatedAt }
