//! Create `user` table.
//!
//! Role and approval status are stored as lower-case strings.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Name, 128).not_null())
                    .col(string_len(User::Email, 255).unique_key().not_null())
                    .col(string_len(User::Username, 64).unique_key().not_null())
                    .col(string_len(User::Role, 16).not_null())
                    .col(boolean(User::Active).not_null().default(true))
                    .col(string_len(User::ApprovalStatus, 16).not_null().default("pending"))
                    .col(string_len(User::PreferredLang, 8).not_null().default("cs"))
                    .col(
                        ColumnDef::new(User::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Name,
    Email,
    Username,
    Role,
    Active,
    ApprovalStatus,
    PreferredLang,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}
