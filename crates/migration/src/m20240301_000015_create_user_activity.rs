//! Create `user_activity` table: append-only audit of user actions.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserActivity::Table)
                    .if_not_exists()
                    .col(big_integer(UserActivity::Id).auto_increment().primary_key())
                    .col(uuid(UserActivity::UserId).not_null())
                    .col(string_len(UserActivity::Action, 64).not_null())
                    .col(ColumnDef::new(UserActivity::Details).text().null())
                    .col(timestamp_with_time_zone(UserActivity::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_activity_user")
                            .from(UserActivity::Table, UserActivity::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UserActivity::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UserActivity { Table, Id, UserId, Action, Details, CreatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
