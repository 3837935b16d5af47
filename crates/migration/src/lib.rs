//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000011_create_user;
mod m20240301_000012_create_user_credentials;
mod m20240301_000013_create_address;
mod m20240301_000014_create_delivery;
mod m20240301_000015_create_user_activity;
mod m20240301_000016_create_system_log;
mod m20240301_000002_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000011_create_user::Migration),
            Box::new(m20240301_000012_create_user_credentials::Migration),
            Box::new(m20240301_000013_create_address::Migration),
            Box::new(m20240301_000014_create_delivery::Migration),
            Box::new(m20240301_000015_create_user_activity::Migration),
            Box::new(m20240301_000016_create_system_log::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000002_add_indexes::Migration),
        ]
    }
}
