#![cfg(test)]
use async_trait::async_trait;
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use uuid::Uuid;

use common::types::GeoPoint;
use models::db::{connect_with_config, DatabaseConfig};
use models::enums::{ApprovalStatus, Role};
use models::{address, user};

use crate::errors::ServiceError;
use crate::maps::RoutingProvider;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn test_config() -> DatabaseConfig {
    let mut cfg = DatabaseConfig::from_file().unwrap_or_else(|_| DatabaseConfig::from_env());
    cfg.max_connections = cfg.max_connections.max(10);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg.acquire_timeout = std::time::Duration::from_secs(10);
    cfg
}

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    // Run migrations exactly once, with a throwaway connection
    MIGRATED
        .get_or_init(|| async {
            let db = connect_with_config(&test_config()).await.expect("connect db for migration");
            migration::Migrator::up(&db, None).await.expect("migrate up");
            drop(db);
        })
        .await;

    // Return a fresh connection for the current test's runtime
    let db = connect_with_config(&test_config()).await?;
    Ok(db)
}

/// Approved, active user with a unique email and username.
pub async fn seed_user(db: &DatabaseConnection, role: Role) -> Result<user::Model, anyhow::Error> {
    let tag = Uuid::new_v4().simple().to_string();
    Ok(user::create(db, user::NewUser {
        name: format!("{role} {}", &tag[..6]),
        email: format!("{role}{}@example.com", &tag[..12]),
        username: format!("{role}{}", &tag[..12]),
        role,
        approval_status: ApprovalStatus::Approved,
        preferred_lang: "cs".into(),
    }).await?)
}

pub async fn seed_address(db: &DatabaseConnection) -> Result<address::Model, anyhow::Error> {
    let fields = address::AddressFields::parse("Test depot", "Dlouhá 5", "Praha", "11000")?;
    Ok(address::create(db, fields, GeoPoint::new(50.09, 14.42), None).await?)
}

/// Routing stub answering every lookup with fixed values.
pub struct FixedRouting {
    point: GeoPoint,
    eta: i32,
}

impl FixedRouting {
    pub fn new(point: GeoPoint, eta: i32) -> Self { Self { point, eta } }
}

#[async_trait]
impl RoutingProvider for FixedRouting {
    async fn geocode(&self, _street: &str, _city: &str, _zip_code: &str) -> Result<Option<GeoPoint>, ServiceError> {
        Ok(Some(self.point))
    }

    async fn eta_minutes(&self, _origin: GeoPoint, _dest: GeoPoint) -> Result<Option<i32>, ServiceError> {
        Ok(Some(self.eta))
    }
}
