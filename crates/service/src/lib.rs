//! Service layer providing the business operations behind the HTTP API.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::enums::Role;

pub mod errors;
pub mod metrics;
pub mod maps;
pub mod auth;
pub mod user_service;
pub mod address_service;
pub mod delivery_service;
pub mod analytics_service;
pub mod activity_service;
#[cfg(test)]
pub mod test_support;

pub use errors::{ServiceError, ServiceResult};

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}
