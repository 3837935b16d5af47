pub mod errors;
pub mod db;
pub mod enums;
pub mod user;
pub mod user_credentials;
pub mod address;
pub mod delivery;
pub mod user_activity;
pub mod system_log;

pub use enums::{ApprovalStatus, DeliveryStatus, Role};

#[cfg(test)]
mod tests;
