use sea_orm::entity::prelude::*;
use uuid::Uuid;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::enums::DeliveryStatus;
use crate::errors::ModelError;
use crate::{address, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub driver_id: Uuid,
    pub address_id: Uuid,
    pub delivery_date: Date,
    pub start_time: Time,
    pub end_time: Time,
    pub status: DeliveryStatus,
    pub eta_minutes: Option<i32>,
    pub return_eta_minutes: Option<i32>,
    pub notes: Option<String>,
    pub assigned_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Driver, Address, AssignedBy }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Driver => Entity::belongs_to(user::Entity).from(Column::DriverId).to(user::Column::Id).into(),
            Relation::Address => Entity::belongs_to(address::Entity).from(Column::AddressId).to(address::Column::Id).into(),
            Relation::AssignedBy => Entity::belongs_to(user::Entity).from(Column::AssignedBy).to(user::Column::Id).into(),
        }
    }
}

impl Related<address::Entity> for Entity {
    fn to() -> RelationDef { Relation::Address.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Minutes from creation to completion. Falls back to the last update
    /// for rows completed before `completed_at` was tracked.
    pub fn processing_minutes(&self) -> Option<i64> {
        if self.status != DeliveryStatus::Completed {
            return None;
        }
        let end = self.completed_at.unwrap_or(self.updated_at);
        Some((end - self.created_at).num_minutes())
    }
}

pub fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<(), ModelError> {
    if start >= end {
        return Err(ModelError::Validation("start_time must be before end_time".into()));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part which is ignored.
pub fn parse_date(s: &str) -> Result<NaiveDate, ModelError> {
    let s = s.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ModelError::Validation(format!("invalid date: {s}")))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime, ModelError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| ModelError::Validation(format!("invalid time: {s}")))
}
