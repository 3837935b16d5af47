//! Audit trail for user actions and system events.
//!
//! Tracking is best effort: write failures are logged and swallowed so they
//! never fail the request that triggered them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use models::system_log::{self, LogLevel};
use models::user_activity;

use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Per-day counts, newest first.
pub fn daily_counts(events: &[user_activity::Model]) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for e in events {
        *by_day.entry(e.created_at.date_naive()).or_default() += 1;
    }
    by_day.into_iter().rev().map(|(date, count)| DailyCount { date, count }).collect()
}

fn render_details(details: Option<serde_json::Value>) -> Option<String> {
    details.filter(|v| !v.is_null()).map(|v| v.to_string())
}

#[derive(Clone)]
pub struct ActivityService {
    db: DatabaseConnection,
}

impl ActivityService {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    pub async fn track_user_activity(&self, user_id: Uuid, action: &str, details: Option<serde_json::Value>) {
        let am = user_activity::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            details: Set(render_details(details)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Err(e) = am.insert(&self.db).await {
            warn!(user_id = %user_id, action, error = %e, "failed to record user activity");
        }
    }

    /// Activity of one user over the last `days` days.
    pub async fn user_activity(&self, user_id: Uuid, days: i64) -> ServiceResult<Vec<DailyCount>> {
        if !(1..=365).contains(&days) {
            return Err(ServiceError::Validation("days must be between 1 and 365".into()));
        }
        let since: DateTime<FixedOffset> = (Utc::now() - Duration::days(days)).into();
        let events = user_activity::Entity::find()
            .filter(user_activity::Column::UserId.eq(user_id))
            .filter(user_activity::Column::CreatedAt.gte(since))
            .all(&self.db)
            .await?;
        Ok(daily_counts(&events))
    }

    pub async fn track_system_event(&self, level: LogLevel, event_type: &str, details: Option<serde_json::Value>) {
        let am = system_log::ActiveModel {
            level: Set(level),
            event_type: Set(event_type.to_string()),
            details: Set(render_details(details)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Err(e) = am.insert(&self.db).await {
            error!(event_type, error = %e, "failed to record system event");
        }
    }
}
