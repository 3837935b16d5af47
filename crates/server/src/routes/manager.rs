use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use service::analytics_service::{DeliveryAnalytics, SystemHealth, UserAnalytics};
use service::delivery_service::DeliveryStats;
use service::user_service::UserStats;

use crate::errors::JsonApiError;
use crate::routes::optional_date;
use crate::state::ServerState;

const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeQuery {
    /// Missing bounds default to the 30 days ending `today`, both ends included.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), JsonApiError> {
        let end = optional_date(self.end.as_deref())?.unwrap_or(today);
        let start = optional_date(self.start.as_deref())?.unwrap_or(end - Duration::days(DEFAULT_RANGE_DAYS - 1));
        if start > end {
            return Err(JsonApiError::bad_request("start date must not be after end date"));
        }
        Ok((start, end))
    }
}

#[derive(Serialize)]
pub struct ManagerDashboard {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub deliveries: DeliveryStats,
    pub users: UserStats,
}

#[utoipa::path(get, path = "/manager/dashboard", tag = "manager",
    params(("start" = Option<String>, Query, description = "YYYY-MM-DD"), ("end" = Option<String>, Query, description = "YYYY-MM-DD")),
    responses((status = 200, description = "Delivery and user statistics"), (status = 400, description = "Bad range")))]
pub async fn dashboard(
    State(state): State<ServerState>,
    WithRejection(Query(q), _): WithRejection<Query<RangeQuery>, JsonApiError>,
) -> Result<Json<ManagerDashboard>, JsonApiError> {
    let (start, end) = q.resolve(Local::now().date_naive())?;
    let deliveries = state.deliveries.stats(start, end).await?;
    let users = state.users.user_stats().await?;
    Ok(Json(ManagerDashboard { start, end, deliveries, users }))
}

pub async fn delivery_analytics(
    State(state): State<ServerState>,
    WithRejection(Query(q), _): WithRejection<Query<RangeQuery>, JsonApiError>,
) -> Result<Json<DeliveryAnalytics>, JsonApiError> {
    let (start, end) = q.resolve(Local::now().date_naive())?;
    Ok(Json(state.analytics.delivery_analytics(start, end).await?))
}

pub async fn user_analytics(State(state): State<ServerState>) -> Result<Json<UserAnalytics>, JsonApiError> {
    Ok(Json(state.analytics.user_analytics().await?))
}

#[utoipa::path(get, path = "/manager/system/health", tag = "manager", responses((status = 200, description = "Last 24 h activity and log counts")))]
pub async fn system_health(State(state): State<ServerState>) -> Result<Json<SystemHealth>, JsonApiError> {
    Ok(Json(state.analytics.system_health().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn range_defaults_to_last_thirty_days() {
        let (start, end) = RangeQuery::default().resolve(day("2024-04-30")).unwrap();
        assert_eq!(end, day("2024-04-30"));
        assert_eq!(start, day("2024-04-01"));
        assert_eq!((end - start).num_days() + 1, DEFAULT_RANGE_DAYS);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let q = RangeQuery { start: Some("2024-05-02".into()), end: Some("2024-05-01".into()) };
        assert_eq!(q.resolve(day("2024-05-10")).unwrap_err().status, axum::http::StatusCode::BAD_REQUEST);
    }
}
