use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use models::delivery;
use models::enums::DeliveryStatus;
use service::delivery_service::{DeliveryDetails, DeliveryFilter, RouteStop};
use service::user_service::DriverStats;

use crate::errors::JsonApiError;
use crate::middleware::CurrentUser;
use crate::routes::optional_date;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveriesQuery {
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct DriverDashboard {
    pub date: NaiveDate,
    pub deliveries: Vec<DeliveryDetails>,
}

/// Path verb to the status it requests.
pub fn action_status(action: &str) -> Option<DeliveryStatus> {
    match action {
        "accept" => Some(DeliveryStatus::Accepted),
        "reject" => Some(DeliveryStatus::Rejected),
        "start" => Some(DeliveryStatus::InProgress),
        "complete" => Some(DeliveryStatus::Completed),
        _ => None,
    }
}

fn date_or_today(raw: Option<&str>) -> Result<NaiveDate, JsonApiError> {
    Ok(optional_date(raw)?.unwrap_or_else(|| Local::now().date_naive()))
}

#[utoipa::path(get, path = "/driver/dashboard", tag = "driver",
    params(("date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today")),
    responses((status = 200, description = "The caller's deliveries for the day")))]
pub async fn dashboard(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Query(q), _): WithRejection<Query<DateQuery>, JsonApiError>,
) -> Result<Json<DriverDashboard>, JsonApiError> {
    let date = date_or_today(q.date.as_deref())?;
    let deliveries = state
        .deliveries
        .driver_deliveries(current.id, DeliveryFilter { date: Some(date), status: None })
        .await?;
    Ok(Json(DriverDashboard { date, deliveries }))
}

pub async fn deliveries(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Query(q), _): WithRejection<Query<DeliveriesQuery>, JsonApiError>,
) -> Result<Json<Vec<DeliveryDetails>>, JsonApiError> {
    let status = match q.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(s.parse::<DeliveryStatus>()?),
        None => None,
    };
    let filter = DeliveryFilter { date: optional_date(q.date.as_deref())?, status };
    Ok(Json(state.deliveries.driver_deliveries(current.id, filter).await?))
}

#[utoipa::path(post, path = "/driver/deliveries/{id}/{action}", tag = "driver",
    params(("id" = Uuid, Path, description = "Delivery id"), ("action" = String, Path, description = "accept, reject, start or complete")),
    responses((status = 200, description = "Status changed"), (status = 403, description = "Not the assigned driver"), (status = 409, description = "Transition not allowed")))]
pub async fn change_status(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path((id, action)), _): WithRejection<Path<(Uuid, String)>, JsonApiError>,
) -> Result<Json<delivery::Model>, JsonApiError> {
    let next = action_status(&action).ok_or_else(|| JsonApiError::not_found(format!("unknown action: {action}")))?;
    let updated = state.deliveries.update_status(id, next, &current.actor()).await?;
    state
        .activity
        .track_user_activity(current.id, "delivery_status_changed", Some(json!({ "delivery_id": id, "status": next })))
        .await;
    Ok(Json(updated))
}

#[utoipa::path(get, path = "/driver/route", tag = "driver",
    params(("date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today")),
    responses((status = 200, description = "Pending stops in visiting order")))]
pub async fn route(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Query(q), _): WithRejection<Query<DateQuery>, JsonApiError>,
) -> Result<Json<Vec<RouteStop>>, JsonApiError> {
    let date = date_or_today(q.date.as_deref())?;
    Ok(Json(state.deliveries.optimize_route(current.id, date).await?))
}

pub async fn stats(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DriverStats>, JsonApiError> {
    Ok(Json(state.users.driver_stats(current.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_driver_statuses() {
        for action in ["accept", "reject", "start", "complete"] {
            let st = action_status(action).unwrap();
            assert!(st.driver_settable(), "{action}");
        }
        assert!(action_status("cancel").is_none());
        assert!(action_status("Accept").is_none());
    }

    #[test]
    fn missing_date_defaults_to_today() {
        assert_eq!(date_or_today(None).unwrap(), Local::now().date_naive());
        assert_eq!(date_or_today(Some("2024-03-01")).unwrap().to_string(), "2024-03-01");
        assert!(date_or_today(Some("tomorrow")).is_err());
    }
}
