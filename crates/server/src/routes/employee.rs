//! Address book, delivery planning and calendar for employees and managers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use models::delivery::{self, parse_date, parse_time};
use models::errors::ModelError;
use models::address;
use service::address_service::{AddressUpdate, NewAddress};
use service::delivery_service::{CalendarGroup, DashboardSummary, DeliveryDetails, DeliveryInput};
use service::user_service::DriverSummary;

use crate::errors::JsonApiError;
use crate::middleware::CurrentUser;
use crate::routes::optional_date;
use crate::state::ServerState;

/// Wire form of a delivery; dates are `YYYY-MM-DD`, times `HH:MM[:SS]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryRequest {
    pub driver_id: Uuid,
    pub address_id: Uuid,
    pub delivery_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DeliveryRequest {
    pub fn into_input(self) -> Result<DeliveryInput, ModelError> {
        Ok(DeliveryInput {
            driver_id: self.driver_id,
            address_id: self.address_id,
            delivery_date: parse_date(&self.delivery_date)?,
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    /// Only addresses created by the caller.
    #[serde(default)]
    pub mine: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub driver: Option<String>,
    pub date: Option<String>,
}

#[utoipa::path(get, path = "/employee/addresses", tag = "employee", responses((status = 200, description = "Address list")))]
pub async fn list_addresses(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Query(q), _): WithRejection<Query<AddressQuery>, JsonApiError>,
) -> Result<Json<Vec<address::Model>>, JsonApiError> {
    let rows = if q.mine {
        state.addresses.list_by_creator(current.id).await?
    } else {
        state.addresses.list().await?
    };
    Ok(Json(rows))
}

#[utoipa::path(post, path = "/employee/addresses", tag = "employee", request_body = crate::openapi::AddressRequest,
    responses((status = 201, description = "Created"), (status = 400, description = "Invalid or ungeocodable address")))]
pub async fn create_address(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(input), _): WithRejection<Json<NewAddress>, JsonApiError>,
) -> Result<(StatusCode, Json<address::Model>), JsonApiError> {
    let created = state.addresses.create(input, Some(current.id)).await?;
    state
        .activity
        .track_user_activity(current.id, "address_created", Some(json!({ "address_id": created.id })))
        .await;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_address(
    State(state): State<ServerState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<address::Model>, JsonApiError> {
    Ok(Json(state.addresses.get(id).await?))
}

pub async fn update_address(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
    WithRejection(Json(changes), _): WithRejection<Json<AddressUpdate>, JsonApiError>,
) -> Result<Json<address::Model>, JsonApiError> {
    let updated = state.addresses.update(id, changes).await?;
    state
        .activity
        .track_user_activity(current.id, "address_updated", Some(json!({ "address_id": id })))
        .await;
    Ok(Json(updated))
}

pub async fn delete_address(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<StatusCode, JsonApiError> {
    state.addresses.delete(id).await?;
    state
        .activity
        .track_user_activity(current.id, "address_deleted", Some(json!({ "address_id": id })))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/employee/dashboard", tag = "employee", responses((status = 200, description = "Today, this week and the next delivery")))]
pub async fn dashboard(State(state): State<ServerState>) -> Result<Json<DashboardSummary>, JsonApiError> {
    let today = Local::now().date_naive();
    Ok(Json(state.deliveries.dashboard_summary(today).await?))
}

#[utoipa::path(post, path = "/employee/deliveries", tag = "employee", request_body = crate::openapi::DeliveryRequestDoc,
    responses((status = 201, description = "Scheduled"), (status = 400, description = "Bad Request"), (status = 404, description = "Unknown driver or address")))]
pub async fn create_delivery(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(body), _): WithRejection<Json<DeliveryRequest>, JsonApiError>,
) -> Result<(StatusCode, Json<delivery::Model>), JsonApiError> {
    let input = body.into_input()?;
    let created = state.deliveries.create(input, Some(current.id)).await?;
    state
        .activity
        .track_user_activity(
            current.id,
            "delivery_created",
            Some(json!({ "delivery_id": created.id, "driver_id": created.driver_id })),
        )
        .await;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_delivery(
    State(state): State<ServerState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<DeliveryDetails>, JsonApiError> {
    Ok(Json(state.deliveries.get(id).await?))
}

pub async fn update_delivery(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
    WithRejection(Json(body), _): WithRejection<Json<DeliveryRequest>, JsonApiError>,
) -> Result<Json<delivery::Model>, JsonApiError> {
    let input = body.into_input()?;
    let updated = state.deliveries.update(id, input).await?;
    state
        .activity
        .track_user_activity(current.id, "delivery_updated", Some(json!({ "delivery_id": id })))
        .await;
    Ok(Json(updated))
}

pub async fn delete_delivery(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<StatusCode, JsonApiError> {
    state.deliveries.delete(id).await?;
    state
        .activity
        .track_user_activity(current.id, "delivery_deleted", Some(json!({ "delivery_id": id })))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_delivery(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<delivery::Model>, JsonApiError> {
    let cancelled = state.deliveries.cancel(id, &current.actor()).await?;
    state
        .activity
        .track_user_activity(current.id, "delivery_cancelled", Some(json!({ "delivery_id": id })))
        .await;
    Ok(Json(cancelled))
}

#[utoipa::path(get, path = "/employee/calendar", tag = "employee",
    params(("driver" = Option<String>, Query, description = "Driver name filter"), ("date" = Option<String>, Query, description = "YYYY-MM-DD")),
    responses((status = 200, description = "Deliveries grouped by date and driver")))]
pub async fn calendar(
    State(state): State<ServerState>,
    WithRejection(Query(q), _): WithRejection<Query<CalendarQuery>, JsonApiError>,
) -> Result<Json<Vec<CalendarGroup>>, JsonApiError> {
    let date = optional_date(q.date.as_deref())?;
    let driver = q.driver.as_deref().map(str::trim).filter(|d| !d.is_empty());
    Ok(Json(state.deliveries.calendar(driver, date).await?))
}

#[utoipa::path(get, path = "/drivers", tag = "employee", responses((status = 200, description = "Active approved drivers")))]
pub async fn drivers(State(state): State<ServerState>) -> Result<Json<Vec<DriverSummary>>, JsonApiError> {
    let list = state.users.drivers().await?;
    Ok(Json((*list).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(date: &str, start: &str, end: &str) -> DeliveryRequest {
        DeliveryRequest {
            driver_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            delivery_date: date.into(),
            start_time: start.into(),
            end_time: end.into(),
            notes: None,
        }
    }

    #[test]
    fn delivery_request_accepts_short_and_long_times() {
        let input = request("2024-05-02", "09:00", "10:30:00").into_input().unwrap();
        assert_eq!(input.delivery_date.to_string(), "2024-05-02");
        assert_eq!(input.start_time.to_string(), "09:00:00");
        assert_eq!(input.end_time.to_string(), "10:30:00");
    }

    #[test]
    fn delivery_request_rejects_bad_date() {
        assert!(request("02.05.2024", "09:00", "10:00").into_input().is_err());
        assert!(request("2024-05-02", "9am", "10:00").into_input().is_err());
    }
}
