//! User administration: approval queue, edits and account lifecycle.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::system_log::LogLevel;
use models::user;
use service::activity_service::DailyCount;
use service::address_service::AddressStats;
use service::user_service::{UserStats, UserUpdate};

use crate::errors::JsonApiError;
use crate::middleware::CurrentUser;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 { 30 }

#[utoipa::path(get, path = "/admin/users", tag = "admin",
    params(("page" = Option<u32>, Query, description = "1-based page"), ("per_page" = Option<u32>, Query, description = "1..=100")),
    responses((status = 200, description = "One page of users")))]
pub async fn list_users(
    State(state): State<ServerState>,
    WithRejection(Query(p), _): WithRejection<Query<Pagination>, JsonApiError>,
) -> Result<Json<Page<user::Model>>, JsonApiError> {
    Ok(Json(state.users.list_users(p).await?))
}

#[utoipa::path(get, path = "/admin/users/pending", tag = "admin", responses((status = 200, description = "Accounts waiting for approval")))]
pub async fn pending_users(State(state): State<ServerState>) -> Result<Json<Vec<user::Model>>, JsonApiError> {
    Ok(Json(state.users.pending_users().await?))
}

pub async fn get_user(
    State(state): State<ServerState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<user::Model>, JsonApiError> {
    Ok(Json(state.users.get_user(id).await?))
}

pub async fn update_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
    WithRejection(Json(changes), _): WithRejection<Json<UserUpdate>, JsonApiError>,
) -> Result<Json<user::Model>, JsonApiError> {
    let updated = state.users.update_user(id, changes).await?;
    state
        .activity
        .track_user_activity(current.id, "user_updated", Some(json!({ "user_id": id })))
        .await;
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<StatusCode, JsonApiError> {
    state.users.delete_user(id, current.id).await?;
    state
        .activity
        .track_system_event(LogLevel::Warning, "user_deleted", Some(json!({ "user_id": id, "by": current.id })))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/admin/users/{id}/approve", tag = "admin",
    params(("id" = Uuid, Path, description = "User id")), responses((status = 200, description = "Approved"), (status = 404, description = "Not Found")))]
pub async fn approve_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<user::Model>, JsonApiError> {
    let u = state.users.approve(id).await?;
    state
        .activity
        .track_system_event(LogLevel::Info, "user_approved", Some(json!({ "user_id": id, "by": current.id })))
        .await;
    Ok(Json(u))
}

pub async fn reject_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<user::Model>, JsonApiError> {
    let u = state.users.reject(id).await?;
    state
        .activity
        .track_system_event(LogLevel::Info, "user_rejected", Some(json!({ "user_id": id, "by": current.id })))
        .await;
    Ok(Json(u))
}

pub async fn deactivate_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<user::Model>, JsonApiError> {
    let u = state.users.deactivate(id, current.id).await?;
    state
        .activity
        .track_system_event(LogLevel::Warning, "user_deactivated", Some(json!({ "user_id": id, "by": current.id })))
        .await;
    Ok(Json(u))
}

pub async fn user_activity(
    State(state): State<ServerState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
    WithRejection(Query(q), _): WithRejection<Query<ActivityQuery>, JsonApiError>,
) -> Result<Json<Vec<DailyCount>>, JsonApiError> {
    Ok(Json(state.activity.user_activity(id, q.days).await?))
}

pub async fn user_stats(State(state): State<ServerState>) -> Result<Json<UserStats>, JsonApiError> {
    Ok(Json(state.users.user_stats().await?))
}

pub async fn address_stats(State(state): State<ServerState>) -> Result<Json<AddressStats>, JsonApiError> {
    Ok(Json(state.addresses.stats().await?))
}
