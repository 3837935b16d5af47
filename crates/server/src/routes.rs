use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use models::enums::Role;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chrono::NaiveDate;
use common::types::Health;
use models::delivery::parse_date;

use crate::errors::JsonApiError;
use crate::middleware::{require_auth, require_roles, ADMIN, DRIVER, DRIVER_LIST, HEALTH_VIEWERS, MANAGER, STAFF};
use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod admin;
pub mod auth;
pub mod driver;
pub mod employee;
pub mod manager;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

/// Empty or missing query values mean "no filter".
pub(crate) fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, JsonApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(parse_date(s)?)),
        None => Ok(None),
    }
}

/// Authenticated routes restricted to `roles`.
fn guarded(state: &ServerState, roles: &'static [Role], routes: Router<ServerState>) -> Router<ServerState> {
    // route_layer order: the last one added runs first, so auth precedes the role check
    routes
        .route_layer(middleware::from_fn_with_state(roles, require_roles))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Build the full application router: public, authenticated and role-gated routes.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let session = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let drivers = guarded(&state, DRIVER_LIST, Router::new().route("/drivers", get(employee::drivers)));

    let employee_routes = guarded(
        &state,
        STAFF,
        Router::new()
            .route("/employee/addresses", get(employee::list_addresses).post(employee::create_address))
            .route(
                "/employee/addresses/:id",
                get(employee::get_address).put(employee::update_address).delete(employee::delete_address),
            )
            .route("/employee/dashboard", get(employee::dashboard))
            .route("/employee/deliveries", post(employee::create_delivery))
            .route(
                "/employee/deliveries/:id",
                get(employee::get_delivery).put(employee::update_delivery).delete(employee::delete_delivery),
            )
            .route("/employee/deliveries/:id/cancel", post(employee::cancel_delivery))
            .route("/employee/calendar", get(employee::calendar)),
    );

    let driver_routes = guarded(
        &state,
        DRIVER,
        Router::new()
            .route("/driver/dashboard", get(driver::dashboard))
            .route("/driver/deliveries", get(driver::deliveries))
            .route("/driver/deliveries/:id/:action", post(driver::change_status))
            .route("/driver/route", get(driver::route))
            .route("/driver/stats", get(driver::stats)),
    );

    let manager_routes = guarded(
        &state,
        MANAGER,
        Router::new()
            .route("/manager/dashboard", get(manager::dashboard))
            .route("/manager/analytics/deliveries", get(manager::delivery_analytics))
            .route("/manager/analytics/users", get(manager::user_analytics)),
    );

    let health_routes = guarded(
        &state,
        HEALTH_VIEWERS,
        Router::new().route("/manager/system/health", get(manager::system_health)),
    );

    let admin_routes = guarded(
        &state,
        ADMIN,
        Router::new()
            .route("/admin/users", get(admin::list_users))
            .route("/admin/users/pending", get(admin::pending_users))
            .route("/admin/users/stats", get(admin::user_stats))
            .route(
                "/admin/users/:id",
                get(admin::get_user).put(admin::update_user).delete(admin::delete_user),
            )
            .route("/admin/users/:id/approve", post(admin::approve_user))
            .route("/admin/users/:id/reject", post(admin::reject_user))
            .route("/admin/users/:id/deactivate", post(admin::deactivate_user))
            .route("/admin/users/:id/activity", get(admin::user_activity))
            .route("/admin/addresses/stats", get(admin::address_stats)),
    );

    public
        .merge(session)
        .merge(drivers)
        .merge(employee_routes)
        .merge(driver_routes)
        .merge(manager_routes)
        .merge(health_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one span per request at INFO, headers left out
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // status code and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
