use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub version: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    /// employee, manager, driver or admin
    pub role: String,
    pub preferred_lang: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest {
    /// Email or username
    pub login: String,
    pub password: String,
}

#[derive(ToSchema)]
pub struct AddressRequest {
    pub label: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(ToSchema)]
pub struct DeliveryRequestDoc {
    pub driver_id: Uuid,
    pub address_id: Uuid,
    /// YYYY-MM-DD
    pub delivery_date: String,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    pub notes: Option<String>,
}

#[derive(ToSchema)]
pub struct ErrorResponse { pub error: String, pub detail: String }

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::employee::list_addresses,
        crate::routes::employee::create_address,
        crate::routes::employee::dashboard,
        crate::routes::employee::create_delivery,
        crate::routes::employee::calendar,
        crate::routes::employee::drivers,
        crate::routes::driver::dashboard,
        crate::routes::driver::change_status,
        crate::routes::driver::route,
        crate::routes::manager::dashboard,
        crate::routes::manager::system_health,
        crate::routes::admin::list_users,
        crate::routes::admin::pending_users,
        crate::routes::admin::approve_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            AddressRequest,
            DeliveryRequestDoc,
            ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "employee"),
        (name = "driver"),
        (name = "manager"),
        (name = "admin")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_role_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/auth/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/driver/deliveries/{id}/{action}"));
        assert!(doc.components.as_ref().is_some_and(|c| c.security_schemes.contains_key("bearer")));
    }
}
