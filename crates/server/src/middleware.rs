//! Authentication and role checks applied as route layers.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use models::enums::Role;
use service::auth::token;
use service::Actor;

use crate::errors::JsonApiError;
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

pub const STAFF: &[Role] = &[Role::Employee, Role::Manager];
pub const DRIVER: &[Role] = &[Role::Driver];
pub const MANAGER: &[Role] = &[Role::Manager];
pub const ADMIN: &[Role] = &[Role::Admin];
pub const HEALTH_VIEWERS: &[Role] = &[Role::Manager, Role::Admin];
pub const DRIVER_LIST: &[Role] = &[Role::Employee, Role::Manager, Role::Admin];

/// Caller identity decoded from the JWT, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor { id: self.id, role: self.role }
    }
}

/// Bearer header wins over the cookie. A malformed Authorization header is not retried from the cookie.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<String>, JsonApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let raw = value.to_str().map_err(|_| JsonApiError::unauthorized("invalid Authorization header"))?;
        return match raw.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => Ok(Some(t.trim().to_string())),
            _ => Err(JsonApiError::unauthorized("expected a Bearer token")),
        };
    }
    let jar = CookieJar::from_headers(headers);
    Ok(jar
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let Some(tok) = extract_token(req.headers())? else {
        warn!(%path, "missing Authorization header and auth_token cookie");
        return Err(JsonApiError::unauthorized("authentication required"));
    };
    let claims = token::verify(&state.auth.jwt_secret, &tok).map_err(|e| {
        warn!(%path, error = %e, "rejected token");
        JsonApiError::unauthorized("invalid or expired token")
    })?;
    req.extensions_mut().insert(CurrentUser { id: claims.sub, role: claims.role, name: claims.name });
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`].
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let Some(user) = req.extensions().get::<CurrentUser>() else {
        return Err(JsonApiError::unauthorized("authentication required"));
    };
    if !allowed.contains(&user.role) {
        warn!(user_id = %user.id, role = %user.role, path = %req.uri().path(), "role not permitted");
        return Err(JsonApiError::forbidden("insufficient role"));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_preferred() {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        h.insert(header::COOKIE, HeaderValue::from_static("auth_token=xyz"));
        assert_eq!(extract_token(&h).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=xyz"));
        assert_eq!(extract_token(&h).unwrap().as_deref(), Some("xyz"));
    }

    #[test]
    fn basic_auth_is_rejected() {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_token(&h).is_err());
        assert!(extract_token(&HeaderMap::new()).unwrap().is_none());
    }
}
