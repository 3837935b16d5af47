use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use models::errors::ModelError;
use service::auth::AuthError;
use service::ServiceError;

/// JSON error body: `{"error": "<kind>", "detail": "<message>"}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub detail: String,
    pub code: Option<u16>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        Self { status, error, detail: detail.into(), code: None }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, "validation_error", detail) }
    pub fn unauthorized(detail: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, "unauthorized", detail) }
    pub fn forbidden(detail: impl Into<String>) -> Self { Self::new(StatusCode::FORBIDDEN, "forbidden", detail) }
    pub fn not_found(detail: impl Into<String>) -> Self { Self::new(StatusCode::NOT_FOUND, "not_found", detail) }
    pub fn conflict(detail: impl Into<String>) -> Self { Self::new(StatusCode::CONFLICT, "conflict", detail) }

    /// Log the real cause and hide it from the client.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error, detail: &self.detail, code: self.code };
        (self.status, Json(body)).into_response()
    }
}

// Extractor rejections reuse the JSON error body; every one of them is a client error.
impl From<JsonRejection> for JsonApiError {
    fn from(r: JsonRejection) -> Self {
        Self::bad_request(r.body_text())
    }
}

impl From<PathRejection> for JsonApiError {
    fn from(r: PathRejection) -> Self {
        Self::bad_request(r.body_text())
    }
}

impl From<QueryRejection> for JsonApiError {
    fn from(r: QueryRejection) -> Self {
        Self::bad_request(r.body_text())
    }
}

impl From<ModelError> for JsonApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(m) => Self::bad_request(m),
            ModelError::NotFound(m) => Self::not_found(m),
            ModelError::Db(m) => Self::internal(m),
        }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::bad_request(m),
            ServiceError::NotFound(m) => Self::not_found(m),
            ServiceError::Conflict(m) => Self::conflict(m),
            ServiceError::Forbidden(m) => Self::forbidden(m),
            e @ ServiceError::InvalidTransition { .. } => Self::new(StatusCode::CONFLICT, "invalid_transition", e.to_string()),
            ServiceError::External(m) => Self::new(StatusCode::BAD_GATEWAY, "external_error", m),
            ServiceError::Db(m) => Self::internal(m),
            ServiceError::Model(m) => m.into(),
        }
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let code = e.code();
        let mut out = match &e {
            AuthError::Validation(m) => Self::bad_request(m.clone()),
            AuthError::Conflict(m) => Self::conflict(m.clone()),
            AuthError::NotFound => Self::not_found(e.to_string()),
            AuthError::Unauthorized => Self::unauthorized(e.to_string()),
            AuthError::PendingApproval => Self::new(StatusCode::FORBIDDEN, "pending_approval", e.to_string()),
            AuthError::Rejected => Self::new(StatusCode::FORBIDDEN, "rejected", e.to_string()),
            AuthError::Inactive => Self::new(StatusCode::FORBIDDEN, "inactive", e.to_string()),
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_) => Self::internal(&e),
        };
        out.code = Some(code);
        out
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
