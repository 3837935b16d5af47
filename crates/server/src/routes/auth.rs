use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use models::system_log::LogLevel;
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::auth::AuthError;
use service::metrics::LOGINS_TOTAL;

use crate::errors::JsonApiError;
use crate::middleware::{CurrentUser, AUTH_COOKIE};
use crate::state::ServerState;

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: AuthUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn login_outcome(e: &AuthError) -> &'static str {
    match e {
        AuthError::PendingApproval => "pending",
        AuthError::Rejected => "rejected",
        AuthError::Inactive => "inactive",
        AuthError::Unauthorized | AuthError::NotFound => "invalid",
        _ => "error",
    }
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest,
    responses((status = 201, description = "Registered, waiting for approval"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    WithRejection(Json(input), _): WithRejection<Json<RegisterInput>, JsonApiError>,
) -> Result<(StatusCode, Json<AuthUser>), JsonApiError> {
    let user = state.auth_svc.register(input).await?;
    state
        .activity
        .track_system_event(LogLevel::Info, "user_registered", Some(json!({ "user_id": user.id, "role": user.role })))
        .await;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest,
    responses((status = 200, description = "Logged in"), (status = 401, description = "Invalid credentials"), (status = 403, description = "Pending, rejected or inactive account")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    WithRejection(Json(input), _): WithRejection<Json<LoginInput>, JsonApiError>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = match state.auth_svc.login(input).await {
        Ok(s) => s,
        Err(e) => {
            LOGINS_TOTAL.with_label_values(&[login_outcome(&e)]).inc();
            return Err(e.into());
        }
    };
    LOGINS_TOTAL.with_label_values(&["success"]).inc();
    state.activity.track_user_activity(session.user.id, "login", None).await;

    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.auth.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);
    Ok((jar, Json(LoginOutput { user: session.user, token: session.token, expires_at: session.expires_at })))
}

/// Tokens are stateless; logout only clears the cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<AuthUser>, JsonApiError> {
    Ok(Json(state.auth_svc.current_user(current.id).await?))
}

pub async fn change_password(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(body), _): WithRejection<Json<ChangePasswordRequest>, JsonApiError>,
) -> Result<StatusCode, JsonApiError> {
    state
        .auth_svc
        .change_password(current.id, &body.current_password, &body.new_password)
        .await?;
    state.activity.track_user_activity(current.id, "password_changed", None).await;
    Ok(StatusCode::NO_CONTENT)
}
