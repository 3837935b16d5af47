use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use configs::AppConfig;
use models::enums::{ApprovalStatus, Role};
use server::routes::build_router;
use server::ServerState;
use service::auth::domain::AuthUser;
use service::auth::token;
use service::maps::DisabledRouting;

const SECRET: &str = "router-test-secret-0123456789";

// Nothing below reaches the database: every request is answered by
// middleware or by input validation before a service call.
fn app() -> Router {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = SECRET.into();
    let state = ServerState::new(DatabaseConnection::Disconnected, &cfg, Arc::new(DisabledRouting));
    build_router(state, CorsLayer::very_permissive())
}

fn token_for(role: Role) -> String {
    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Test".into(),
        email: "test@example.com".into(),
        username: "test".into(),
        role,
        active: true,
        approval_status: ApprovalStatus::Approved,
        preferred_lang: "cs".into(),
    };
    token::issue(SECRET, &user, 1).unwrap().0
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(t) = bearer {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let resp = app().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn metrics_and_openapi_are_public() {
    let resp = app().oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app().oneshot(get("/api-docs/openapi.json", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert!(v["paths"]["/auth/login"].is_object());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    for uri in ["/auth/me", "/employee/dashboard", "/driver/route", "/manager/dashboard", "/admin/users", "/drivers"] {
        let resp = app().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let v = json_body(resp).await;
        assert_eq!(v["error"], "unauthorized");
    }
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "another-secret-entirely-000000".into();
    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Mallory".into(),
        email: "m@example.com".into(),
        username: "mallory".into(),
        role: Role::Admin,
        active: true,
        approval_status: ApprovalStatus::Approved,
        preferred_lang: "en".into(),
    };
    let (forged, _) = token::issue(&cfg.auth.jwt_secret, &user, 1).unwrap();
    let resp = app().oneshot(get("/admin/users", Some(&forged))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app().oneshot(get("/admin/users", Some("not-a-jwt"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let cases = [
        (Role::Driver, "/employee/dashboard"),
        (Role::Employee, "/driver/route"),
        (Role::Employee, "/manager/dashboard"),
        (Role::Manager, "/admin/users"),
        (Role::Driver, "/drivers"),
        (Role::Employee, "/manager/system/health"),
        (Role::Admin, "/employee/calendar"),
    ];
    for (role, uri) in cases {
        let resp = app().oneshot(get(uri, Some(&token_for(role)))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{role} {uri}");
        let v = json_body(resp).await;
        assert_eq!(v["error"], "forbidden");
    }
}

#[tokio::test]
async fn cookie_token_authenticates() {
    let tok = token_for(Role::Driver);
    let req = Request::builder()
        .uri("/driver/deliveries?status=teleported")
        .header(header::COOKIE, format!("auth_token={tok}"))
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    // past auth, rejected by query validation
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_driver_action_is_not_found() {
    let tok = token_for(Role::Driver);
    let req = Request::builder()
        .method("POST")
        .uri(format!("/driver/deliveries/{}/teleport", Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {tok}"))
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inverted_manager_range_is_bad_request() {
    let tok = token_for(Role::Manager);
    let resp = app()
        .oneshot(get("/manager/dashboard?start=2024-05-10&end=2024-05-01", Some(&tok)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "validation_error");
}

#[tokio::test]
async fn logout_clears_cookie() {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::COOKIE, "auth_token=stale")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("auth_token="));
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let tok = token_for(Role::Employee);
    let bad_path = get("/employee/addresses/not-a-uuid", Some(&tok));
    let missing_field = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"x"}"#))
        .unwrap();
    let broken_json = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let bad_query = get("/admin/users?page=first", Some(&token_for(Role::Admin)));

    for req in [bad_path, missing_field, broken_json, bad_query] {
        let uri = req.uri().to_string();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
        assert!(ct.starts_with("application/json"), "{uri}: {ct}");
        let v = json_body(resp).await;
        assert_eq!(v["error"], "validation_error", "{uri}");
        assert!(v["detail"].as_str().is_some_and(|d| !d.is_empty()), "{uri}");
    }
}
