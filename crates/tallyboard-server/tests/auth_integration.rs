use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tallyboard_core::config::Config;
use tallyboard_duckdb::DuckDbBackend;
use tallyboard_server::app::build_app;
use tallyboard_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/tallyboard-auth-test".to_string(),
        restaurant_id: "talya-bercy".to_string(),
        timezone: chrono_tz::Europe::Paris,
        https: false,
        cors_origins: vec![],
        session_days: 7,
        duckdb_memory_limit: "1GB".to_string(),
    }
}

fn setup() -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn login_req(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build login request")
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).expect("build request")
}

/// `name=value` part of the response's Set-Cookie header.
fn cookie_pair(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("set-cookie header")
        .to_string()
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let (_state, app) = setup();
    let response = app
        .oneshot(login_req(json!({ "email": "chef@talya.fr", "password": "secret" })))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie")
        .to_string();
    assert!(set_cookie.starts_with("tb_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=604800"));
    assert!(!set_cookie.contains("Secure"), "https is off in tests");

    let json = json_body(response).await;
    assert_eq!(json["data"]["authenticated"], true);
}

#[tokio::test]
async fn test_login_rejects_empty_password() {
    let (state, app) = setup();
    let response = app
        .oneshot(login_req(json!({ "email": "chef@talya.fr", "password": "" })))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("set-cookie").is_none());

    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(state.sessions.len().await, 0);
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let (_state, app) = setup();
    let response = app
        .oneshot(get_with_cookie("/api/dashboard/monthly", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_cookie_is_unauthorized() {
    let (_state, app) = setup();
    let response = app
        .oneshot(get_with_cookie(
            "/api/dashboard/monthly",
            Some("tb_session=deadbeef"),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_login_logout_cycle() {
    let (_state, app) = setup();

    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/auth/status", None))
        .await
        .expect("status");
    assert_eq!(json_body(response).await["data"]["authenticated"], false);

    let response = app
        .clone()
        .oneshot(login_req(json!({ "email": "a@b.c", "password": "x" })))
        .await
        .expect("login");
    let cookie = cookie_pair(&response);

    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/auth/status", Some(&cookie)))
        .await
        .expect("status");
    assert_eq!(json_body(response).await["data"]["authenticated"], true);

    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/dashboard/yearly", Some(&cookie)))
        .await
        .expect("yearly");
    assert_eq!(response.status(), StatusCode::OK);

    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header("cookie", &cookie)
        .body(Body::empty())
        .expect("build logout");
    let response = app.clone().oneshot(logout).await.expect("logout");
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    let response = app
        .oneshot(get_with_cookie("/api/dashboard/yearly", Some(&cookie)))
        .await
        .expect("yearly after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_is_ok() {
    let (_state, app) = setup();
    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .expect("build logout");
    let response = app.oneshot(logout).await.expect("logout");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["ok"], true);
}

#[tokio::test]
async fn test_second_login_keeps_existing_session() {
    let (state, app) = setup();
    let response = app
        .clone()
        .oneshot(login_req(json!({ "email": "a@b.c", "password": "x" })))
        .await
        .expect("login");
    let first = cookie_pair(&response);

    let relogin = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("cookie", &first)
        .body(Body::from(json!({ "email": "a@b.c", "password": "x" }).to_string()))
        .expect("build relogin");
    let response = app.oneshot(relogin).await.expect("relogin");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cookie_pair(&response), first);
    assert_eq!(state.sessions.len().await, 1);
}
