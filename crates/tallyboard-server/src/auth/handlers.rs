use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use tallyboard_core::session::{Credentials, Session};

use crate::{error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "tb_session";

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

/// `POST /api/auth/login`: any non-empty email and password open a session.
///
/// Presenting a still-valid cookie keeps that session instead of issuing a
/// new one.
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let current = state
        .sessions
        .resolve(session_cookie(&headers).as_deref())
        .await;
    let session = current.login(&req)?;
    state.sessions.remember(&session).await;

    let Session::Authenticated { token, since } = &session else {
        return Err(AppError::Unauthorized);
    };
    info!(since = %since, "Dashboard session opened");

    let cookie = build_session_cookie(token.as_str(), state.config.https, state.config.session_days);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "data": { "authenticated": true, "since": since } })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/logout
// ---------------------------------------------------------------------------

/// `POST /api/auth/logout`: forget the session and clear the cookie. Always 200.
pub async fn auth_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(raw) = session_cookie(&headers) {
        if state.sessions.resolve(Some(&raw)).await.is_authenticated() {
            info!("Dashboard session closed");
        }
        state.sessions.forget(&raw).await;
    }
    let cookie = clear_session_cookie(state.config.https);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "data": { "ok": true } })),
    )
}

// ---------------------------------------------------------------------------
// GET /api/auth/status
// ---------------------------------------------------------------------------

/// `GET /api/auth/status`: public; never returns 401.
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let session = state
        .sessions
        .resolve(session_cookie(&headers).as_deref())
        .await;
    Json(json!({ "data": { "authenticated": session.is_authenticated() } }))
}

/// Extract the raw session token from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
                .map(str::to_string)
        })
}

fn build_session_cookie(token: &str, https: bool, session_days: u32) -> String {
    let secure = if https { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        token,
        u64::from(session_days) * 86_400,
        secure,
    )
}

fn clear_session_cookie(https: bool) -> String {
    let secure = if https { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{secure}")
}
