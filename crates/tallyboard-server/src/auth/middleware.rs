use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

use super::handlers::session_cookie;

/// Gate for protected routes: resolves the session cookie and lets the
/// request through only when the session is authenticated.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let session = state
        .sessions
        .resolve(session_cookie(request.headers()).as_deref())
        .await;

    match session.require() {
        Ok(_) => next.run(request).await,
        Err(e) => AppError::from(e).into_response(),
    }
}
