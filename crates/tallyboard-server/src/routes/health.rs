use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health`: public; pings the order store behind the dashboard.
///
/// `200` with `"status": "ok"` when the store answers, `503` with
/// `"status": "degraded"` otherwise. Both carry the restaurant and zone the
/// dashboard is configured for.
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let dashboard = &state.dashboard;
    let (status, label) = match dashboard.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(
                restaurant = dashboard.restaurant_id(),
                error = %e,
                "Health check: order store unreachable"
            );
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };

    (
        status,
        Json(json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION"),
            "restaurant_id": dashboard.restaurant_id(),
            "timezone": dashboard.timezone().name(),
        })),
    )
}
