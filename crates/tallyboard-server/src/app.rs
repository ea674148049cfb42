use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{handlers, middleware::require_session},
    routes,
    state::AppState,
};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer`: structured request/response logging via `tracing`.
/// 2. `CorsLayer`: only origins listed in `TALLYBOARD_CORS_ORIGINS` get
///    CORS headers, with credentials so the session cookie travels.
/// 3. `require_session`: on the dashboard and ingest routes only.
pub fn build_app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/dashboard", get(routes::dashboard::overview))
        .route("/api/dashboard/daily", get(routes::dashboard::daily))
        .route("/api/dashboard/monthly", get(routes::dashboard::monthly))
        .route("/api/dashboard/yearly", get(routes::dashboard::yearly))
        .route("/api/dashboard/range", get(routes::dashboard::range))
        .route("/api/orders", post(routes::orders::ingest_orders))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/login", post(handlers::auth_login))
        .route("/api/auth/logout", post(handlers::auth_logout))
        .route("/api/auth/status", get(handlers::auth_status))
        .merge(protected)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
