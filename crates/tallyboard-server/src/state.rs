use std::sync::Arc;

use tallyboard_core::{config::Config, dashboard::Dashboard, store::OrderStore};
use tallyboard_duckdb::DuckDbBackend;

use crate::auth::sessions::SessionRegistry;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// Holds no aggregation results: every dashboard request fetches and
/// buckets its own data, so concurrent requests never share view state.
pub struct AppState {
    /// The DuckDB backend. Internally uses `Arc<tokio::sync::Mutex<Connection>>`.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Aggregation service reading through `db` as an [`OrderStore`].
    pub dashboard: Arc<Dashboard>,

    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let store: Arc<dyn OrderStore> = db.clone();
        let dashboard = Dashboard::new(store, config.restaurant_id.clone(), config.timezone);
        Self {
            db,
            sessions: SessionRegistry::new(config.session_days),
            dashboard: Arc::new(dashboard),
            config: Arc::new(config),
        }
    }
}
