use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tallyboard_server::state::AppState;

/// `tallyboard health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$TALLYBOARD_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("TALLYBOARD_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tallyboard=info".parse()?),
        )
        .json()
        .init();

    let cfg = tallyboard_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/tallyboard.db", cfg.data_dir);
    let db = tallyboard_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    if cfg.cors_origins.iter().all(|o| o.trim().is_empty()) {
        info!("No TALLYBOARD_CORS_ORIGINS set; dashboard API is same-origin only");
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    info!(
        port = cfg.port,
        restaurant = %cfg.restaurant_id,
        timezone = %cfg.timezone,
        "Tallyboard listening on {}",
        addr
    );

    let state = Arc::new(AppState::new(db, cfg));
    let app = tallyboard_server::app::build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Tallyboard stopped");
    Ok(())
}
