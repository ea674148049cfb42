use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Restaurant whose partitions the dashboard reads
    /// (`restaurants/{restaurant_id}/orders/{yyyy}/{mm}`).
    pub restaurant_id: String,
    /// Local zone used for day/month/year boundaries and labels.
    pub timezone: Tz,
    pub https: bool,
    pub cors_origins: Vec<String>,
    pub session_days: u32,
    pub duckdb_memory_limit: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("TALLYBOARD_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("TALLYBOARD_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            restaurant_id: std::env::var("TALLYBOARD_RESTAURANT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "talya-bercy".to_string()),
            timezone: {
                let raw = std::env::var("TALLYBOARD_TIMEZONE")
                    .unwrap_or_else(|_| "Europe/Paris".to_string());
                raw.parse::<Tz>()
                    .map_err(|e| format!("invalid TALLYBOARD_TIMEZONE {raw:?}: {e}"))?
            },
            https: std::env::var("TALLYBOARD_HTTPS")
                .map(|v| v == "true")
                .unwrap_or(true),
            cors_origins: std::env::var("TALLYBOARD_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            session_days: std::env::var("TALLYBOARD_SESSION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            duckdb_memory_limit: std::env::var("TALLYBOARD_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }
}
