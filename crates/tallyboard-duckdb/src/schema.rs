/// DuckDB initialization SQL.
///
/// Executed once at open time via `Connection::execute_batch`. Every
/// statement uses `IF NOT EXISTS`, so re-running it on startup is safe.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `TALLYBOARD_DUCKDB_MEMORY`, default `"1GB"`). Always set it: the
/// DuckDB default of 80% of system RAM is not acceptable for a server.
///
/// Orders are stored as whole JSON documents keyed by their month partition
/// so the read path sees the same loosely-typed fields a hosted document
/// store would return.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- ORDERS (restaurants/{{restaurant}}/orders/{{yyyy}}/{{mm}})
-- ===========================================
CREATE TABLE IF NOT EXISTS orders (
    restaurant_id   VARCHAR NOT NULL,
    year            INTEGER NOT NULL,
    month           INTEGER NOT NULL,              -- 1-12
    id              VARCHAR NOT NULL,
    document        VARCHAR NOT NULL,              -- raw JSON, includes "id"
    inserted_at     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (restaurant_id, year, month, id)
);
CREATE INDEX IF NOT EXISTS idx_orders_partition ON orders(restaurant_id, year, month);
"#
    )
}
