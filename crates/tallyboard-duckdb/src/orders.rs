use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::warn;

use tallyboard_core::order::RawOrder;
use tallyboard_core::partition::PartitionKey;

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Write order documents into one month partition. See
    /// [`DuckDbBackend::insert_partitioned`].
    pub async fn insert_orders(&self, key: &PartitionKey, documents: &[Value]) -> Result<usize> {
        let mut batch = BTreeMap::new();
        batch.insert(key.clone(), documents.to_vec());
        self.insert_partitioned(&batch).await
    }

    /// Write order documents for several month partitions in a single
    /// transaction: either every partition is written or none is.
    ///
    /// Each document must be a JSON object with a string `id`; an existing
    /// document with the same id in the same partition is replaced. Returns
    /// the number of documents written.
    pub async fn insert_partitioned(
        &self,
        batch: &BTreeMap<PartitionKey, Vec<Value>>,
    ) -> Result<usize> {
        let mut planned = Vec::with_capacity(batch.len());
        for (key, documents) in batch {
            let rows = dedup_by_id(documents)?;
            if !rows.is_empty() {
                planned.push((key, rows));
            }
        }
        if planned.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        for (key, rows) in &planned {
            for (id, document) in rows {
                tx.execute(
                    r#"INSERT OR REPLACE INTO orders (restaurant_id, year, month, id, document)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    duckdb::params![key.restaurant_id, key.year, key.month, id, document],
                )?;
            }
            written += rows.len();
        }
        tx.commit()?;

        for (key, rows) in &planned {
            tracing::info!(partition = %key, count = rows.len(), "Inserted order documents");
        }
        Ok(written)
    }

    /// Read every document of one partition, ordered by id.
    ///
    /// Rows whose JSON does not decode as an order are skipped with a warning.
    pub async fn fetch_partition_documents(&self, key: &PartitionKey) -> Result<Vec<RawOrder>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"SELECT id, document
               FROM orders
               WHERE restaurant_id = ?1 AND year = ?2 AND month = ?3
               ORDER BY id"#,
        )?;
        let rows = stmt.query_map(
            duckdb::params![key.restaurant_id, key.year, key.month],
            |row| {
                let id: String = row.get(0)?;
                let document: String = row.get(1)?;
                Ok((id, document))
            },
        )?;

        let mut orders = Vec::new();
        for row in rows {
            let (id, document) = row?;
            match serde_json::from_str::<RawOrder>(&document) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    warn!(partition = %key, order_id = %id, error = %e, "Skipping undecodable order document");
                }
            }
        }
        Ok(orders)
    }

    /// Number of documents stored in one partition.
    pub async fn count_orders(&self, key: &PartitionKey) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT COUNT(*) FROM orders WHERE restaurant_id = ?1 AND year = ?2 AND month = ?3",
        )?;
        let count: i64 = stmt.query_row(
            duckdb::params![key.restaurant_id, key.year, key.month],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Serialize documents as `(id, json)` rows. The last document wins when an
/// id repeats.
fn dedup_by_id(documents: &[Value]) -> Result<Vec<(String, String)>> {
    let mut rows: Vec<(String, String)> = Vec::with_capacity(documents.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for doc in documents {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("order document is missing a string id"))?;
        let document = serde_json::to_string(doc)?;
        match positions.get(id) {
            Some(&at) => rows[at].1 = document,
            None => {
                positions.insert(id.to_string(), rows.len());
                rows.push((id.to_string(), document));
            }
        }
    }
    Ok(rows)
}
