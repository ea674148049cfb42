//! Document-store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::order::{normalize_orders, OrderRecord, RawOrder};
use crate::partition::PartitionKey;

/// Read access to month-partitioned order documents.
///
/// An empty or never-written partition is `Ok(vec![])`, not an error.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn fetch_orders(&self, key: &PartitionKey) -> anyhow::Result<Vec<RawOrder>>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Normalized records gathered from a set of partitions.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<OrderRecord>,
    /// Partitions whose fetch failed; they contributed no records.
    pub failed_partitions: Vec<PartitionKey>,
    /// Records whose `createdAt` was unrecognized and set to `now`.
    pub fallback_timestamps: usize,
}

/// Fetch every partition in `keys` concurrently and merge the results in key
/// order. A failed partition is logged and treated as empty.
pub async fn fetch_partitions(
    store: &dyn OrderStore,
    keys: &[PartitionKey],
    tz: Tz,
    now: DateTime<Utc>,
) -> FetchOutcome {
    let results = join_all(
        keys.iter()
            .map(|key| async move { (key, store.fetch_orders(key).await) }),
    )
    .await;

    let mut outcome = FetchOutcome::default();
    for (key, result) in results {
        match result {
            Ok(raws) => {
                debug!(partition = %key, count = raws.len(), "Partition fetched");
                let (records, fallbacks) = normalize_orders(&raws, tz, now);
                outcome.records.extend(records);
                outcome.fallback_timestamps += fallbacks;
            }
            Err(e) => {
                warn!(partition = %key, error = %e, "No data for partition; counting it as empty");
                outcome.failed_partitions.push(key.clone());
            }
        }
    }
    outcome
}

/// Fetch and normalize a single partition, propagating store errors.
pub async fn fetch_partition(
    store: &dyn OrderStore,
    key: &PartitionKey,
    tz: Tz,
    now: DateTime<Utc>,
) -> anyhow::Result<(Vec<OrderRecord>, usize)> {
    let raws = store.fetch_orders(key).await?;
    Ok(normalize_orders(&raws, tz, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::TimeZone;
    use serde_json::json;

    struct FixedStore {
        partitions: HashMap<String, Vec<RawOrder>>,
        broken: Vec<String>,
    }

    #[async_trait]
    impl OrderStore for FixedStore {
        async fn fetch_orders(&self, key: &PartitionKey) -> anyhow::Result<Vec<RawOrder>> {
            if self.broken.contains(&key.year_month()) {
                anyhow::bail!("permission denied");
            }
            Ok(self
                .partitions
                .get(&key.year_month())
                .cloned()
                .unwrap_or_default())
        }
    }

    fn raw(id: &str, created_at: serde_json::Value, total: f64) -> RawOrder {
        RawOrder {
            id: id.to_string(),
            created_at: Some(created_at),
            total_price: Some(json!(total)),
            total: None,
        }
    }

    #[tokio::test]
    async fn failed_partition_degrades_to_empty() {
        let mut partitions = HashMap::new();
        partitions.insert(
            "2026/09".to_string(),
            vec![raw("a", json!("2026-09-30T10:00:00Z"), 10.0)],
        );
        let store = FixedStore {
            partitions,
            broken: vec!["2026/10".to_string()],
        };
        let keys = vec![
            PartitionKey::new("r", 2026, 9),
            PartitionKey::new("r", 2026, 10),
        ];
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();

        let outcome = fetch_partitions(&store, &keys, chrono_tz::UTC, now).await;
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.failed_partitions, vec![PartitionKey::new("r", 2026, 10)]);
        assert_eq!(outcome.fallback_timestamps, 0);
    }

    #[tokio::test]
    async fn records_are_merged_in_key_order() {
        let mut partitions = HashMap::new();
        partitions.insert("2026/01".to_string(), vec![raw("jan", json!(0), 1.0)]);
        partitions.insert("2026/02".to_string(), vec![raw("feb", json!(0), 2.0)]);
        let store = FixedStore {
            partitions,
            broken: vec![],
        };
        let keys = vec![PartitionKey::new("r", 2026, 2), PartitionKey::new("r", 2026, 1)];
        let outcome = fetch_partitions(&store, &keys, chrono_tz::UTC, Utc::now()).await;
        let ids: Vec<_> = outcome.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["feb", "jan"]);
    }

    #[tokio::test]
    async fn single_partition_fetch_propagates_errors() {
        let store = FixedStore {
            partitions: HashMap::new(),
            broken: vec!["2026/03".to_string()],
        };
        let key = PartitionKey::new("r", 2026, 3);
        assert!(fetch_partition(&store, &key, chrono_tz::UTC, Utc::now())
            .await
            .is_err());
    }
}
