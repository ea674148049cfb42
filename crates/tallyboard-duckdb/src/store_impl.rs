use async_trait::async_trait;

use tallyboard_core::order::RawOrder;
use tallyboard_core::partition::PartitionKey;
use tallyboard_core::store::OrderStore;

use crate::DuckDbBackend;

#[async_trait]
impl OrderStore for DuckDbBackend {
    async fn fetch_orders(&self, key: &PartitionKey) -> anyhow::Result<Vec<RawOrder>> {
        DuckDbBackend::fetch_partition_documents(self, key).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }
}
