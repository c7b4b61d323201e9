use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use faucet_common::traits::UsageStore;
use faucet_common::StoreResult;

/// Non-persistent usage ledger, for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryUsageStore {
    last_use: DashMap<String, DateTime<Utc>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_use(&self, ip: &str) -> Option<DateTime<Utc>> {
        self.last_use.get(ip).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.last_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_use.is_empty()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn upsert_usage(&self, ip: &str, now: DateTime<Utc>) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.last_use.insert(ip.to_string(), now))
    }

    async fn count_usage_in_window(&self, ip: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .last_use
            .get(ip)
            .map_or(0, |used| u64::from(from <= *used && *used <= to)))
    }
}
