use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use faucet_common::traits::UsageStore;
use faucet_common::types::UsageRecord;
use faucet_common::{StoreError, StoreResult};
use sled::{IVec, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const IP_USAGE_TREE: &str = "ip_usage";

/// Usage ledger kept in a sled tree keyed by IP, values bincode `UsageRecord`s.
///
/// sled holds an exclusive lock on its directory, so the ledger belongs to a
/// single process. Instances that must share a ledger use the Postgres store.
pub struct SledUsageStore {
    db: Arc<Tree>,
}

impl SledUsageStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path).context("Failed to open Sled database")?;
        Self::from_db(db)
    }

    /// Create a store on an already opened sled::Db
    pub fn from_db(db: sled::Db) -> Result<Self> {
        let tree = db.open_tree(IP_USAGE_TREE).context("Failed to open ip_usage tree")?;
        Ok(Self { db: Arc::new(tree) })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> StoreResult<()> {
        self.db
            .flush_async()
            .await
            .map(|_| ())
            .map_err(|e| StoreError::OperationFailed(format!("Failed to flush SledDB: {}", e)))
    }

    pub fn get_record(&self, ip: &str) -> StoreResult<Option<UsageRecord>> {
        let value = self
            .db
            .get(ip.as_bytes())
            .map_err(|e| StoreError::OperationFailed(format!("Failed to get from SledDB: {}", e)))?;
        value.map(|v| decode_record(&v)).transpose()
    }
}

fn decode_record(value: &IVec) -> StoreResult<UsageRecord> {
    bincode::deserialize(value).map_err(|e| StoreError::Corruption(format!("Invalid usage record: {}", e)))
}

fn millis_to_datetime(millis: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::Corruption(format!("Invalid timestamp {}", millis)))
}

#[async_trait]
impl UsageStore for SledUsageStore {
    async fn upsert_usage(&self, ip: &str, now: DateTime<Utc>) -> StoreResult<Option<DateTime<Utc>>> {
        let db = self.db.clone();
        let record = UsageRecord { ip: ip.to_string(), last_use: now.timestamp_millis() };

        tokio::task::spawn_blocking(move || {
            let value = bincode::serialize(&record)
                .map_err(|e| StoreError::OperationFailed(format!("Failed to encode usage record: {}", e)))?;
            // A single insert swaps the value atomically and hands back the old one.
            let previous = db
                .insert(record.ip.as_bytes(), value)
                .map_err(|e| StoreError::OperationFailed(format!("Failed to insert into SledDB: {}", e)))?;
            debug!(ip = %record.ip, "Recorded IP usage");

            // The new record is already written; an unreadable old one only loses the overwrite check.
            match previous.map(|old| decode_record(&old).and_then(|r| millis_to_datetime(r.last_use))) {
                Some(Ok(previous)) => Ok(Some(previous)),
                Some(Err(e)) => {
                    warn!(ip = %record.ip, "Discarding unreadable previous usage record: {}", e);
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| StoreError::OperationFailed(format!("Store task failed: {}", e)))?
    }

    async fn count_usage_in_window(&self, ip: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<u64> {
        let db = self.db.clone();
        let key = ip.as_bytes().to_vec();
        let (from, to) = (from.timestamp_millis(), to.timestamp_millis());

        tokio::task::spawn_blocking(move || {
            let value = db
                .get(&key)
                .map_err(|e| StoreError::OperationFailed(format!("Failed to get from SledDB: {}", e)))?;
            match value {
                Some(v) => {
                    let record = decode_record(&v)?;
                    Ok(u64::from(from <= record.last_use && record.last_use <= to))
                }
                None => Ok(0),
            }
        })
        .await
        .map_err(|e| StoreError::OperationFailed(format!("Store task failed: {}", e)))?
    }
}
