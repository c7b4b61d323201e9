use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistent per-IP last-use ledger backing the usage guard.
///
/// Implementations must make `upsert_usage` atomic per key: two writers for
/// the same IP never observe a torn record, and the last write wins.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Inserts or overwrites the last use of `ip`, returning the previous one.
    async fn upsert_usage(&self, ip: &str, now: DateTime<Utc>) -> StoreResult<Option<DateTime<Utc>>>;

    /// Number of usage records for `ip` with `from <= last_use <= to`.
    async fn count_usage_in_window(&self, ip: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<u64>;
}
