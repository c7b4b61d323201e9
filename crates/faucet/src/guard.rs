//! Per-IP rate limiting over the persistent usage ledger.
//!
//! `check` runs before any chain work and `commit` only after a successful
//! broadcast. Between the two the IP holds a `UsageTicket`; a second request
//! from the same IP in this process is turned away until the ticket drops.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use faucet_common::traits::UsageStore;
use faucet_common::StoreError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IP {0} already received funds within the request interval")]
    RateLimited(String),

    #[error("Usage store error: {0}")]
    Store(#[from] StoreError),
}

/// Claim on an IP for the duration of one dispense. Released on drop.
#[derive(Debug)]
pub struct UsageTicket {
    ip: String,
    in_flight: Arc<DashMap<String, ()>>,
}

impl UsageTicket {
    pub fn ip(&self) -> &str {
        &self.ip
    }
}

impl Drop for UsageTicket {
    fn drop(&mut self) {
        self.in_flight.remove(&self.ip);
    }
}

#[derive(Clone)]
pub struct UsageGuard {
    store: Arc<dyn UsageStore>,
    interval: Duration,
    in_flight: Arc<DashMap<String, ()>>,
}

impl UsageGuard {
    pub fn new(store: Arc<dyn UsageStore>, interval: Duration) -> Self {
        Self { store, interval, in_flight: Arc::new(DashMap::new()) }
    }

    pub async fn check(&self, ip: &str) -> Result<UsageTicket, GuardError> {
        self.check_at(ip, Utc::now()).await
    }

    /// Deny if `ip` has a recorded use in `[now - interval, now]` or another
    /// request from it is still in flight.
    pub async fn check_at(&self, ip: &str, now: DateTime<Utc>) -> Result<UsageTicket, GuardError> {
        match self.in_flight.entry(ip.to_string()) {
            Entry::Occupied(_) => {
                debug!(ip, "Request from this IP already in flight");
                return Err(GuardError::RateLimited(ip.to_string()));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(());
            }
        }
        let ticket = UsageTicket { ip: ip.to_string(), in_flight: self.in_flight.clone() };

        let count = self.store.count_usage_in_window(ip, now - self.interval, now).await?;
        if count > 0 {
            return Err(GuardError::RateLimited(ip.to_string()));
        }
        Ok(ticket)
    }

    pub async fn commit(&self, ticket: UsageTicket) -> Result<(), StoreError> {
        self.commit_at(ticket, Utc::now()).await
    }

    /// Record the use and release the ticket.
    pub async fn commit_at(&self, ticket: UsageTicket, now: DateTime<Utc>) -> Result<(), StoreError> {
        let previous = self.store.upsert_usage(ticket.ip(), now).await?;
        if let Some(previous) = previous {
            if previous > now - self.interval {
                // Another instance sharing the store paid this IP meanwhile.
                warn!(ip = ticket.ip(), %previous, "IP usage overwritten within the request interval");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use faucet_common::StoreResult;
    use faucet_storage::MemoryUsageStore;

    fn guard() -> (UsageGuard, Arc<MemoryUsageStore>) {
        let store = Arc::new(MemoryUsageStore::new());
        (UsageGuard::new(store.clone(), Duration::hours(24)), store)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_allow_then_deny_within_window() {
        let (guard, store) = guard();

        let ticket = guard.check_at("1.2.3.4", t0()).await.unwrap();
        guard.commit_at(ticket, t0()).await.unwrap();
        assert_eq!(store.last_use("1.2.3.4"), Some(t0()));

        let second = guard.check_at("1.2.3.4", t0() + Duration::seconds(1)).await;
        assert!(matches!(second, Err(GuardError::RateLimited(_))));

        // Exactly at the edge of the window the record still counts.
        let edge = guard.check_at("1.2.3.4", t0() + Duration::hours(24)).await;
        assert!(matches!(edge, Err(GuardError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_allow_after_window() {
        let (guard, _) = guard();
        let ticket = guard.check_at("1.2.3.4", t0()).await.unwrap();
        guard.commit_at(ticket, t0()).await.unwrap();

        let later = t0() + Duration::hours(24) + Duration::seconds(1);
        assert!(guard.check_at("1.2.3.4", later).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_ips_are_independent() {
        let (guard, _) = guard();
        let ticket = guard.check_at("1.2.3.4", t0()).await.unwrap();
        guard.commit_at(ticket, t0()).await.unwrap();

        assert!(guard.check_at("5.6.7.8", t0()).await.is_ok());
    }

    #[tokio::test]
    async fn test_in_flight_ticket_blocks_and_releases() {
        let (guard, _) = guard();

        let ticket = guard.check_at("1.2.3.4", t0()).await.unwrap();
        assert!(matches!(guard.check_at("1.2.3.4", t0()).await, Err(GuardError::RateLimited(_))));

        // A failed dispense drops its ticket without committing.
        drop(ticket);
        assert!(guard.check_at("1.2.3.4", t0()).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_checks_admit_one() {
        let (guard, _) = guard();
        let attempts = (0..16).map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.check_at("9.9.9.9", t0()).await })
        });
        let results = futures::future::join_all(attempts).await;

        let tickets: Vec<UsageTicket> = results.into_iter().filter_map(|r| r.unwrap().ok()).collect();
        assert_eq!(tickets.len(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl UsageStore for FailingStore {
        async fn upsert_usage(&self, _ip: &str, _now: DateTime<Utc>) -> StoreResult<Option<DateTime<Utc>>> {
            Err(StoreError::ConnectionFailed("down".into()))
        }

        async fn count_usage_in_window(&self, _ip: &str, _from: DateTime<Utc>, _to: DateTime<Utc>) -> StoreResult<u64> {
            Err(StoreError::ConnectionFailed("down".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed_and_releases() {
        let guard = UsageGuard::new(Arc::new(FailingStore), Duration::hours(24));

        assert!(matches!(guard.check_at("1.2.3.4", t0()).await, Err(GuardError::Store(_))));
        // The claim did not leak.
        assert!(guard.in_flight.is_empty());
    }
}
