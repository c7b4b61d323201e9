use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz};
use diesel::{sql_query, QueryableByName, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use faucet_common::traits::UsageStore;
use faucet_common::{StoreError, StoreResult};
use std::time::Duration;
use tracing::{debug, info};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

// The subquery runs against the statement's snapshot, so it sees the row as it
// was before this upsert.
const UPSERT_USAGE: &str = "INSERT INTO ip_uses (ip, last_use) VALUES ($1, $2) \
     ON CONFLICT (ip) DO UPDATE SET last_use = EXCLUDED.last_use \
     RETURNING (SELECT last_use FROM ip_uses WHERE ip = $1) AS previous";

const COUNT_USAGE: &str = "SELECT COUNT(*) AS count FROM ip_uses WHERE ip = $1 AND last_use BETWEEN $2 AND $3";

type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(QueryableByName)]
struct PreviousUse {
    #[diesel(sql_type = Nullable<Timestamptz>)]
    previous: Option<DateTime<Utc>>,
}

#[derive(QueryableByName)]
struct UsageCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Usage ledger in a Postgres `ip_uses` table.
///
/// Every faucet instance pointed at the same database shares one ledger; the
/// single-statement upsert keeps concurrent writers from tearing a row.
pub struct PostgresUsageStore {
    pool: PgPool,
}

impl PostgresUsageStore {
    /// Connect, then bring the schema up to date.
    pub fn connect(database_url: &str, connection_timeout: Duration) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .connection_timeout(connection_timeout)
            .build(manager)
            .context("Failed to connect to Postgres")?;

        let mut conn = pool.get().context("Failed to get a Postgres connection")?;
        let conn: &mut PgConnection = &mut conn;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("Failed to migrate usage database: {}", e))?;
        info!(applied = applied.len(), "Usage database schema is up to date");

        Ok(Self { pool })
    }

    async fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn: PooledConnection<ConnectionManager<PgConnection>> =
                pool.get().map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::OperationFailed(format!("Store task failed: {}", e)))?
    }
}

#[async_trait]
impl UsageStore for PostgresUsageStore {
    async fn upsert_usage(&self, ip: &str, now: DateTime<Utc>) -> StoreResult<Option<DateTime<Utc>>> {
        let ip = ip.to_string();
        self.with_connection(move |conn| {
            let row: PreviousUse = sql_query(UPSERT_USAGE)
                .bind::<Text, _>(&ip)
                .bind::<Timestamptz, _>(now)
                .get_result(conn)
                .map_err(|e| StoreError::OperationFailed(format!("Failed to upsert usage: {}", e)))?;
            debug!(%ip, "Recorded IP usage");
            Ok(row.previous)
        })
        .await
    }

    async fn count_usage_in_window(&self, ip: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<u64> {
        let ip = ip.to_string();
        self.with_connection(move |conn| {
            let row: UsageCount = sql_query(COUNT_USAGE)
                .bind::<Text, _>(&ip)
                .bind::<Timestamptz, _>(from)
                .bind::<Timestamptz, _>(to)
                .get_result(conn)
                .map_err(|e| StoreError::OperationFailed(format!("Failed to count usage: {}", e)))?;
            u64::try_from(row.count).map_err(|_| StoreError::Corruption(format!("Negative usage count {}", row.count)))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    //! These run against a live server named by `FAUCET_TEST_DATABASE_URL`
    //! and pass trivially when it is unset.

    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    const DATABASE_URL_ENV: &str = "FAUCET_TEST_DATABASE_URL";

    fn test_store() -> Option<PostgresUsageStore> {
        let url = std::env::var(DATABASE_URL_ENV).ok()?;
        Some(PostgresUsageStore::connect(&url, Duration::from_secs(5)).unwrap())
    }

    /// Rows outlive a test run, so each test uses its own key.
    fn unique_ip(tag: &str) -> String {
        format!("{}-{}", tag, Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    #[tokio::test]
    async fn test_upsert_returns_previous_use() {
        let Some(store) = test_store() else { return };
        let ip = unique_ip("upsert");
        let first = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let second = first + ChronoDuration::hours(25);

        assert_eq!(store.upsert_usage(&ip, first).await.unwrap(), None);
        assert_eq!(store.upsert_usage(&ip, second).await.unwrap(), Some(first));
        assert_eq!(store.count_usage_in_window(&ip, second, second).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let Some(store) = test_store() else { return };
        let ip = unique_ip("window");
        let used = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        store.upsert_usage(&ip, used).await.unwrap();

        let day = ChronoDuration::hours(24);
        assert_eq!(store.count_usage_in_window(&ip, used, used + day).await.unwrap(), 1);
        assert_eq!(store.count_usage_in_window(&ip, used - day, used).await.unwrap(), 1);
        assert_eq!(
            store
                .count_usage_in_window(&ip, used + ChronoDuration::milliseconds(1), used + day)
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.count_usage_in_window(&unique_ip("other"), used - day, used).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_two_stores_share_one_ledger() {
        let (Some(a), Some(b)) = (test_store(), test_store()) else { return };
        let ip = unique_ip("shared");
        let used = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        assert_eq!(a.upsert_usage(&ip, used).await.unwrap(), None);
        assert_eq!(b.count_usage_in_window(&ip, used, used).await.unwrap(), 1);
        assert_eq!(b.upsert_usage(&ip, used + ChronoDuration::seconds(1)).await.unwrap(), Some(used));
    }

    #[test]
    fn test_unreachable_server_fails_to_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("postgres://faucet@127.0.0.1:{}/faucet", port);
        assert!(PostgresUsageStore::connect(&url, Duration::from_secs(1)).is_err());
    }
}
