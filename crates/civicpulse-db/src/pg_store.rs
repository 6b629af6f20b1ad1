//! [`CityStore`] over `PostgreSQL`.
//!
//! Thin adapter from the store seam onto the per-table stores. Row decoding
//! failures surface as [`StoreError::CorruptRow`] or
//! [`StoreError::Serialization`]; everything else as
//! [`StoreError::Backend`].
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! to avoid requiring a live database at build time. All queries are
//! parameterized.

use std::time::Duration;

use civicpulse_core::config::InfrastructureConfig;
use civicpulse_core::store::{CityStore, StoreError};
use civicpulse_types::{Domain, Event, Metric, MetricName, ScenarioResult, ZoneId};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::DbError;
use crate::event_store::EventStore;
use crate::metric_store::MetricStore;
use crate::scenario_store::ScenarioStore;

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// `PostgreSQL`-backed city store. Cheap to clone; clones share one pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with the configured URL and pool size, then apply pending
    /// migrations so the three tables exist before the first append.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the URL is invalid, the server is
    /// unreachable, or a migration fails.
    pub async fn connect(config: &InfrastructureConfig) -> Result<Self, StoreError> {
        Ok(Self::open(config).await?)
    }

    async fn open(config: &InfrastructureConfig) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(connect_options(&config.postgres_url)?)
            .await?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations completed");
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all pooled connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }
}

fn connect_options(url: &str) -> Result<PgConnectOptions, DbError> {
    url.parse()
        .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))
}

fn decode<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::from))
        .collect()
}

impl CityStore for PgStore {
    async fn append_events(&self, events: &[Event]) -> Result<(), StoreError> {
        EventStore::new(&self.pool)
            .batch_insert(events)
            .await
            .map_err(StoreError::from)
    }

    async fn events_between(
        &self,
        start: i64,
        end: i64,
        domain: Option<Domain>,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = EventStore::new(&self.pool)
            .between(start, end, domain)
            .await?;
        decode(rows)
    }

    async fn latest_metric_timestamp(&self) -> Result<Option<i64>, StoreError> {
        Ok(MetricStore::new(&self.pool).latest_ts().await?)
    }

    async fn metrics_at(&self, ts: i64) -> Result<Vec<Metric>, StoreError> {
        let rows = MetricStore::new(&self.pool).at(ts).await?;
        decode(rows)
    }

    async fn append_metrics(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        Ok(MetricStore::new(&self.pool)
            .batch_insert(metrics)
            .await?)
    }

    async fn metric_series(
        &self,
        zone_id: &ZoneId,
        metric: MetricName,
        limit: usize,
    ) -> Result<Vec<Metric>, StoreError> {
        let rows = MetricStore::new(&self.pool)
            .series(zone_id, metric, limit)
            .await?;
        decode(rows)
    }

    async fn append_scenario(&self, result: &ScenarioResult) -> Result<(), StoreError> {
        Ok(ScenarioStore::new(&self.pool).insert(result).await?)
    }

    async fn recent_scenarios(&self, limit: usize) -> Result<Vec<ScenarioResult>, StoreError> {
        let rows = ScenarioStore::new(&self.pool).recent(limit).await?;
        decode(rows)
    }
}
