//! Store doubles shared by the unit tests.

use civicpulse_types::{Domain, Event, Metric, MetricName, ScenarioResult, ZoneId};

use crate::memory_store::MemoryStore;
use crate::store::{CityStore, StoreError};

/// A [`CityStore`] whose metric and scenario appends always fail.
///
/// Reads and event appends go to the wrapped [`MemoryStore`], so tests can
/// seed data and then check that a failed write left nothing behind.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryStore,
}

impl ReadOnlyStore {
    fn rejected() -> StoreError {
        StoreError::Backend {
            message: "database is read-only".to_owned(),
        }
    }
}

impl CityStore for ReadOnlyStore {
    async fn append_events(&self, events: &[Event]) -> Result<(), StoreError> {
        self.inner.append_events(events).await
    }

    async fn events_between(
        &self,
        start: i64,
        end: i64,
        domain: Option<Domain>,
    ) -> Result<Vec<Event>, StoreError> {
        self.inner.events_between(start, end, domain).await
    }

    async fn latest_metric_timestamp(&self) -> Result<Option<i64>, StoreError> {
        self.inner.latest_metric_timestamp().await
    }

    async fn metrics_at(&self, ts: i64) -> Result<Vec<Metric>, StoreError> {
        self.inner.metrics_at(ts).await
    }

    async fn append_metrics(&self, _metrics: &[Metric]) -> Result<(), StoreError> {
        Err(Self::rejected())
    }

    async fn metric_series(
        &self,
        zone_id: &ZoneId,
        metric: MetricName,
        limit: usize,
    ) -> Result<Vec<Metric>, StoreError> {
        self.inner.metric_series(zone_id, metric, limit).await
    }

    async fn append_scenario(&self, _result: &ScenarioResult) -> Result<(), StoreError> {
        Err(Self::rejected())
    }

    async fn recent_scenarios(&self, limit: usize) -> Result<Vec<ScenarioResult>, StoreError> {
        self.inner.recent_scenarios(limit).await
    }
}
