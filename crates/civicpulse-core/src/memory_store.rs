//! In-process [`CityStore`] backed by vectors behind a `tokio` lock.
//!
//! Used by the test suites and by the engine's `memory` storage backend.
//! Cloning a [`MemoryStore`] yields another handle onto the same data.

use std::sync::Arc;

use civicpulse_types::{Domain, Event, Metric, MetricName, ScenarioResult, ZoneId};
use tokio::sync::RwLock;

use crate::store::{CityStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    events: Vec<Event>,
    metrics: Vec<Metric>,
    scenarios: Vec<ScenarioResult>,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub async fn event_count(&self) -> usize {
        self.tables.read().await.events.len()
    }

    /// Number of stored metric rows.
    pub async fn metric_count(&self) -> usize {
        self.tables.read().await.metrics.len()
    }

    /// Number of stored scenario records.
    pub async fn scenario_count(&self) -> usize {
        self.tables.read().await.scenarios.len()
    }
}

/// Merge a timestamp-sorted batch into the timestamp-sorted table.
///
/// Only the stored suffix newer than the batch's first event is touched.
/// Stored events precede batch events on equal timestamps.
fn merge_sorted(table: &mut Vec<Event>, batch: Vec<Event>) {
    let Some(first_ts) = batch.first().map(|e| e.ts) else {
        return;
    };
    let split = table.partition_point(|e| e.ts <= first_ts);
    let tail = table.split_off(split);
    table.reserve(tail.len().saturating_add(batch.len()));

    let mut tail = tail.into_iter().peekable();
    let mut batch = batch.into_iter().peekable();
    loop {
        let take_stored = match (tail.peek(), batch.peek()) {
            (Some(stored), Some(new)) => stored.ts <= new.ts,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        table.extend(if take_stored { tail.next() } else { batch.next() });
    }
}

impl CityStore for MemoryStore {
    async fn append_events(&self, events: &[Event]) -> Result<(), StoreError> {
        let mut batch = events.to_vec();
        // Stable sort keeps batch order among equal timestamps.
        batch.sort_by_key(|e| e.ts);
        merge_sorted(&mut self.tables.write().await.events, batch);
        Ok(())
    }

    async fn events_between(
        &self,
        start: i64,
        end: i64,
        domain: Option<Domain>,
    ) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .iter()
            .filter(|e| e.ts >= start && e.ts <= end)
            .filter(|e| domain.is_none_or(|d| e.domain == d))
            .cloned()
            .collect())
    }

    async fn latest_metric_timestamp(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.tables.read().await.metrics.iter().map(|m| m.ts).max())
    }

    async fn metrics_at(&self, ts: i64) -> Result<Vec<Metric>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.metrics.iter().filter(|m| m.ts == ts).cloned().collect())
    }

    async fn append_metrics(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        self.tables.write().await.metrics.extend_from_slice(metrics);
        Ok(())
    }

    async fn metric_series(
        &self,
        zone_id: &ZoneId,
        metric: MetricName,
        limit: usize,
    ) -> Result<Vec<Metric>, StoreError> {
        let tables = self.tables.read().await;
        let mut series: Vec<Metric> = tables
            .metrics
            .iter()
            .filter(|m| &m.zone_id == zone_id && m.metric_name == metric)
            .cloned()
            .collect();
        series.sort_by(|a, b| b.ts.cmp(&a.ts));
        series.truncate(limit);
        Ok(series)
    }

    async fn append_scenario(&self, result: &ScenarioResult) -> Result<(), StoreError> {
        self.tables.write().await.scenarios.push(result.clone());
        Ok(())
    }

    async fn recent_scenarios(&self, limit: usize) -> Result<Vec<ScenarioResult>, StoreError> {
        let tables = self.tables.read().await;
        let mut recent: Vec<ScenarioResult> = tables.scenarios.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.ts.cmp(&a.ts));
        recent.truncate(limit);
        Ok(recent)
    }
}
