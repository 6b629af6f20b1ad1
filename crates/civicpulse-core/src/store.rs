//! The store seam consumed by every engine.
//!
//! The analytic core never talks to a database directly. It reads and
//! appends through [`CityStore`], which the `civicpulse-db` crate
//! implements for `PostgreSQL` and [`MemoryStore`] implements in-process.
//! Implementations must make each append atomic: either every row of the
//! batch is visible afterwards or none is.
//!
//! [`MemoryStore`]: crate::memory_store::MemoryStore

use std::future::Future;

use civicpulse_types::{Domain, Event, Metric, MetricName, ScenarioResult, ZoneId};
use serde::{Deserialize, Serialize};

/// A store operation failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the operation.
    #[error("store backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },

    /// A stored record could not be encoded or decoded.
    #[error("store serialization error: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A stored row holds a value the data model cannot represent.
    #[error("corrupt row: {message}")]
    CorruptRow {
        /// What was wrong with the row.
        message: String,
    },
}

/// Result of an operation that reads the latest metric snapshot.
///
/// Serializes with a `status` tag so API consumers can branch on it
/// before touching any other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Latest<T> {
    /// The snapshot exists and the computation ran.
    Ok(T),
    /// No metrics have been computed yet.
    #[serde(rename = "no_metrics_yet")]
    NoDataYet,
}

impl<T> Latest<T> {
    /// Return the payload, or `None` for [`Latest::NoDataYet`].
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::NoDataYet => None,
        }
    }

    /// Whether this is the no-data outcome.
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoDataYet)
    }
}

/// Query and append operations over events, metrics and scenario records.
///
/// All futures are `Send` so that jobs can run on a multi-threaded
/// runtime.
pub trait CityStore: Send + Sync {
    /// Append raw events as one atomic batch.
    fn append_events(&self, events: &[Event]) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Events with `start <= ts <= end`, optionally restricted to one
    /// domain, in timestamp order (append order on ties).
    fn events_between(
        &self,
        start: i64,
        end: i64,
        domain: Option<Domain>,
    ) -> impl Future<Output = Result<Vec<Event>, StoreError>> + Send;

    /// The newest metric snapshot timestamp, if any metrics exist.
    fn latest_metric_timestamp(&self) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Every metric row stamped with exactly `ts`.
    fn metrics_at(&self, ts: i64) -> impl Future<Output = Result<Vec<Metric>, StoreError>> + Send;

    /// Append metric rows as one atomic batch.
    fn append_metrics(&self, metrics: &[Metric]) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The `limit` newest values of one metric for one zone, newest first.
    fn metric_series(
        &self,
        zone_id: &ZoneId,
        metric: MetricName,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Metric>, StoreError>> + Send;

    /// Persist one scenario record.
    fn append_scenario(
        &self,
        result: &ScenarioResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The `limit` newest scenario records, newest first.
    fn recent_scenarios(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ScenarioResult>, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_outcome_serializes_with_status_tag() {
        let outcome: Latest<civicpulse_types::ZoneIndices> = Latest::NoDataYet;
        let json = serde_json::to_value(&outcome).ok();
        assert_eq!(
            json.as_ref().and_then(|v| v.get("status")).and_then(|v| v.as_str()),
            Some("no_metrics_yet")
        );
    }

    #[test]
    fn ready_outcome_flattens_payload() {
        let outcome = Latest::Ok(civicpulse_types::ZoneIndices {
            congestion_index: 1.0,
            ..Default::default()
        });
        let json = serde_json::to_value(&outcome).ok();
        assert_eq!(
            json.as_ref().and_then(|v| v.get("status")).and_then(|v| v.as_str()),
            Some("ok")
        );
        assert!(json.as_ref().and_then(|v| v.get("congestion_index")).is_some());
        assert!(!outcome.is_no_data());
    }
}
