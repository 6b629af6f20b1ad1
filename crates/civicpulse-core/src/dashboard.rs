//! Read models backing the city dashboard.
//!
//! Everything here is read-only over the store. Views of the latest
//! snapshot return [`Latest::NoDataYet`] until the first index batch has
//! been written; values shown to people are rounded to two decimals.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use civicpulse_types::{Metric, MetricName, ScenarioResult, UnknownVariant, ZoneId, ZoneIndices};
use serde::{Deserialize, Serialize};

use crate::store::{CityStore, Latest, StoreError};

/// Points returned by [`Dashboard::metric_series`] when no limit is given.
pub const DEFAULT_SERIES_LIMIT: usize = 60;

/// Zones listed as health-risk alerts.
pub const ALERT_LIMIT: usize = 5;

/// Scenario records included in a report snapshot.
pub const REPORT_SCENARIO_LIMIT: usize = 5;

/// A dashboard query was rejected or the store failed.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The metric name is not one of the four indices.
    #[error("unknown metric: {name:?}")]
    UnknownMetric {
        /// The rejected name.
        name: String,
    },

    /// Reading from the store failed.
    #[error(transparent)]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Round to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A zone ranked by health risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    /// The zone.
    pub zone_id: ZoneId,
    /// Its health risk, rounded.
    pub health_risk: f64,
}

/// City-wide averages and the highest health risks at the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityKpis {
    /// Snapshot timestamp.
    pub ts: i64,
    /// Mean of each metric across zones, rounded.
    pub city: BTreeMap<MetricName, f64>,
    /// Top zones by health risk, highest first.
    pub alerts: Vec<HealthAlert>,
}

/// All four indices for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummaryRow {
    /// The zone.
    pub zone_id: ZoneId,
    /// Its indices, rounded. Missing metrics read as 0.
    #[serde(flatten)]
    pub indices: ZoneIndices,
}

/// Per-zone table at the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    /// Snapshot timestamp.
    pub ts: i64,
    /// One row per zone, ascending zone id.
    pub zones: Vec<ZoneSummaryRow>,
}

/// One point of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Snapshot timestamp.
    pub ts: i64,
    /// Metric value.
    pub value: f64,
}

/// Recent history of one metric for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// The zone.
    pub zone_id: ZoneId,
    /// The metric.
    pub metric: MetricName,
    /// Points in chronological order.
    pub series: Vec<SeriesPoint>,
}

/// Everything the report page shows, read at one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// Snapshot timestamp.
    pub ts: i64,
    /// City averages, rounded.
    pub city: BTreeMap<MetricName, f64>,
    /// Top zones by health risk.
    pub alerts: Vec<HealthAlert>,
    /// Per-zone indices.
    pub zones_summary: Vec<ZoneSummaryRow>,
    /// Most recent scenario records, newest first.
    pub scenarios: Vec<ScenarioResult>,
}

/// Dashboard queries over a store handle.
#[derive(Debug, Clone)]
pub struct Dashboard<S> {
    store: S,
}

impl<S: CityStore> Dashboard<S> {
    /// Create a dashboard over a store handle.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// City averages plus the top health-risk zones.
    pub async fn current_kpis(&self) -> Result<Latest<CityKpis>, DashboardError> {
        let Some(ts) = self.store.latest_metric_timestamp().await? else {
            return Ok(Latest::NoDataYet);
        };
        let metrics = self.store.metrics_at(ts).await?;
        Ok(Latest::Ok(CityKpis {
            ts,
            city: city_averages(&metrics),
            alerts: health_alerts(&metrics),
        }))
    }

    /// All four indices per zone at the latest snapshot.
    pub async fn zone_summary(&self) -> Result<Latest<ZoneSummary>, DashboardError> {
        let Some(ts) = self.store.latest_metric_timestamp().await? else {
            return Ok(Latest::NoDataYet);
        };
        let metrics = self.store.metrics_at(ts).await?;
        Ok(Latest::Ok(ZoneSummary {
            ts,
            zones: summary_rows(&ZoneIndices::group_by_zone(&metrics)),
        }))
    }

    /// The most recent `limit` values of one metric for one zone,
    /// oldest first. `None` uses [`DEFAULT_SERIES_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::UnknownMetric`] for a name outside the four
    /// indices.
    pub async fn metric_series(
        &self,
        zone_id: &ZoneId,
        metric: &str,
        limit: Option<usize>,
    ) -> Result<MetricSeries, DashboardError> {
        let metric: MetricName = metric
            .parse()
            .map_err(|e: UnknownVariant| DashboardError::UnknownMetric { name: e.value })?;
        let rows = self
            .store
            .metric_series(zone_id, metric, limit.unwrap_or(DEFAULT_SERIES_LIMIT))
            .await?;
        Ok(MetricSeries {
            zone_id: zone_id.clone(),
            metric,
            series: rows
                .iter()
                .rev()
                .map(|m| SeriesPoint {
                    ts: m.ts,
                    value: m.value,
                })
                .collect(),
        })
    }

    /// Latest scenario records, newest first.
    pub async fn recent_scenarios(&self, limit: usize) -> Result<Vec<ScenarioResult>, DashboardError> {
        Ok(self.store.recent_scenarios(limit).await?)
    }

    /// KPIs, alerts, zone table and recent scenarios in one read.
    pub async fn report(&self) -> Result<Latest<ReportSnapshot>, DashboardError> {
        let Some(ts) = self.store.latest_metric_timestamp().await? else {
            return Ok(Latest::NoDataYet);
        };
        let metrics = self.store.metrics_at(ts).await?;
        let by_zone = ZoneIndices::group_by_zone(&metrics);
        Ok(Latest::Ok(ReportSnapshot {
            ts,
            city: city_averages(&metrics),
            alerts: health_alerts(&metrics),
            zones_summary: summary_rows(&by_zone),
            scenarios: self.store.recent_scenarios(REPORT_SCENARIO_LIMIT).await?,
        }))
    }
}

/// Mean of each metric present in the rows, rounded.
fn city_averages(metrics: &[Metric]) -> BTreeMap<MetricName, f64> {
    let mut sums: BTreeMap<MetricName, (f64, u32)> = BTreeMap::new();
    for m in metrics {
        let entry = sums.entry(m.metric_name).or_insert((0.0, 0));
        entry.0 += m.value;
        entry.1 = entry.1.saturating_add(1);
    }
    sums.into_iter()
        .map(|(name, (sum, count))| (name, round2(sum / f64::from(count.max(1)))))
        .collect()
}

/// Zones ranked by `health_risk`, highest first, ties by zone id.
fn health_alerts(metrics: &[Metric]) -> Vec<HealthAlert> {
    let mut ranked: Vec<&Metric> = metrics
        .iter()
        .filter(|m| m.metric_name == MetricName::HealthRisk)
        .collect();
    ranked.sort_by(|a, b| match b.value.total_cmp(&a.value) {
        Ordering::Equal => a.zone_id.cmp(&b.zone_id),
        other => other,
    });
    ranked
        .into_iter()
        .take(ALERT_LIMIT)
        .map(|m| HealthAlert {
            zone_id: m.zone_id.clone(),
            health_risk: round2(m.value),
        })
        .collect()
}

fn summary_rows(by_zone: &BTreeMap<ZoneId, ZoneIndices>) -> Vec<ZoneSummaryRow> {
    by_zone
        .iter()
        .map(|(zone_id, indices)| ZoneSummaryRow {
            zone_id: zone_id.clone(),
            indices: ZoneIndices {
                congestion_index: round2(indices.congestion_index),
                heat_risk: round2(indices.heat_risk),
                food_stress: round2(indices.food_stress),
                health_risk: round2(indices.health_risk),
            },
        })
        .collect()
}
