//! The correlation engine: window selection plus the analysis stages.
//!
//! Each request reads raw events for its window from the store, aggregates
//! them, and runs the pure analysis for that request. Nothing is cached or
//! persisted.

use civicpulse_core::config::CorrelationConfig;
use civicpulse_core::store::CityStore;
use civicpulse_types::{Domain, UnknownVariant, ZoneId};

use crate::aggregate::{AggregatedRow, aggregate, filter_zone};
use crate::analysis::Analysis;
use crate::anomaly::{AnomalyReport, detect_anomalies};
use crate::error::CorrelationError;
use crate::impact::{ImpactEstimate, quantify_impact};
use crate::insights::{InsightReport, insight_report};
use crate::lag::{CausalityVerdict, LaggedCorrelation, causality, lagged_correlation};
use crate::matrix::{CorrelationMatrix, correlation_matrix};

/// Parse a domain name, accepting `agriculture` as well as `agri`.
///
/// # Errors
///
/// Returns [`CorrelationError::UnknownDomain`] for any other name.
pub fn parse_domain(name: &str) -> Result<Domain, CorrelationError> {
    name.parse()
        .map_err(|e: UnknownVariant| CorrelationError::UnknownDomain { name: e.value })
}

/// Cross-domain analysis over a store handle.
#[derive(Debug, Clone)]
pub struct CorrelationEngine<S> {
    store: S,
    config: CorrelationConfig,
}

impl<S: CityStore> CorrelationEngine<S> {
    /// Create an engine with explicit windows and lag bounds.
    pub const fn new(store: S, config: CorrelationConfig) -> Self {
        Self { store, config }
    }

    /// The windows and lag bounds in use.
    pub const fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    async fn rows(&self, window_minutes: u32, now: i64) -> Result<Vec<AggregatedRow>, CorrelationError> {
        let start = now.saturating_sub(i64::from(window_minutes).saturating_mul(60));
        let events = self.store.events_between(start, now, None).await?;
        let rows = aggregate(&events);
        tracing::debug!(
            window_minutes,
            events = events.len(),
            rows = rows.len(),
            "Aggregated events for analysis"
        );
        Ok(rows)
    }

    /// Pearson matrix over the matrix window, optionally for one zone.
    pub async fn correlation_matrix(
        &self,
        zone_id: Option<&ZoneId>,
        now: i64,
    ) -> Result<Analysis<CorrelationMatrix>, CorrelationError> {
        let rows = filter_zone(self.rows(self.config.matrix_window_minutes, now).await?, zone_id);
        Ok(correlation_matrix(&rows, zone_id.cloned()))
    }

    /// Lagged correlation between two domains over the lag window.
    ///
    /// `max_lag` defaults to the configured maximum, in buckets.
    pub async fn lagged_correlation(
        &self,
        source: &str,
        target: &str,
        max_lag: Option<u32>,
        now: i64,
    ) -> Result<Analysis<LaggedCorrelation>, CorrelationError> {
        let source = parse_domain(source)?;
        let target = parse_domain(target)?;
        let rows = self.rows(self.config.lag_window_minutes, now).await?;
        Ok(lagged_correlation(
            &rows,
            source,
            target,
            max_lag.unwrap_or(self.config.max_lag_buckets),
        ))
    }

    /// Causality heuristic from the best lag up to the causality bound.
    ///
    /// The verdict only says the data is consistent with `source` driving
    /// `target`; it is not a causal test.
    pub async fn causality(
        &self,
        source: &str,
        target: &str,
        now: i64,
    ) -> Result<Analysis<CausalityVerdict>, CorrelationError> {
        let lagged = self
            .lagged_correlation(source, target, Some(self.config.causality_max_lag_buckets), now)
            .await?;
        Ok(lagged.map(|l| causality(&l)))
    }

    /// Rain-versus-speed anomaly check over the anomaly window.
    pub async fn detect_anomalies(
        &self,
        zone_id: Option<&ZoneId>,
        now: i64,
    ) -> Result<Analysis<AnomalyReport>, CorrelationError> {
        let rows = filter_zone(self.rows(self.config.anomaly_window_minutes, now).await?, zone_id);
        Ok(detect_anomalies(&rows, zone_id.cloned()))
    }

    /// Coarse estimate of how a change in `source` moves `target`.
    pub async fn quantify_impact(
        &self,
        source: &str,
        target: &str,
        source_change: f64,
        now: i64,
    ) -> Result<Analysis<ImpactEstimate>, CorrelationError> {
        let lagged = self.lagged_correlation(source, target, None, now).await?;
        Ok(lagged.map(|l| quantify_impact(&l, source_change)))
    }

    /// Top correlations plus anomalies, optionally for one zone.
    pub async fn insights(
        &self,
        zone_id: Option<&ZoneId>,
        now: i64,
    ) -> Result<Analysis<InsightReport>, CorrelationError> {
        let matrix = match self.correlation_matrix(zone_id, now).await? {
            Analysis::Ok(matrix) => matrix,
            Analysis::InsufficientData { reason } => return Ok(Analysis::InsufficientData { reason }),
        };
        let anomalies = self
            .detect_anomalies(zone_id, now)
            .await?
            .ok()
            .map(|report| report.anomalies)
            .unwrap_or_default();
        let report = insight_report(&matrix, anomalies, zone_id.cloned());
        tracing::info!(
            zone_id = ?zone_id,
            insights = report.insights.len(),
            anomalies = report.anomalies.len(),
            "Built correlation insights"
        );
        Ok(Analysis::Ok(report))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civicpulse_core::generator::EventGenerator;
    use civicpulse_core::memory_store::MemoryStore;
    use civicpulse_core::zones::ZoneRegistry;
    use civicpulse_types::Event;
    use serde_json::json;

    use super::*;
    use crate::aggregate::{BUCKET_SECONDS, Column};

    const NOW: i64 = 1_767_258_000;

    fn engine(store: MemoryStore) -> CorrelationEngine<MemoryStore> {
        CorrelationEngine::new(store, CorrelationConfig::default())
    }

    /// Simulated feed: one batch per bucket for the last `buckets` buckets.
    async fn simulated(buckets: i64) -> MemoryStore {
        let store = MemoryStore::new();
        let mut generator = EventGenerator::seeded(ZoneRegistry::default_city(), 21);
        for b in (0..buckets).rev() {
            let ts = NOW - b * BUCKET_SECONDS;
            store.append_events(&generator.generate(ts)).await.unwrap();
        }
        store
    }

    fn signal(i: i64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        ((x * 12.9898).sin() * 43_758.545_3).fract() * 100.0
    }

    #[tokio::test]
    async fn unknown_domains_are_rejected_before_reading() {
        let engine = engine(MemoryStore::new());
        let err = engine.lagged_correlation("noise", "traffic", None, NOW).await;
        assert!(matches!(err, Err(CorrelationError::UnknownDomain { name }) if name == "noise"));
        assert!(engine.causality("traffic", "crime", NOW).await.is_err());
    }

    #[test]
    fn agriculture_alias_is_accepted() {
        assert_eq!(parse_domain("agriculture").ok(), Some(Domain::Agri));
        assert_eq!(parse_domain("agri").ok(), Some(Domain::Agri));
    }

    #[tokio::test]
    async fn empty_store_is_insufficient_everywhere() {
        let engine = engine(MemoryStore::new());
        assert!(engine.correlation_matrix(None, NOW).await.unwrap().is_insufficient());
        assert!(engine.lagged_correlation("traffic", "health", None, NOW).await.unwrap().is_insufficient());
        assert!(engine.causality("traffic", "health", NOW).await.unwrap().is_insufficient());
        assert!(engine.detect_anomalies(None, NOW).await.unwrap().is_insufficient());
        assert!(engine.quantify_impact("weather", "traffic", 5.0, NOW).await.unwrap().is_insufficient());
        assert!(engine.insights(None, NOW).await.unwrap().is_insufficient());
    }

    #[tokio::test]
    async fn matrix_over_simulated_feed() {
        let engine = engine(simulated(24).await);
        let matrix = engine.correlation_matrix(None, NOW).await.unwrap().ok().unwrap();
        assert_eq!(matrix.data_points, 240);
        assert!(matrix.columns.contains(&Column::TrafficVolume));
        // The generator never reports disease cases.
        assert!(!matrix.columns.contains(&Column::HealthCases));
        // Speed is derived from volume, so the two move in opposite directions.
        assert!(matrix.get(Column::TrafficVolume, Column::TrafficSpeed).unwrap() < -0.5);
    }

    #[tokio::test]
    async fn zone_filter_applies_before_row_check() {
        // Nine buckets give 90 rows city-wide but only nine for one zone.
        let engine = engine(simulated(9).await);
        let zone = ZoneId::from("Z01");
        assert!(engine.correlation_matrix(None, NOW).await.unwrap().ok().is_some());
        assert!(engine.correlation_matrix(Some(&zone), NOW).await.unwrap().is_insufficient());
    }

    #[tokio::test]
    async fn lag_recovered_from_stored_events() {
        let store = MemoryStore::new();
        let k = 6;
        let mut events = Vec::new();
        for b in 0..80_i64 {
            let ts = NOW - (79 - b) * BUCKET_SECONDS;
            events.push(Event {
                ts,
                zone_id: ZoneId::from("Z01"),
                domain: Domain::Weather,
                payload: json!({ "temp_c": signal(b), "humidity": 50.0 }),
            });
            if b >= k {
                events.push(Event {
                    ts,
                    zone_id: ZoneId::from("Z01"),
                    domain: Domain::Agri,
                    payload: json!({ "supply_units": signal(b - k), "price_index": 100.0 }),
                });
            }
        }
        store.append_events(&events).await.unwrap();

        let engine = engine(store);
        let lagged = engine
            .lagged_correlation("weather", "agriculture", None, NOW)
            .await
            .unwrap()
            .ok()
            .unwrap();
        assert_eq!(lagged.best_lag.lag_buckets, 6);
        assert!(lagged.best_lag.correlation > 0.999_999);

        let verdict = engine.causality("weather", "agri", NOW).await.unwrap().ok().unwrap();
        assert!(verdict.suggests_causality);
        assert_eq!(verdict.lag_minutes, 30);

        let impact = engine
            .quantify_impact("weather", "agriculture", 10.0, NOW)
            .await
            .unwrap()
            .ok()
            .unwrap();
        assert!((impact.estimated_target_change - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn insights_include_summary() {
        let engine = engine(simulated(24).await);
        let report = engine.insights(None, NOW).await.unwrap().ok().unwrap();
        assert!(!report.insights.is_empty());
        assert!(report.insights.len() <= 5);
        assert!(report.summary.starts_with(&format!(
            "Found {} significant correlations",
            report.insights.len()
        )));
    }
}
