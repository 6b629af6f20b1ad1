//! Core entity structs: zones, raw events, derived metrics, and scenario
//! records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Domain, MetricName, ScenarioKind, ZoneType};
use crate::ids::{ScenarioId, ZoneId};

/// A fixed city subdivision with static descriptive attributes.
///
/// Zones are loaded once at startup and never mutated. All ratio fields
/// are expected to lie in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Zone {
    /// Short zone code, e.g. `Z01`.
    pub zone_id: ZoneId,
    /// Human-readable name.
    pub name: String,
    /// Land-use classification.
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    /// Relative population density.
    pub pop_density: f64,
    /// Share of the population considered vulnerable.
    pub baseline_vulnerability: f64,
    /// How strongly the zone depends on external food logistics.
    pub logistics_dependency: f64,
}

/// A single raw sensor reading.
///
/// Events are append-only. The payload is a JSON object whose fields
/// depend on the [`Domain`]; it is parsed lazily by consumers so that a
/// malformed reading only affects the batch that reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Generation time, seconds since the Unix epoch.
    pub ts: i64,
    /// The zone the reading belongs to.
    pub zone_id: ZoneId,
    /// Which domain produced the reading.
    pub domain: Domain,
    /// Domain-specific numeric fields.
    pub payload: serde_json::Value,
}

/// One derived index value for one zone at one snapshot timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Metric {
    /// Snapshot timestamp shared by every metric of the batch.
    pub ts: i64,
    /// The zone this value describes.
    pub zone_id: ZoneId,
    /// Which index this is.
    pub metric_name: MetricName,
    /// Index value, always within `[0, 100]`.
    pub value: f64,
    /// Short derivation string citing the inputs.
    pub explanation: String,
}

/// The four composite indices of a single zone.
///
/// Used both for baselines read back from the metric store and for
/// scenario projections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ZoneIndices {
    /// Road congestion.
    pub congestion_index: f64,
    /// Heat stress.
    pub heat_risk: f64,
    /// Food supply stress.
    pub food_stress: f64,
    /// Composite health risk.
    pub health_risk: f64,
}

impl ZoneIndices {
    /// Read the value of one metric.
    pub const fn get(&self, metric: MetricName) -> f64 {
        match metric {
            MetricName::CongestionIndex => self.congestion_index,
            MetricName::HeatRisk => self.heat_risk,
            MetricName::FoodStress => self.food_stress,
            MetricName::HealthRisk => self.health_risk,
        }
    }

    /// Overwrite the value of one metric.
    pub const fn set(&mut self, metric: MetricName, value: f64) {
        match metric {
            MetricName::CongestionIndex => self.congestion_index = value,
            MetricName::HeatRisk => self.heat_risk = value,
            MetricName::FoodStress => self.food_stress = value,
            MetricName::HealthRisk => self.health_risk = value,
        }
    }

    /// Group a flat list of metric rows into per-zone index sets.
    ///
    /// Metrics that are absent for a zone read as `0.0`. When the same
    /// metric appears twice for a zone the later row wins.
    pub fn group_by_zone(metrics: &[Metric]) -> BTreeMap<ZoneId, Self> {
        let mut grouped: BTreeMap<ZoneId, Self> = BTreeMap::new();
        for metric in metrics {
            grouped
                .entry(metric.zone_id.clone())
                .or_default()
                .set(metric.metric_name, metric.value);
        }
        grouped
    }
}

/// Immutable record of one scenario invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScenarioResult {
    /// Unique record identifier.
    pub id: ScenarioId,
    /// Invocation time, seconds since the Unix epoch.
    pub ts: i64,
    /// Which intervention was applied.
    pub scenario_name: ScenarioKind,
    /// Parameters exactly as supplied by the caller.
    pub params: BTreeMap<String, serde_json::Value>,
    /// Timestamp of the metric snapshot used as baseline.
    pub baseline_ts: i64,
    /// Per-zone indices before the intervention.
    pub baseline: BTreeMap<ZoneId, ZoneIndices>,
    /// Per-zone indices after the intervention.
    pub scenario: BTreeMap<ZoneId, ZoneIndices>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(zone: &str, name: MetricName, value: f64) -> Metric {
        Metric {
            ts: 100,
            zone_id: ZoneId::from(zone),
            metric_name: name,
            value,
            explanation: String::new(),
        }
    }

    #[test]
    fn group_by_zone_fills_missing_metrics_with_zero() {
        let rows = vec![
            metric("Z01", MetricName::CongestionIndex, 80.0),
            metric("Z01", MetricName::HealthRisk, 50.0),
            metric("Z02", MetricName::HeatRisk, 12.5),
        ];
        let grouped = ZoneIndices::group_by_zone(&rows);

        assert_eq!(grouped.len(), 2);
        let z1 = grouped.get(&ZoneId::from("Z01")).copied().unwrap_or_default();
        assert!((z1.congestion_index - 80.0).abs() < f64::EPSILON);
        assert!((z1.health_risk - 50.0).abs() < f64::EPSILON);
        assert!(z1.food_stress.abs() < f64::EPSILON);
    }

    #[test]
    fn zone_type_field_is_named_type_in_json() {
        let zone = Zone {
            zone_id: ZoneId::from("Z10"),
            name: "Agri Periphery".to_owned(),
            zone_type: ZoneType::Agri,
            pop_density: 0.35,
            baseline_vulnerability: 0.4,
            logistics_dependency: 0.6,
        };
        let value = serde_json::to_value(&zone).ok();
        assert_eq!(
            value.as_ref().and_then(|v| v.get("type")).and_then(|v| v.as_str()),
            Some("agri")
        );
    }

    #[test]
    fn set_then_get_returns_value() {
        let mut indices = ZoneIndices::default();
        indices.set(MetricName::FoodStress, 42.0);
        assert!((indices.get(MetricName::FoodStress) - 42.0).abs() < f64::EPSILON);
    }
}
