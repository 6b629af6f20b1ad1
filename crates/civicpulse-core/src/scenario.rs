//! What-if scenario projection.
//!
//! A scenario takes the latest persisted index snapshot as its baseline,
//! applies one of three fixed transforms to every selected zone, and
//! stores the projection as an immutable [`ScenarioResult`].
//!
//! | Scenario | Parameter | Effect |
//! |----------|-----------|--------|
//! | `reduce_peak_traffic` | `traffic_reduction_pct` | congestion scaled by `1 - pct/100`; health risk relieved by 0.15 per point of congestion removed |
//! | `heatwave` | `temp_increase_c` | heat risk +8 per degree; health risk +4 per degree |
//! | `supply_disruption` | `supply_drop_pct` | food stress +0.6 per percent; health risk +0.15 per percent |
//!
//! All projected values are clamped to `[0, 100]` and are not rounded.

use std::collections::BTreeMap;

use civicpulse_types::{
    ScenarioId, ScenarioKind, ScenarioResult, UnknownVariant, ZoneId, ZoneIndices,
};
use serde_json::Value;

use crate::indices::clamp_index;
use crate::payload::coerce_f64;
use crate::store::{CityStore, Latest, StoreError};

/// Health relief per point of congestion removed.
const CONGESTION_HEALTH_RELIEF: f64 = 0.15;

/// Heat risk added per degree of warming.
const HEAT_PER_DEGREE: f64 = 8.0;

/// Health risk added per degree of warming.
const HEALTH_PER_DEGREE: f64 = 4.0;

/// Food stress added per percent of supply lost.
const FOOD_PER_SUPPLY_PCT: f64 = 0.6;

/// Health risk added per percent of supply lost.
const HEALTH_PER_SUPPLY_PCT: f64 = 0.15;

/// A scenario request was rejected or could not be persisted.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The scenario name is not one of the supported kinds.
    #[error("unknown scenario: {name:?}")]
    UnknownScenario {
        /// The rejected name.
        name: String,
    },

    /// The scenario parameter is present but not a finite number.
    #[error("invalid parameter {key}: {raw}")]
    InvalidParameter {
        /// The parameter key.
        key: &'static str,
        /// The raw JSON text of the value.
        raw: String,
    },

    /// Reading the baseline or persisting the result failed.
    #[error(transparent)]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Read the numeric parameter a scenario kind expects.
///
/// A missing parameter reads as 0.
///
/// # Errors
///
/// Returns [`ScenarioError::InvalidParameter`] when the value is present
/// but does not coerce to a finite number.
pub fn scenario_parameter(
    kind: ScenarioKind,
    params: &BTreeMap<String, Value>,
) -> Result<f64, ScenarioError> {
    let key = kind.parameter_key();
    match params.get(key) {
        None => Ok(0.0),
        Some(raw) => coerce_f64(raw).ok_or_else(|| ScenarioError::InvalidParameter {
            key,
            raw: raw.to_string(),
        }),
    }
}

/// Scale congestion down by `pct` percent and relieve health risk in
/// proportion to the congestion removed.
pub fn reduce_peak_traffic(base: ZoneIndices, pct: f64) -> ZoneIndices {
    let factor = (1.0 - pct / 100.0).max(0.0);
    let congestion = base.congestion_index * factor;
    let relief = CONGESTION_HEALTH_RELIEF * (base.congestion_index - congestion);
    clamp_all(ZoneIndices {
        congestion_index: congestion,
        health_risk: (base.health_risk - relief).max(0.0),
        ..base
    })
}

/// Raise heat and health risk by a temperature increase in degrees C.
pub fn heatwave(base: ZoneIndices, delta_c: f64) -> ZoneIndices {
    clamp_all(ZoneIndices {
        heat_risk: HEAT_PER_DEGREE.mul_add(delta_c, base.heat_risk),
        health_risk: HEALTH_PER_DEGREE.mul_add(delta_c, base.health_risk),
        ..base
    })
}

/// Raise food stress and health risk by a supply drop in percent.
pub fn supply_disruption(base: ZoneIndices, pct: f64) -> ZoneIndices {
    clamp_all(ZoneIndices {
        food_stress: FOOD_PER_SUPPLY_PCT.mul_add(pct, base.food_stress),
        health_risk: HEALTH_PER_SUPPLY_PCT.mul_add(pct, base.health_risk),
        ..base
    })
}

/// Apply the transform for `kind` to one zone's baseline.
pub fn project(kind: ScenarioKind, base: ZoneIndices, parameter: f64) -> ZoneIndices {
    match kind {
        ScenarioKind::ReducePeakTraffic => reduce_peak_traffic(base, parameter),
        ScenarioKind::Heatwave => heatwave(base, parameter),
        ScenarioKind::SupplyDisruption => supply_disruption(base, parameter),
    }
}

const fn clamp_all(indices: ZoneIndices) -> ZoneIndices {
    ZoneIndices {
        congestion_index: clamp_index(indices.congestion_index),
        heat_risk: clamp_index(indices.heat_risk),
        food_stress: clamp_index(indices.food_stress),
        health_risk: clamp_index(indices.health_risk),
    }
}

/// Projects scenarios against the latest snapshot and records them.
#[derive(Debug, Clone)]
pub struct ScenarioEngine<S> {
    store: S,
}

impl<S: CityStore> ScenarioEngine<S> {
    /// Create an engine over a store handle.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Run a named scenario at `now`.
    ///
    /// `zones` restricts the projection to the listed zones; `None` or an
    /// empty list selects every zone in the snapshot. Every call writes a
    /// new record, including repeats of an identical request.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownScenario`] or
    /// [`ScenarioError::InvalidParameter`] before touching the store, and
    /// [`ScenarioError::Store`] if reading or persisting fails.
    pub async fn run(
        &self,
        name: &str,
        params: BTreeMap<String, Value>,
        zones: Option<&[ZoneId]>,
        now: i64,
    ) -> Result<Latest<ScenarioResult>, ScenarioError> {
        let kind: ScenarioKind = name
            .parse()
            .map_err(|e: UnknownVariant| ScenarioError::UnknownScenario { name: e.value })?;
        let parameter = scenario_parameter(kind, &params)?;

        let Some(baseline_ts) = self.store.latest_metric_timestamp().await? else {
            tracing::info!(scenario = kind.as_str(), "No metric snapshot yet, skipping scenario");
            return Ok(Latest::NoDataYet);
        };

        let mut baseline = ZoneIndices::group_by_zone(&self.store.metrics_at(baseline_ts).await?);
        if let Some(selected) = zones.filter(|z| !z.is_empty()) {
            baseline.retain(|zone_id, _| selected.contains(zone_id));
        }

        let scenario = baseline
            .iter()
            .map(|(zone_id, base)| (zone_id.clone(), project(kind, *base, parameter)))
            .collect();

        let result = ScenarioResult {
            id: ScenarioId::new(),
            ts: now,
            scenario_name: kind,
            params,
            baseline_ts,
            baseline,
            scenario,
        };
        self.store.append_scenario(&result).await?;

        tracing::info!(
            scenario_id = %result.id,
            scenario = kind.as_str(),
            parameter,
            baseline_ts,
            zones = result.baseline.len(),
            "Recorded scenario projection"
        );
        Ok(Latest::Ok(result))
    }
}
