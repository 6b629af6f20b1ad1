//! Composite risk index computation.
//!
//! For every zone the calculator takes the freshest reading of each domain
//! inside a trailing window and derives four indices:
//!
//! ```text
//! congestion  = clamp((volume/1200)*60 + (1 - speed/60)*50, 0, 100)
//! heat        = clamp((temp-25)*6 + (humidity-40)*0.9, 0, 100)
//! food        = clamp((1 - supply/1800)*70 + ((price-100)/30)*50, 0, 100)
//! health_risk = clamp(vulnerability*45 + heat*0.35 + congestion*0.20, 0, 100)
//! ```
//!
//! A zone only contributes when all four domains have a reading in the
//! window. A zone whose freshest payloads cannot be parsed is skipped for
//! this batch; the next scheduled run picks it up again.

use std::collections::BTreeMap;

use civicpulse_types::{Domain, Event, Metric, MetricName, ZoneId};

use crate::payload::{AgriReading, HealthReading, PayloadError, TrafficReading, WeatherReading};
use crate::store::{CityStore, StoreError};

/// Default trailing window searched for readings.
pub const DEFAULT_WINDOW_MINUTES: u32 = 60;

/// Lower bound of every index.
pub const INDEX_MIN: f64 = 0.0;

/// Upper bound of every index.
pub const INDEX_MAX: f64 = 100.0;

/// Clamp a raw index value into `[0, 100]`.
pub const fn clamp_index(value: f64) -> f64 {
    value.clamp(INDEX_MIN, INDEX_MAX)
}

/// Road congestion from vehicle volume and average speed.
pub const fn congestion_index(volume: f64, speed: f64) -> f64 {
    clamp_index((volume / 1200.0) * 60.0 + (1.0 - speed / 60.0) * 50.0)
}

/// Heat stress from temperature (C) and relative humidity (%).
pub const fn heat_risk(temp_c: f64, humidity: f64) -> f64 {
    clamp_index((temp_c - 25.0) * 6.0 + (humidity - 40.0) * 0.9)
}

/// Food stress from supply units and the price index.
pub const fn food_stress(supply_units: f64, price_index: f64) -> f64 {
    clamp_index((1.0 - supply_units / 1800.0) * 70.0 + ((price_index - 100.0) / 30.0) * 50.0)
}

/// Health risk from vulnerability and the already-derived heat and
/// congestion indices.
pub const fn health_risk(vulnerability: f64, heat: f64, congestion: f64) -> f64 {
    clamp_index(vulnerability * 45.0 + heat * 0.35 + congestion * 0.20)
}

/// The four parsed readings for one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneReadings {
    /// Freshest traffic reading.
    pub traffic: TrafficReading,
    /// Freshest weather reading.
    pub weather: WeatherReading,
    /// Freshest health reading.
    pub health: HealthReading,
    /// Freshest agriculture reading.
    pub agri: AgriReading,
}

impl ZoneReadings {
    /// Parse the freshest event of each domain.
    ///
    /// Returns `Ok(None)` when a domain has no reading at all.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when a present reading is malformed.
    pub fn from_latest(latest: &BTreeMap<Domain, &Event>) -> Result<Option<Self>, PayloadError> {
        let (Some(traffic), Some(weather), Some(health), Some(agri)) = (
            latest.get(&Domain::Traffic),
            latest.get(&Domain::Weather),
            latest.get(&Domain::Health),
            latest.get(&Domain::Agri),
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            traffic: TrafficReading::from_payload(&traffic.payload)?,
            weather: WeatherReading::from_payload(&weather.payload)?,
            health: HealthReading::from_payload(&health.payload)?,
            agri: AgriReading::from_payload(&agri.payload)?,
        }))
    }
}

/// Derive the four metric rows for one zone.
///
/// Pure: the same readings and timestamp always produce the same rows.
pub fn derive_zone_indices(zone_id: &ZoneId, readings: &ZoneReadings, ts: i64) -> [Metric; 4] {
    let TrafficReading { volume, avg_speed } = readings.traffic;
    let WeatherReading {
        temp_c, humidity, ..
    } = readings.weather;
    let AgriReading {
        supply_units,
        price_index,
    } = readings.agri;
    let vulnerability = readings.health.baseline_vulnerability;

    let congestion = congestion_index(volume, avg_speed);
    let heat = heat_risk(temp_c, humidity);
    let food = food_stress(supply_units, price_index);
    let health = health_risk(vulnerability, heat, congestion);

    let row = |metric_name: MetricName, value: f64, explanation: String| Metric {
        ts,
        zone_id: zone_id.clone(),
        metric_name,
        value,
        explanation,
    };

    [
        row(
            MetricName::CongestionIndex,
            congestion,
            format!("Derived from volume={volume:.0}, speed={avg_speed:.1} km/h"),
        ),
        row(
            MetricName::HeatRisk,
            heat,
            format!("Derived from temp={temp_c:.1}C, humidity={humidity:.0}%"),
        ),
        row(
            MetricName::FoodStress,
            food,
            format!("Derived from supply={supply_units:.0}, price_index={price_index:.1}"),
        ),
        row(
            MetricName::HealthRisk,
            health,
            format!("Baseline vuln={vulnerability:.2} + heat + congestion"),
        ),
    ]
}

/// Reduce a timestamp-ordered event list to the newest event per
/// `(zone, domain)`. On equal timestamps the later event in the list wins.
pub fn latest_per_zone(events: &[Event]) -> BTreeMap<ZoneId, BTreeMap<Domain, &Event>> {
    let mut latest: BTreeMap<ZoneId, BTreeMap<Domain, &Event>> = BTreeMap::new();
    for event in events {
        let slot = latest.entry(event.zone_id.clone()).or_default();
        match slot.get(&event.domain) {
            Some(existing) if existing.ts > event.ts => {}
            _ => {
                slot.insert(event.domain, event);
            }
        }
    }
    latest
}

/// Derive metric rows for every eligible zone from raw events.
///
/// Zones are processed in ascending id order. Incomplete zones are skipped
/// silently; malformed zones are skipped with a warning.
pub fn derive_batch(events: &[Event], ts: i64) -> Vec<Metric> {
    let mut rows = Vec::new();
    for (zone_id, latest) in latest_per_zone(events) {
        match ZoneReadings::from_latest(&latest) {
            Ok(Some(readings)) => rows.extend(derive_zone_indices(&zone_id, &readings, ts)),
            Ok(None) => {
                tracing::debug!(zone_id = %zone_id, "Zone lacks a reading for every domain, skipping");
            }
            Err(e) => {
                tracing::warn!(zone_id = %zone_id, error = %e, "Malformed payload, skipping zone");
            }
        }
    }
    rows
}

/// Joins the freshest readings and persists one metric snapshot.
#[derive(Debug, Clone)]
pub struct IndexCalculator<S> {
    store: S,
    window_minutes: u32,
}

impl<S: CityStore> IndexCalculator<S> {
    /// Create a calculator with the default 60-minute window.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            window_minutes: DEFAULT_WINDOW_MINUTES,
        }
    }

    /// Set the trailing window in minutes.
    #[must_use]
    pub const fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    /// Compute and persist a snapshot stamped with `now`.
    ///
    /// Returns the number of metric rows inserted (four per eligible
    /// zone). Nothing is written when no zone is eligible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if reading events or appending metrics fails.
    pub async fn compute(&self, now: i64) -> Result<usize, StoreError> {
        let start = now.saturating_sub(i64::from(self.window_minutes).saturating_mul(60));
        let events = self.store.events_between(start, now, None).await?;
        let rows = derive_batch(&events, now);

        if !rows.is_empty() {
            self.store.append_metrics(&rows).await?;
        }

        tracing::info!(
            ts = now,
            window_minutes = self.window_minutes,
            events = events.len(),
            inserted = rows.len(),
            "Computed index snapshot"
        );
        Ok(rows.len())
    }
}
