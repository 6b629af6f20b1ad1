//! Bucketing raw events into per-zone analysis rows.
//!
//! Events arrive at irregular timestamps and carry one domain each. For
//! analysis they are flattened into one row per `(bucket, zone)` with a
//! fixed set of nullable numeric columns. The bucket width is a fixed five
//! minutes regardless of the window or lag being analysed; this is a coarse
//! alignment, not a resampling.

use std::collections::BTreeMap;

use civicpulse_core::payload::{
    FIELD_AVG_SPEED, FIELD_DISEASE_CASES, FIELD_HUMIDITY, FIELD_PRICE_INDEX, FIELD_SUPPLY_UNITS,
    FIELD_TEMP_C, FIELD_VOLUME, FIELD_VULNERABILITY, optional_f64, rainfall,
};
use civicpulse_types::{Domain, Event, ZoneId};
use serde::{Deserialize, Serialize};

/// Width of an aggregation bucket in seconds.
pub const BUCKET_SECONDS: i64 = 300;

/// Width of an aggregation bucket in minutes.
pub const BUCKET_MINUTES: u32 = 5;

/// Number of analysis columns.
pub const COLUMN_COUNT: usize = 9;

/// An analysis column, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Mean vehicle volume.
    TrafficVolume,
    /// Mean traffic speed.
    TrafficSpeed,
    /// Mean temperature.
    Temp,
    /// Mean humidity.
    Humidity,
    /// Total rainfall.
    Rainfall,
    /// Mean population vulnerability.
    HealthVuln,
    /// Total reported disease cases.
    HealthCases,
    /// Mean food supply.
    AgriSupply,
    /// Mean food price index.
    AgriPrice,
}

impl Column {
    /// Every column in canonical order.
    pub const ALL: [Self; COLUMN_COUNT] = [
        Self::TrafficVolume,
        Self::TrafficSpeed,
        Self::Temp,
        Self::Humidity,
        Self::Rainfall,
        Self::HealthVuln,
        Self::HealthCases,
        Self::AgriSupply,
        Self::AgriPrice,
    ];

    /// Position in [`Column::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The `snake_case` name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrafficVolume => "traffic_volume",
            Self::TrafficSpeed => "traffic_speed",
            Self::Temp => "temp",
            Self::Humidity => "humidity",
            Self::Rainfall => "rainfall",
            Self::HealthVuln => "health_vuln",
            Self::HealthCases => "health_cases",
            Self::AgriSupply => "agri_supply",
            Self::AgriPrice => "agri_price",
        }
    }

    /// Lower-case words, e.g. `traffic volume`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::TrafficVolume => "traffic volume",
            Self::TrafficSpeed => "traffic speed",
            Self::Temp => "temp",
            Self::Humidity => "humidity",
            Self::Rainfall => "rainfall",
            Self::HealthVuln => "health vuln",
            Self::HealthCases => "health cases",
            Self::AgriSupply => "agri supply",
            Self::AgriPrice => "agri price",
        }
    }

    /// Title-case words, e.g. `Traffic Volume`.
    pub const fn title(self) -> &'static str {
        match self {
            Self::TrafficVolume => "Traffic Volume",
            Self::TrafficSpeed => "Traffic Speed",
            Self::Temp => "Temp",
            Self::Humidity => "Humidity",
            Self::Rainfall => "Rainfall",
            Self::HealthVuln => "Health Vuln",
            Self::HealthCases => "Health Cases",
            Self::AgriSupply => "Agri Supply",
            Self::AgriPrice => "Agri Price",
        }
    }

    /// Cumulative columns are summed within a bucket; the rest are averaged.
    pub const fn is_cumulative(self) -> bool {
        matches!(self, Self::Rainfall | Self::HealthCases)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor a timestamp to its bucket start.
pub const fn bucket_of(ts: i64) -> i64 {
    ts.div_euclid(BUCKET_SECONDS).saturating_mul(BUCKET_SECONDS)
}

/// One zone's readings within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    /// Bucket start (epoch seconds).
    pub bucket: i64,
    /// The zone.
    pub zone_id: ZoneId,
    /// Column values indexed by [`Column::index`]; `None` when no event in
    /// the bucket carried the field.
    pub values: [Option<f64>; COLUMN_COUNT],
}

impl AggregatedRow {
    /// The value of one column.
    pub fn get(&self, column: Column) -> Option<f64> {
        self.values.get(column.index()).copied().flatten()
    }
}

/// Column values extracted from one event. Fields absent from the payload
/// (or not numeric) are `None`.
pub fn extract(event: &Event) -> Vec<(Column, Option<f64>)> {
    let p = &event.payload;
    match event.domain {
        Domain::Traffic => vec![
            (Column::TrafficVolume, optional_f64(p, FIELD_VOLUME)),
            (Column::TrafficSpeed, optional_f64(p, FIELD_AVG_SPEED)),
        ],
        Domain::Weather => vec![
            (Column::Temp, optional_f64(p, FIELD_TEMP_C)),
            (Column::Humidity, optional_f64(p, FIELD_HUMIDITY)),
            (Column::Rainfall, rainfall(p)),
        ],
        Domain::Health => vec![
            (Column::HealthVuln, optional_f64(p, FIELD_VULNERABILITY)),
            (Column::HealthCases, optional_f64(p, FIELD_DISEASE_CASES)),
        ],
        Domain::Agri => vec![
            (Column::AgriSupply, optional_f64(p, FIELD_SUPPLY_UNITS)),
            (Column::AgriPrice, optional_f64(p, FIELD_PRICE_INDEX)),
        ],
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u32,
}

/// Flatten events into rows ordered by `(bucket, zone)`.
pub fn aggregate(events: &[Event]) -> Vec<AggregatedRow> {
    let mut buckets: BTreeMap<(i64, ZoneId), [Accumulator; COLUMN_COUNT]> = BTreeMap::new();

    for event in events {
        let slot = buckets
            .entry((bucket_of(event.ts), event.zone_id.clone()))
            .or_default();
        for (column, value) in extract(event) {
            if let (Some(value), Some(acc)) = (value, slot.get_mut(column.index())) {
                acc.sum += value;
                acc.count = acc.count.saturating_add(1);
            }
        }
    }

    buckets
        .into_iter()
        .map(|((bucket, zone_id), accumulators)| {
            let mut values = [None; COLUMN_COUNT];
            for ((column, acc), value) in Column::ALL.iter().zip(&accumulators).zip(&mut values) {
                if acc.count > 0 {
                    *value = Some(if column.is_cumulative() {
                        acc.sum
                    } else {
                        acc.sum / f64::from(acc.count)
                    });
                }
            }
            AggregatedRow {
                bucket,
                zone_id,
                values,
            }
        })
        .collect()
}

/// Non-null count of one column across rows.
pub fn coverage(rows: &[AggregatedRow], column: Column) -> usize {
    rows.iter().filter(|r| r.get(column).is_some()).count()
}

/// One column across rows, nulls preserved.
pub fn column_values(rows: &[AggregatedRow], column: Column) -> Vec<Option<f64>> {
    rows.iter().map(|r| r.get(column)).collect()
}

/// Keep only one zone's rows.
pub fn filter_zone(rows: Vec<AggregatedRow>, zone_id: Option<&ZoneId>) -> Vec<AggregatedRow> {
    match zone_id {
        Some(zone_id) => rows.into_iter().filter(|r| &r.zone_id == zone_id).collect(),
        None => rows,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(ts: i64, zone: &str, domain: Domain, payload: serde_json::Value) -> Event {
        Event {
            ts,
            zone_id: ZoneId::from(zone),
            domain,
            payload,
        }
    }

    #[test]
    fn buckets_floor_to_five_minutes() {
        assert_eq!(bucket_of(0), 0);
        assert_eq!(bucket_of(299), 0);
        assert_eq!(bucket_of(300), 300);
        assert_eq!(bucket_of(1_767_258_123), 1_767_258_000);
        assert_eq!(bucket_of(-1), -300);
    }

    #[test]
    fn rate_fields_average_and_cumulative_fields_sum() {
        let events = vec![
            event(10, "Z01", Domain::Weather, json!({ "temp_c": 30.0, "humidity": 50.0, "rain_mm": 2.0 })),
            event(200, "Z01", Domain::Weather, json!({ "temp_c": 32.0, "humidity": 60.0, "rain_mm": 3.0 })),
            event(250, "Z01", Domain::Health, json!({ "baseline_vulnerability": 0.4, "disease_cases": 4 })),
            event(260, "Z01", Domain::Health, json!({ "baseline_vulnerability": 0.6, "disease_cases": 6 })),
        ];
        let rows = aggregate(&events);
        assert_eq!(rows.len(), 1);
        let row = rows.first().unwrap();
        assert_eq!(row.get(Column::Temp), Some(31.0));
        assert_eq!(row.get(Column::Humidity), Some(55.0));
        assert_eq!(row.get(Column::Rainfall), Some(5.0));
        assert_eq!(row.get(Column::HealthCases), Some(10.0));
        assert!((row.get(Column::HealthVuln).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(row.get(Column::TrafficVolume), None);
    }

    #[test]
    fn absent_fields_stay_null() {
        let events = vec![event(0, "Z01", Domain::Health, json!({ "baseline_vulnerability": 0.3 }))];
        let rows = aggregate(&events);
        assert_eq!(rows.first().unwrap().get(Column::HealthCases), None);
    }

    #[test]
    fn legacy_rainfall_field_is_read() {
        let events = vec![event(0, "Z01", Domain::Weather, json!({ "temp_c": 30.0, "rainfall_mm": 7.5 }))];
        let rows = aggregate(&events);
        assert_eq!(rows.first().unwrap().get(Column::Rainfall), Some(7.5));
    }

    #[test]
    fn rows_are_ordered_by_bucket_then_zone() {
        let t = |ts, zone| event(ts, zone, Domain::Traffic, json!({ "volume": 1.0, "avg_speed": 1.0 }));
        let rows = aggregate(&[t(600, "Z01"), t(0, "Z02"), t(0, "Z01"), t(310, "Z03")]);
        let keys: Vec<(i64, &str)> = rows.iter().map(|r| (r.bucket, r.zone_id.as_str())).collect();
        assert_eq!(keys, vec![(0, "Z01"), (0, "Z02"), (300, "Z03"), (600, "Z01")]);
    }

    #[test]
    fn coverage_counts_non_null_values() {
        let events = vec![
            event(0, "Z01", Domain::Traffic, json!({ "volume": 5.0 })),
            event(300, "Z01", Domain::Traffic, json!({ "volume": 6.0, "avg_speed": 30.0 })),
        ];
        let rows = aggregate(&events);
        assert_eq!(coverage(&rows, Column::TrafficVolume), 2);
        assert_eq!(coverage(&rows, Column::TrafficSpeed), 1);
        assert_eq!(column_values(&rows, Column::TrafficSpeed), vec![None, Some(30.0)]);
    }

    #[test]
    fn canonical_order_matches_index() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
        assert!(Column::TrafficVolume < Column::AgriPrice);
    }
}
