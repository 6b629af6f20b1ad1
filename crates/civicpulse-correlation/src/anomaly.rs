//! Detection of broken cross-domain expectations.
//!
//! One rule is checked: rain normally slows traffic, so a recent window in
//! which rainfall more than doubled while speeds held at 90% or more of
//! their baseline is flagged.

use civicpulse_types::ZoneId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedRow, Column};
use crate::analysis::Analysis;
use crate::stats::mean;

/// Rows treated as the recent window.
pub const RECENT_ROWS: usize = 20;

/// Recent rainfall must exceed this multiple of the baseline.
const RAIN_SURGE_FACTOR: f64 = 2.0;

/// Recent speed must stay at or above this share of the baseline.
const SPEED_HELD_SHARE: f64 = 0.9;

/// Kind of anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// An outcome better than the usual relationship predicts.
    PositiveAnomaly,
}

/// A flagged departure from an expected relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Kind of anomaly.
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// What was observed.
    pub description: String,
    /// Plausible explanation.
    pub interpretation: String,
    /// The zone analysed, or `None` for the whole city.
    pub zone_id: Option<ZoneId>,
}

/// Anomalies found in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// The zone analysed, or `None` for the whole city.
    pub zone_id: Option<ZoneId>,
    /// Rows inspected.
    pub data_points: usize,
    /// Flagged anomalies, possibly empty.
    pub anomalies: Vec<Anomaly>,
}

fn column_mean(rows: &[AggregatedRow], column: Column) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.get(column)).collect();
    mean(&values)
}

/// Check the rain-versus-speed rule over rows ordered by `(bucket, zone)`.
///
/// The last [`RECENT_ROWS`] rows form the recent window and the rows before
/// them the baseline; with [`RECENT_ROWS`] rows or fewer, all rows form the
/// baseline.
pub fn detect_anomalies(rows: &[AggregatedRow], zone_id: Option<ZoneId>) -> Analysis<AnomalyReport> {
    if rows.is_empty() {
        return Analysis::insufficient("no aggregated rows in window");
    }

    let split = rows.len().saturating_sub(RECENT_ROWS);
    let (earlier, recent) = rows.split_at(split);
    let baseline = if rows.len() > RECENT_ROWS { earlier } else { rows };

    let mut anomalies = Vec::new();
    if let (Some(avg_rain), Some(avg_speed), Some(base_rain), Some(base_speed)) = (
        column_mean(recent, Column::Rainfall),
        column_mean(recent, Column::TrafficSpeed),
        column_mean(baseline, Column::Rainfall),
        column_mean(baseline, Column::TrafficSpeed),
    ) {
        if base_rain > 0.0
            && avg_rain > base_rain * RAIN_SURGE_FACTOR
            && avg_speed >= base_speed * SPEED_HELD_SHARE
        {
            let increase = (avg_rain / base_rain - 1.0) * 100.0;
            tracing::info!(
                zone_id = ?zone_id,
                avg_rain,
                base_rain,
                avg_speed,
                base_speed,
                "Rainfall surge without slowdown"
            );
            anomalies.push(Anomaly {
                kind: AnomalyKind::PositiveAnomaly,
                description: format!(
                    "Rainfall increased by {increase:.0}% but traffic speed maintained"
                ),
                interpretation: "Good drainage infrastructure or low traffic volume".to_owned(),
                zone_id: zone_id.clone(),
            });
        }
    }

    Analysis::Ok(AnomalyReport {
        zone_id,
        data_points: rows.len(),
        anomalies,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregate::COLUMN_COUNT;

    fn row(bucket: i64, rain: f64, speed: f64) -> AggregatedRow {
        let mut values = [None; COLUMN_COUNT];
        if let Some(slot) = values.get_mut(Column::Rainfall.index()) {
            *slot = Some(rain);
        }
        if let Some(slot) = values.get_mut(Column::TrafficSpeed.index()) {
            *slot = Some(speed);
        }
        AggregatedRow {
            bucket,
            zone_id: ZoneId::from("Z01"),
            values,
        }
    }

    fn window(baseline: usize, base_rain: f64, recent_rain: f64, recent_speed: f64) -> Vec<AggregatedRow> {
        let mut rows = Vec::new();
        let mut bucket = 0;
        for _ in 0..baseline {
            rows.push(row(bucket, base_rain, 40.0));
            bucket += 300;
        }
        for _ in 0..RECENT_ROWS {
            rows.push(row(bucket, recent_rain, recent_speed));
            bucket += 300;
        }
        rows
    }

    #[test]
    fn empty_window_is_insufficient() {
        assert!(detect_anomalies(&[], None).is_insufficient());
    }

    #[test]
    fn rain_surge_with_held_speed_is_flagged() {
        let rows = window(30, 1.0, 3.0, 38.0);
        let report = detect_anomalies(&rows, Some(ZoneId::from("Z01"))).ok().unwrap();
        assert_eq!(report.anomalies.len(), 1);
        let anomaly = report.anomalies.first().unwrap();
        assert_eq!(anomaly.kind, AnomalyKind::PositiveAnomaly);
        assert_eq!(anomaly.description, "Rainfall increased by 200% but traffic speed maintained");
        assert_eq!(anomaly.zone_id, Some(ZoneId::from("Z01")));
    }

    #[test]
    fn slowed_traffic_is_not_flagged() {
        // 35 is below 90% of the 40 km/h baseline.
        let rows = window(30, 1.0, 3.0, 35.0);
        let report = detect_anomalies(&rows, None).ok().unwrap();
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn dry_baseline_is_not_flagged() {
        let rows = window(30, 0.0, 5.0, 40.0);
        assert!(detect_anomalies(&rows, None).ok().unwrap().anomalies.is_empty());
    }

    #[test]
    fn short_window_compares_against_all_rows() {
        // With 20 rows or fewer the baseline includes the recent rows, so a
        // surge can never exceed twice itself.
        let rows = window(0, 1.0, 3.0, 40.0);
        let report = detect_anomalies(&rows, None).ok().unwrap();
        assert_eq!(report.data_points, RECENT_ROWS);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn anomaly_serializes_kind_as_type() {
        let rows = window(30, 1.0, 3.0, 40.0);
        let report = detect_anomalies(&rows, None).ok().unwrap();
        let json = serde_json::to_value(&report.anomalies).unwrap();
        assert_eq!(
            json.pointer("/0/type").and_then(serde_json::Value::as_str),
            Some("positive_anomaly")
        );
    }
}
