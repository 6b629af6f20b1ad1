//! Plain-language insights from the correlation matrix.

use civicpulse_types::ZoneId;
use serde::{Deserialize, Serialize};

use crate::aggregate::Column;
use crate::anomaly::Anomaly;
use crate::matrix::CorrelationMatrix;

/// Pairs with |r| at or below this are not reported.
pub const INSIGHT_MIN_R: f64 = 0.5;

/// Pairs with |r| above this are reported as strong.
const STRONG_INSIGHT_R: f64 = 0.7;

/// Most insights returned.
pub const MAX_INSIGHTS: usize = 5;

/// Strength label of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStrength {
    /// |r| above 0.5 and up to 0.7.
    Moderate,
    /// |r| above 0.7.
    Strong,
}

/// One notable relationship between two columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Earlier column in canonical order.
    pub source: Column,
    /// Later column in canonical order.
    pub target: Column,
    /// Headline.
    pub title: String,
    /// Pearson r.
    pub correlation: f64,
    /// Strength label.
    pub strength: InsightStrength,
    /// Explanatory sentence.
    pub description: String,
}

/// Insights plus anomalies for one zone or the whole city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    /// The zone analysed, or `None` for the whole city.
    pub zone_id: Option<ZoneId>,
    /// Strongest relationships, strongest first.
    pub insights: Vec<Insight>,
    /// Anomalies detected over the anomaly window.
    pub anomalies: Vec<Anomaly>,
    /// One-line count summary.
    pub summary: String,
}

/// Order a pair canonically so lookups ignore direction.
const fn canonical(a: Column, b: Column) -> (Column, Column) {
    if (a as usize) <= (b as usize) { (a, b) } else { (b, a) }
}

/// Explanatory sentence for a pair, from a fixed table or a generic
/// fallback.
pub fn describe(a: Column, b: Column, r: f64) -> String {
    let pct = r.abs() * 100.0;
    match canonical(a, b) {
        (Column::TrafficSpeed, Column::Rainfall) => {
            format!("Heavy rainfall ({pct:.0}% correlation) significantly impacts traffic speed")
        }
        (Column::TrafficVolume, Column::HealthCases) => format!(
            "High traffic volume correlates ({pct:.0}%) with health issues, likely due to air pollution"
        ),
        (Column::Temp, Column::HealthVuln) => {
            format!("Temperature extremes ({pct:.0}% correlation) affect population vulnerability")
        }
        (Column::Rainfall, Column::AgriSupply) => {
            format!("Rainfall patterns ({pct:.0}% correlation) directly impact agricultural supply")
        }
        (Column::HealthCases, Column::AgriPrice) => {
            format!("Food price fluctuations ({pct:.0}% correlation) correlate with health outcomes")
        }
        _ => format!(
            "Moderate correlation ({r:.2}) detected between {} and {}",
            a.label(),
            b.label()
        ),
    }
}

/// Headline for a pair.
pub fn title(a: Column, b: Column, r: f64) -> String {
    let direction = if r > 0.0 { "increases with" } else { "decreases with" };
    format!("{} {direction} {}", a.title(), b.title())
}

/// The strongest pairs of the matrix as insights.
pub fn top_insights(matrix: &CorrelationMatrix) -> Vec<Insight> {
    let mut strong: Vec<(Column, Column, f64)> = matrix
        .pairs()
        .into_iter()
        .filter(|(_, _, r)| r.abs() > INSIGHT_MIN_R)
        .collect();
    // Stable sort keeps canonical order among equal strengths.
    strong.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));

    strong
        .into_iter()
        .take(MAX_INSIGHTS)
        .map(|(a, b, r)| Insight {
            source: a,
            target: b,
            title: title(a, b, r),
            correlation: r,
            strength: if r.abs() > STRONG_INSIGHT_R {
                InsightStrength::Strong
            } else {
                InsightStrength::Moderate
            },
            description: describe(a, b, r),
        })
        .collect()
}

/// Assemble the report.
pub fn insight_report(
    matrix: &CorrelationMatrix,
    anomalies: Vec<Anomaly>,
    zone_id: Option<ZoneId>,
) -> InsightReport {
    let insights = top_insights(matrix);
    let summary = format!(
        "Found {} significant correlations and {} anomalies",
        insights.len(),
        anomalies.len()
    );
    InsightReport {
        zone_id,
        insights,
        anomalies,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn matrix(pairs: &[(Column, Column, f64)]) -> CorrelationMatrix {
        let mut columns: Vec<Column> = pairs.iter().flat_map(|(a, b, _)| [*a, *b]).collect();
        columns.sort();
        columns.dedup();
        let mut m: BTreeMap<Column, BTreeMap<Column, f64>> = BTreeMap::new();
        for (a, b, r) in pairs {
            m.entry(*a).or_default().insert(*b, *r);
            m.entry(*b).or_default().insert(*a, *r);
        }
        CorrelationMatrix {
            matrix: m,
            columns,
            data_points: 100,
            zone_id: None,
        }
    }

    #[test]
    fn templates_ignore_pair_direction() {
        let forward = describe(Column::Rainfall, Column::TrafficSpeed, -0.82);
        let reverse = describe(Column::TrafficSpeed, Column::Rainfall, -0.82);
        assert_eq!(forward, reverse);
        assert_eq!(forward, "Heavy rainfall (82% correlation) significantly impacts traffic speed");
    }

    #[test]
    fn unknown_pairs_use_fallback() {
        assert_eq!(
            describe(Column::TrafficVolume, Column::AgriSupply, 0.612),
            "Moderate correlation (0.61) detected between traffic volume and agri supply"
        );
    }

    #[test]
    fn titles_follow_sign() {
        assert_eq!(
            title(Column::TrafficVolume, Column::TrafficSpeed, -0.9),
            "Traffic Volume decreases with Traffic Speed"
        );
        assert_eq!(title(Column::Temp, Column::HealthVuln, 0.6), "Temp increases with Health Vuln");
    }

    #[test]
    fn keeps_top_five_above_threshold() {
        let m = matrix(&[
            (Column::TrafficVolume, Column::TrafficSpeed, -0.95),
            (Column::TrafficVolume, Column::Temp, 0.51),
            (Column::TrafficVolume, Column::Humidity, 0.5),
            (Column::Temp, Column::Humidity, 0.72),
            (Column::Temp, Column::HealthVuln, -0.66),
            (Column::Humidity, Column::Rainfall, 0.8),
            (Column::Rainfall, Column::AgriSupply, 0.9),
            (Column::AgriSupply, Column::AgriPrice, 0.2),
        ]);
        let insights = top_insights(&m);
        let strengths: Vec<f64> = insights.iter().map(|i| i.correlation.abs()).collect();
        assert_eq!(strengths, vec![0.95, 0.9, 0.8, 0.72, 0.66]);
        assert_eq!(insights.first().map(|i| i.strength), Some(InsightStrength::Strong));
        assert_eq!(insights.last().map(|i| i.strength), Some(InsightStrength::Moderate));
        assert!(insights.iter().all(|i| i.source < i.target));
    }

    #[test]
    fn summary_counts_insights_and_anomalies() {
        let m = matrix(&[(Column::Temp, Column::HealthVuln, 0.9)]);
        let report = insight_report(&m, Vec::new(), None);
        assert_eq!(report.summary, "Found 1 significant correlations and 0 anomalies");
        assert_eq!(
            report.insights.first().map(|i| i.description.as_str()),
            Some("Temperature extremes (90% correlation) affect population vulnerability")
        );
    }
}
