//! Time-lagged correlation between two domains and the causality heuristic
//! built on it.
//!
//! Each domain is represented by the first column of its preference list
//! that has enough data:
//!
//! | Domain | Preference |
//! |--------|------------|
//! | traffic | `traffic_volume`, `traffic_speed` |
//! | weather | `temp`, `rainfall` |
//! | health | `health_vuln`, `health_cases` |
//! | agriculture | `agri_supply`, `agri_price` |
//!
//! For lag `k` the source value in bucket `b` is paired with the target
//! value in bucket `b + k` of the same zone.
//!
//! The causality verdict is a heuristic: a strong, significant lagged
//! correlation is consistent with, but never proof of, a causal link.

use std::collections::BTreeMap;

use civicpulse_types::{Domain, ZoneId};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedRow, BUCKET_MINUTES, BUCKET_SECONDS, Column, coverage};
use crate::analysis::Analysis;
use crate::stats::{correlation_p_value, pearson};

/// Fewest non-null values for a column to represent its domain.
pub const MIN_DOMAIN_COVERAGE: usize = 6;

/// A lag is evaluated only with more pairs than this.
pub const MIN_LAG_PAIRS: usize = 5;

/// Significance level for the causality heuristic.
const SIGNIFICANCE: f64 = 0.05;

/// Significance level for high confidence.
const HIGH_SIGNIFICANCE: f64 = 0.01;

/// Smallest |r| that suggests causality.
const CAUSAL_MIN_R: f64 = 0.3;

/// Smallest |r| for high confidence.
const HIGH_CONFIDENCE_MIN_R: f64 = 0.5;

/// Ordered candidate columns representing a domain.
pub const fn domain_columns(domain: Domain) -> [Column; 2] {
    match domain {
        Domain::Traffic => [Column::TrafficVolume, Column::TrafficSpeed],
        Domain::Weather => [Column::Temp, Column::Rainfall],
        Domain::Health => [Column::HealthVuln, Column::HealthCases],
        Domain::Agri => [Column::AgriSupply, Column::AgriPrice],
    }
}

/// The first preferred column of `domain` with adequate coverage.
pub fn representative_column(rows: &[AggregatedRow], domain: Domain) -> Option<Column> {
    domain_columns(domain)
        .into_iter()
        .find(|c| coverage(rows, *c) >= MIN_DOMAIN_COVERAGE)
}

/// Strength tier of a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    /// |r| below 0.4.
    Weak,
    /// |r| from 0.4 up to 0.7.
    Moderate,
    /// |r| of 0.7 or more.
    Strong,
}

impl Strength {
    /// Classify a coefficient.
    pub fn of(r: f64) -> Self {
        let r = r.abs();
        if r >= 0.7 {
            Self::Strong
        } else if r >= 0.4 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    /// Capitalized name.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Weak => "Weak",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
        }
    }
}

/// Correlation at one lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagPoint {
    /// Lag in buckets.
    pub lag_buckets: u32,
    /// Lag in minutes.
    pub lag_minutes: u32,
    /// Pearson r, 0 when undefined.
    pub correlation: f64,
    /// Two-sided p-value, 1 when undefined.
    pub p_value: f64,
    /// Pairs used.
    pub data_points: usize,
}

/// Lagged correlation between two domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggedCorrelation {
    /// Source domain.
    pub source_domain: Domain,
    /// Target domain.
    pub target_domain: Domain,
    /// Column representing the source.
    pub source_metric: Column,
    /// Column representing the target.
    pub target_metric: Column,
    /// Every evaluated lag, ascending.
    pub lag_correlations: Vec<LagPoint>,
    /// Lag with the largest |r|; the earliest wins ties.
    pub best_lag: LagPoint,
    /// Strength tier of the best lag.
    pub strength: Strength,
    /// Human-readable summary of the best lag.
    pub interpretation: String,
}

/// Source/target pairs for one lag, keyed by bucket within each zone.
fn lag_pairs(
    rows: &[AggregatedRow],
    source: Column,
    target: Column,
    lag_buckets: u32,
) -> Vec<(f64, f64)> {
    let targets: BTreeMap<(&ZoneId, i64), f64> = rows
        .iter()
        .filter_map(|r| Some(((&r.zone_id, r.bucket), r.get(target)?)))
        .collect();
    let offset = i64::from(lag_buckets).saturating_mul(BUCKET_SECONDS);

    rows.iter()
        .filter_map(|r| {
            let x = r.get(source)?;
            let y = targets.get(&(&r.zone_id, r.bucket.saturating_add(offset)))?;
            Some((x, *y))
        })
        .collect()
}

/// Correlation at one lag, or `None` with too few pairs.
pub fn correlation_at_lag(
    rows: &[AggregatedRow],
    source: Column,
    target: Column,
    lag_buckets: u32,
) -> Option<LagPoint> {
    let pairs = lag_pairs(rows, source, target, lag_buckets);
    if pairs.len() <= MIN_LAG_PAIRS {
        return None;
    }
    let (correlation, p_value) = pearson(&pairs)
        .map_or((0.0, 1.0), |r| (r, correlation_p_value(r, pairs.len())));
    Some(LagPoint {
        lag_buckets,
        lag_minutes: lag_buckets.saturating_mul(BUCKET_MINUTES),
        correlation,
        p_value,
        data_points: pairs.len(),
    })
}

/// Describe the best lag in one sentence.
pub fn interpret(best: &LagPoint, source: Domain, target: Domain) -> String {
    let strength = Strength::of(best.correlation);
    let direction = if best.correlation > 0.0 {
        "positive"
    } else {
        "negative"
    };
    let lag = if best.lag_buckets == 0 {
        "immediate".to_owned()
    } else {
        format!("{} minute(s)", best.lag_minutes)
    };
    format!(
        "{} {direction} correlation (r={:.2}) with {lag} lag: {} changes affect {}",
        strength.title(),
        best.correlation,
        source.as_str(),
        target.as_str()
    )
}

/// Correlate `source` against `target` for every lag in `0..=max_lag`.
pub fn lagged_correlation(
    rows: &[AggregatedRow],
    source: Domain,
    target: Domain,
    max_lag: u32,
) -> Analysis<LaggedCorrelation> {
    let (Some(source_metric), Some(target_metric)) = (
        representative_column(rows, source),
        representative_column(rows, target),
    ) else {
        return Analysis::insufficient(format!(
            "no column with {MIN_DOMAIN_COVERAGE} values for {} or {}",
            source.as_str(),
            target.as_str()
        ));
    };

    let lag_correlations: Vec<LagPoint> = (0..=max_lag)
        .filter_map(|k| correlation_at_lag(rows, source_metric, target_metric, k))
        .collect();

    // Strict comparison keeps the earliest lag on ties.
    let best = lag_correlations.iter().fold(None, |best: Option<&LagPoint>, point| match best {
        Some(b) if point.correlation.abs() <= b.correlation.abs() => Some(b),
        _ => Some(point),
    });
    let Some(best_lag) = best.copied() else {
        return Analysis::insufficient(format!(
            "no lag up to {max_lag} buckets has more than {MIN_LAG_PAIRS} pairs"
        ));
    };

    Analysis::Ok(LaggedCorrelation {
        source_domain: source,
        target_domain: target,
        source_metric,
        target_metric,
        strength: Strength::of(best_lag.correlation),
        interpretation: interpret(&best_lag, source, target),
        best_lag,
        lag_correlations,
    })
}

/// Confidence tier of a causality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// p < 0.01 and |r| > 0.5.
    High,
    /// p < 0.05.
    Medium,
    /// Anything else.
    Low,
}

/// Heuristic verdict on whether `source` drives `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalityVerdict {
    /// Source domain.
    pub source_domain: Domain,
    /// Target domain.
    pub target_domain: Domain,
    /// True when the best lag is significant and not weak.
    pub suggests_causality: bool,
    /// Pearson r at the best lag.
    pub correlation: f64,
    /// p-value at the best lag.
    pub p_value: f64,
    /// Best lag in buckets.
    pub lag_buckets: u32,
    /// Best lag in minutes.
    pub lag_minutes: u32,
    /// Confidence tier.
    pub confidence: Confidence,
}

/// Derive the causality verdict from a lagged correlation.
pub fn causality(lagged: &LaggedCorrelation) -> CausalityVerdict {
    let LagPoint {
        correlation,
        p_value,
        lag_buckets,
        lag_minutes,
        ..
    } = lagged.best_lag;
    let r = correlation.abs();
    let confidence = if p_value < HIGH_SIGNIFICANCE && r > HIGH_CONFIDENCE_MIN_R {
        Confidence::High
    } else if p_value < SIGNIFICANCE {
        Confidence::Medium
    } else {
        Confidence::Low
    };
    CausalityVerdict {
        source_domain: lagged.source_domain,
        target_domain: lagged.target_domain,
        suggests_causality: p_value < SIGNIFICANCE && r > CAUSAL_MIN_R,
        correlation,
        p_value,
        lag_buckets,
        lag_minutes,
        confidence,
    }
}
