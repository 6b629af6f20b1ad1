//! Coarse impact estimates from a lagged correlation.
//!
//! The estimate is `|r| * change * 0.1`. It is a rough linear heuristic
//! with a fixed scaling constant, not a fitted regression, and should be
//! presented as an order-of-magnitude hint.

use civicpulse_types::Domain;
use serde::{Deserialize, Serialize};

use crate::lag::LaggedCorrelation;

/// Fixed scaling between correlation-weighted source change and target
/// change.
pub const IMPACT_SCALE: f64 = 0.1;

/// Estimated effect of a source change on a target domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    /// Source domain.
    pub source_domain: Domain,
    /// Target domain.
    pub target_domain: Domain,
    /// Requested change in source units.
    pub source_change: f64,
    /// Estimated change in target units.
    pub estimated_target_change: f64,
    /// Estimate as a percentage of the source change; 0 for no change.
    pub impact_percentage: f64,
    /// The best-lag coefficient the estimate is based on.
    pub correlation_used: f64,
    /// Best lag in minutes.
    pub lag_minutes: u32,
    /// One-sentence summary.
    pub interpretation: String,
}

/// Estimate the target change for `source_change` using the best lag.
pub fn quantify_impact(lagged: &LaggedCorrelation, source_change: f64) -> ImpactEstimate {
    let r = lagged.best_lag.correlation;
    let estimate = r.abs() * source_change * IMPACT_SCALE;
    let impact_percentage = if source_change.abs() > 0.0 {
        estimate / source_change.abs() * 100.0
    } else {
        0.0
    };
    let source = lagged.source_domain.as_str();
    let target = lagged.target_domain.as_str();
    ImpactEstimate {
        source_domain: lagged.source_domain,
        target_domain: lagged.target_domain,
        source_change,
        estimated_target_change: estimate,
        impact_percentage,
        correlation_used: r,
        lag_minutes: lagged.best_lag.lag_minutes,
        interpretation: format!(
            "A {source_change} unit change in {source} may lead to approximately \
             {estimate:.2} unit change in {target} (correlation: {r:.2})"
        ),
    }
}
