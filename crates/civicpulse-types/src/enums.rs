//! Enumeration types for the CivicPulse data model.
//!
//! Every enum serializes to the lowercase `snake_case` string used in the
//! event store and the JSON API (`traffic`, `congestion_index`, ...), and
//! parses back from that same string via [`core::str::FromStr`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// One of the four monitored subject areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Domain {
    /// Road traffic: vehicle volume and average speed.
    Traffic,
    /// Weather: temperature, humidity, rainfall.
    Weather,
    /// Public health: population vulnerability, case counts.
    Health,
    /// Agriculture and food supply: supply units and price index.
    Agri,
}

impl Domain {
    /// All domains in canonical order.
    pub const ALL: [Self; 4] = [Self::Traffic, Self::Weather, Self::Health, Self::Agri];

    /// The storage name of this domain.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Traffic => "traffic",
            Self::Weather => "weather",
            Self::Health => "health",
            Self::Agri => "agri",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = UnknownVariant;

    /// Accepts the storage names plus the long form `agriculture`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traffic" => Ok(Self::Traffic),
            "weather" => Ok(Self::Weather),
            "health" => Ok(Self::Health),
            "agri" | "agriculture" => Ok(Self::Agri),
            other => Err(UnknownVariant {
                kind: "domain",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric names
// ---------------------------------------------------------------------------

/// A composite risk index derived per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MetricName {
    /// Road congestion derived from volume and speed.
    CongestionIndex,
    /// Heat stress derived from temperature and humidity.
    HeatRisk,
    /// Food supply stress derived from supply and price.
    FoodStress,
    /// Composite health risk from vulnerability, heat and congestion.
    HealthRisk,
}

impl MetricName {
    /// All metrics in the order they are written for each zone.
    pub const ALL: [Self; 4] = [
        Self::CongestionIndex,
        Self::HeatRisk,
        Self::FoodStress,
        Self::HealthRisk,
    ];

    /// The storage name of this metric.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CongestionIndex => "congestion_index",
            Self::HeatRisk => "heat_risk",
            Self::FoodStress => "food_stress",
            Self::HealthRisk => "health_risk",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "metric",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Zone types
// ---------------------------------------------------------------------------

/// Land-use classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ZoneType {
    /// Offices and retail.
    Commercial,
    /// Housing.
    Residential,
    /// Factories and heavy industry.
    Industrial,
    /// Mixed use (education, healthcare).
    Mixed,
    /// Stations and interchanges.
    Transport,
    /// Markets and distribution.
    Logistics,
    /// Farmland on the city edge.
    Agri,
}

impl ZoneType {
    /// Whether this zone type runs hotter than its surroundings.
    pub const fn is_heat_island(self) -> bool {
        matches!(self, Self::Industrial | Self::Commercial)
    }
}

// ---------------------------------------------------------------------------
// Scenario kinds
// ---------------------------------------------------------------------------

/// The fixed set of "what-if" interventions the scenario engine can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ScenarioKind {
    /// Cut peak-hour traffic by a percentage.
    ReducePeakTraffic,
    /// Raise temperature by a number of degrees.
    Heatwave,
    /// Drop food supply by a percentage.
    SupplyDisruption,
}

impl ScenarioKind {
    /// All scenario kinds.
    pub const ALL: [Self; 3] = [Self::ReducePeakTraffic, Self::Heatwave, Self::SupplyDisruption];

    /// The API name of this scenario.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReducePeakTraffic => "reduce_peak_traffic",
            Self::Heatwave => "heatwave",
            Self::SupplyDisruption => "supply_disruption",
        }
    }

    /// The parameter key this scenario reads its magnitude from.
    pub const fn parameter_key(self) -> &'static str {
        match self {
            Self::ReducePeakTraffic => "traffic_reduction_pct",
            Self::Heatwave => "temp_increase_c",
            Self::SupplyDisruption => "supply_drop_pct",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "scenario",
                value: s.to_owned(),
            })
    }
}
