//! The static zone registry.
//!
//! Ten zones describe the demo city. A deployment can replace them through
//! the `zones:` section of the config file; either way the registry is
//! built once at startup and only read afterwards.

use civicpulse_types::{Zone, ZoneId, ZoneType};

/// Immutable list of zone descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    /// Build a registry from an explicit zone list.
    pub const fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    /// Build the registry from a config override, falling back to the
    /// built-in zones when no override is present.
    pub fn from_override(zones: Option<Vec<Zone>>) -> Self {
        zones.map_or_else(Self::default_city, Self::new)
    }

    /// The built-in ten-zone demo city.
    pub fn default_city() -> Self {
        let zones = vec![
            zone("Z01", "CBD / Downtown", ZoneType::Commercial, 0.9, 0.45, 0.6),
            zone("Z02", "Residential North", ZoneType::Residential, 0.8, 0.55, 0.5),
            zone("Z03", "Residential South", ZoneType::Residential, 0.75, 0.50, 0.5),
            zone("Z04", "Industrial Belt", ZoneType::Industrial, 0.6, 0.60, 0.7),
            zone("Z05", "IT / Business Park", ZoneType::Commercial, 0.5, 0.40, 0.4),
            zone("Z06", "Education Hub", ZoneType::Mixed, 0.7, 0.45, 0.4),
            zone("Z07", "Healthcare Cluster", ZoneType::Mixed, 0.65, 0.50, 0.4),
            zone("Z08", "Transport Hub", ZoneType::Transport, 0.7, 0.55, 0.8),
            zone("Z09", "Market & Logistics", ZoneType::Logistics, 0.6, 0.50, 0.9),
            zone("Z10", "Agri Periphery", ZoneType::Agri, 0.35, 0.40, 0.6),
        ];
        Self { zones }
    }

    /// All zones in registry order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Look up a zone by identifier.
    pub fn get(&self, zone_id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.zone_id == zone_id)
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the registry holds no zones.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

fn zone(
    id: &str,
    name: &str,
    zone_type: ZoneType,
    pop_density: f64,
    baseline_vulnerability: f64,
    logistics_dependency: f64,
) -> Zone {
    Zone {
        zone_id: ZoneId::from(id),
        name: name.to_owned(),
        zone_type,
        pop_density,
        baseline_vulnerability,
        logistics_dependency,
    }
}
