//! Shared type definitions for the CivicPulse city analytics engine.
//!
//! This crate is the single source of truth for the data model shared by
//! the generator, the index calculator, the scenario engine, the
//! correlation engine and the store implementations. Types flow downstream
//! to `TypeScript` via `ts-rs` for the dashboard front end.
//!
//! # Modules
//!
//! - [`ids`] -- Zone codes and UUID-backed record identifiers
//! - [`enums`] -- Domains, metric names, zone types, scenario kinds
//! - [`structs`] -- Zones, raw events, derived metrics, scenario records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Domain, MetricName, ScenarioKind, UnknownVariant, ZoneType};
pub use ids::{ScenarioId, ZoneId};
pub use structs::{Event, Metric, ScenarioResult, Zone, ZoneIndices};
