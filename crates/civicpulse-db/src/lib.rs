//! `PostgreSQL` data layer for CivicPulse.
//!
//! Implements the [`CityStore`] seam from `civicpulse-core` on top of three
//! append-only tables. Every batch append runs in a single transaction.
//!
//! ```text
//! IndexCalculator / ScenarioEngine / CorrelationEngine
//!     |
//!     +-- CityStore --> PgStore
//!                         |-- EventStore     (events)
//!                         |-- MetricStore    (metrics)
//!                         +-- ScenarioStore  (scenarios)
//! ```
//!
//! # Modules
//!
//! - [`event_store`] -- Batch event insertion and range queries
//! - [`metric_store`] -- Snapshot insertion, latest snapshot and series
//! - [`scenario_store`] -- Scenario record persistence
//! - [`pg_store`] -- The [`CityStore`] implementation, connection and migrations
//! - [`error`] -- Shared error types
//!
//! [`CityStore`]: civicpulse_core::store::CityStore

pub mod error;
pub mod event_store;
pub mod metric_store;
pub mod pg_store;
pub mod scenario_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use metric_store::{MetricRow, MetricStore};
pub use pg_store::PgStore;
pub use scenario_store::{ScenarioRow, ScenarioStore};
