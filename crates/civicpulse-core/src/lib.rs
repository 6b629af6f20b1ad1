//! Ingestion, index computation and scenario projection for CivicPulse.
//!
//! Data flows generator -> event store -> index calculator -> metric store,
//! and the scenario engine and dashboard read the latest metric snapshot.
//! Every component reaches the database through the [`CityStore`] seam.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `civicpulse-config.yaml` into
//!   strongly-typed structs.
//! - [`zones`] -- The static zone registry.
//! - [`payload`] -- Typed readings parsed from event payloads.
//! - [`generator`] -- Synthetic per-zone sensor readings.
//! - [`indices`] -- Composite index derivation and the [`IndexCalculator`].
//! - [`scenario`] -- What-if projections over the latest snapshot.
//! - [`dashboard`] -- Read models for KPIs, zone tables and series.
//! - [`store`] -- The [`CityStore`] trait and [`Latest`] outcome.
//! - [`memory_store`] -- In-process [`CityStore`] implementation.
//!
//! [`CityStore`]: store::CityStore
//! [`Latest`]: store::Latest
//! [`IndexCalculator`]: indices::IndexCalculator

pub mod config;
pub mod dashboard;
pub mod generator;
pub mod indices;
pub mod memory_store;
pub mod payload;
pub mod scenario;
pub mod store;
#[cfg(test)]
mod test_support;
pub mod zones;
