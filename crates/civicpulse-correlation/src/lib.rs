//! Cross-domain analytics for CivicPulse.
//!
//! Raw events are aggregated into five-minute, per-zone rows and analysed
//! on demand. Results that need more data than the window holds come back
//! as [`Analysis::InsufficientData`] rather than as errors.
//!
//! # Modules
//!
//! - [`aggregate`] -- Bucketing events into nullable analysis columns.
//! - [`stats`] -- Pearson correlation and Student-t p-values.
//! - [`matrix`] -- The pairwise correlation matrix.
//! - [`lag`] -- Lagged correlation and the causality heuristic.
//! - [`anomaly`] -- The rainfall-versus-speed anomaly rule.
//! - [`impact`] -- Coarse impact estimates.
//! - [`insights`] -- Plain-language insights from the matrix.
//! - [`engine`] -- [`CorrelationEngine`], binding the stages to a store.
//!
//! [`Analysis::InsufficientData`]: analysis::Analysis::InsufficientData
//! [`CorrelationEngine`]: engine::CorrelationEngine

pub mod aggregate;
pub mod analysis;
pub mod anomaly;
pub mod engine;
pub mod error;
pub mod impact;
pub mod insights;
pub mod lag;
pub mod matrix;
pub mod stats;

pub use analysis::Analysis;
pub use engine::CorrelationEngine;
pub use error::CorrelationError;
