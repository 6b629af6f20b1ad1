//! The outcome wrapper shared by every analysis.

use serde::{Deserialize, Serialize};

/// Result of a statistical analysis.
///
/// Serializes with a `status` tag so callers branch on it before reading
/// any other field. A payload must be a struct (not a bare list) to carry
/// the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis<T> {
    /// The analysis ran.
    Ok(T),
    /// Not enough rows or columns to compute anything meaningful.
    InsufficientData {
        /// What was missing.
        reason: String,
    },
}

impl<T> Analysis<T> {
    /// Build an [`Analysis::InsufficientData`] from any displayable reason.
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }

    /// Return the payload, or `None` when data was insufficient.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::InsufficientData { .. } => None,
        }
    }

    /// Whether this is the insufficient-data outcome.
    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }

    /// Transform the payload, keeping an insufficient-data outcome as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Analysis<U> {
        match self {
            Self::Ok(value) => Analysis::Ok(f(value)),
            Self::InsufficientData { reason } => Analysis::InsufficientData { reason },
        }
    }
}
