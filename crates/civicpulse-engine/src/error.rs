//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop startup. Job failures
//! inside the scheduler loops are logged and never reach `main`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: civicpulse_core::config::ConfigError,
    },

    /// Connecting to or migrating `PostgreSQL` failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying store error.
        #[from]
        source: civicpulse_core::store::StoreError,
    },

    /// Installing the Ctrl-C handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
