//! Error types for correlation requests.

use civicpulse_core::store::StoreError;

/// A correlation request was rejected or the store failed.
///
/// Lack of data is not an error; it is reported through
/// [`Analysis::InsufficientData`](crate::analysis::Analysis::InsufficientData).
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    /// The domain name is not one of the four monitored domains.
    #[error("unknown domain: {name:?}")]
    UnknownDomain {
        /// The rejected name.
        name: String,
    },

    /// Reading events from the store failed.
    #[error(transparent)]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}
