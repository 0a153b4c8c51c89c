//! Error types for the eagle-metrics crate.

use thiserror::Error;

/// Errors that can occur in the metrics system.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    /// The device has no freshness entry.
    #[error("device not tracked: {host}")]
    NotTracked {
        /// The device identity that was looked up.
        host: String,
    },

    /// The registry could not be rendered in text exposition format.
    #[error("encode error: {reason}")]
    Encode {
        /// The reason encoding failed.
        reason: String,
    },
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
