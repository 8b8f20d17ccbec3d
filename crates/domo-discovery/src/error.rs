//! Error types for the discovery engine.

use domo_core::error::ValidationError;
use thiserror::Error;

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur in the discovery engine.
///
/// Scanner-internal faults never appear here: they are contained by the
/// supervisor and surfaced as a terminal
/// [`ScanOutcome`](crate::supervisor::ScanOutcome) plus tracing diagnostics.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A scan was started while the previous one is still open
    #[error("scanner '{scanner_id}' is already scanning")]
    AlreadyScanning { scanner_id: String },

    /// No scanner is registered under the given identifier
    #[error("no scanner registered as '{scanner_id}'")]
    ScannerNotFound { scanner_id: String },

    /// A scanner with the same identifier is already registered
    #[error("scanner '{scanner_id}' is already registered")]
    DuplicateScanner { scanner_id: String },

    /// Invalid engine or scanner configuration
    #[error("invalid discovery configuration: {0}")]
    InvalidConfig(String),

    /// Malformed identifier
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
