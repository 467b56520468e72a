//! Error types for heap-beagle
//!
//! Raw memory noise is never an error: invalid blocks are dropped silently
//! during a scan. Only misuse of the query surface, registry bookkeeping
//! and configuration problems surface here.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for registry and scan operations
#[derive(Error, Debug)]
pub enum BeagleError {
    #[error("Conflicting find options: {0}")]
    ConflictingOptions(String),

    #[error("A heap scan is already in progress on this thread")]
    ReentrantScan,

    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Zone {zone} unavailable: {reason}")]
    ZoneUnavailable { zone: String, reason: String },

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for registry and scan operations
pub type BeagleResult<T> = Result<T, BeagleError>;

impl BeagleError {
    /// Creates a zone unavailable error
    pub fn zone_unavailable(zone: impl Into<String>, reason: impl Into<String>) -> Self {
        BeagleError::ZoneUnavailable {
            zone: zone.into(),
            reason: reason.into(),
        }
    }

    /// Creates a conflicting options error
    pub fn conflicting_options(reason: impl Into<String>) -> Self {
        BeagleError::ConflictingOptions(reason.into())
    }
}
