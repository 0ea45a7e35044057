//! Error types for fieldlog-core.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which capacity check a medium failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityScope {
    /// The raw block device is too small.
    Device,
    /// The mounted filesystem has too little free space.
    Filesystem,
}

impl fmt::Display for CapacityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityScope::Device => write!(f, "device"),
            CapacityScope::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// All errors the logging core can surface.
///
/// Media faults observed by the background monitor are recovered and logged
/// in place; they only show up here when a caller asks for a session while
/// the medium is not available.
#[derive(Error, Debug)]
pub enum FieldlogError {
    #[error("Storage medium is not available")]
    MediumNotReady,

    #[error("Storage medium is unreadable or disconnected")]
    MediumUnreadable,

    #[error("Insufficient {scope} capacity: {actual_mb} MB is below the {required_mb} MB minimum")]
    CapacityTooSmall {
        scope: CapacityScope,
        actual_mb: u64,
        required_mb: u64,
    },

    #[error("No mountable filesystem on the medium")]
    FilesystemCorrupt,

    #[error("Failed to write {}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to sync {}", path.display())]
    SyncFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Column limit of {max} reached")]
    SchemaFull { max: usize },

    #[error("Columns cannot be added once the first row has been pushed")]
    SchemaSealed,

    #[error("Row carries {actual} values but the schema declares {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Column name {name:?} exceeds {max} characters")]
    ColumnNameTooLong { name: String, max: usize },

    #[error("Column unit {unit:?} exceeds {max} characters")]
    ColumnUnitTooLong { unit: String, max: usize },

    #[error("Time source has no valid time yet")]
    TimeUnavailable,

    #[error("Time source went backwards")]
    ClockSkew,

    #[error("Media monitor is no longer running")]
    MonitorStopped,

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FieldlogError>;
