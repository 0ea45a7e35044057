//! Core of a field data logger: measurement rows are buffered in an
//! [`Experiment`], serialized as CSV and appended to one file per session on
//! a removable medium, while a background [`MediaMonitor`] tracks whether the
//! medium can be written to at all.
//!
//! [`DataLogger`] wires everything together; the device-specific pieces
//! (storage, time source, fault indicator) come in through the
//! [`StorageMedium`], [`Clock`] and [`StatusSink`] traits.

pub mod clock;
pub mod config;
pub mod error;
pub mod experiment;
pub mod logger;
pub mod media;
pub mod medium;
pub mod status;
pub mod writer;

pub use clock::{Clock, SystemClock};
pub use config::LoggerConfig;
pub use error::{CapacityScope, FieldlogError, Result};
pub use experiment::{
    format_header, format_row, Column, Experiment, SampleRow, MAX_COLUMNS, MAX_COLUMN_NAME,
    MAX_COLUMN_UNIT,
};
pub use logger::{DataLogger, DataLoggerBuilder};
pub use media::{MediaMonitor, MediaSignal, MediaState, MediaWatch};
pub use medium::{DirMedium, MediumFile, MediumGeometry, StorageMedium};
pub use status::{NullStatusSink, StatusFlag, StatusSink, TracingStatusSink};
pub use writer::{session_file_name, SessionWriter};
