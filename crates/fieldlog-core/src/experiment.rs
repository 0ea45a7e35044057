//! In-memory experiment: declared schema, pending rows, CSV serialization.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::error;

use crate::config::LoggerConfig;
use crate::error::{FieldlogError, Result};
use crate::writer::SessionWriter;

/// Upper bound on measurement axes per experiment.
pub const MAX_COLUMNS: usize = 128;
/// Longest accepted column name.
pub const MAX_COLUMN_NAME: usize = 32;
/// Longest accepted unit label.
pub const MAX_COLUMN_UNIT: usize = 15;

// ─── Schema & Rows ──────────────────────────────────────────────────────────

/// One measurement axis: a display name plus a unit label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    unit: String,
}

impl Column {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let unit = unit.into();
        if name.chars().count() > MAX_COLUMN_NAME {
            return Err(FieldlogError::ColumnNameTooLong {
                name,
                max: MAX_COLUMN_NAME,
            });
        }
        if unit.chars().count() > MAX_COLUMN_UNIT {
            return Err(FieldlogError::ColumnUnitTooLong {
                unit,
                max: MAX_COLUMN_UNIT,
            });
        }
        Ok(Self { name, unit })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// One sampled row: a timestamp offset from the session start plus values in
/// column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    offset_ms: u64,
    values: Vec<f64>,
}

impl SampleRow {
    pub fn new(offset_ms: u64) -> Self {
        Self::with_capacity(offset_ms, 0)
    }

    pub fn with_capacity(offset_ms: u64, columns: usize) -> Self {
        Self {
            offset_ms,
            values: Vec::with_capacity(columns),
        }
    }

    pub fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Appends one value in column order.
    pub fn push_value(&mut self, value: f64) -> Result<()> {
        if self.values.len() >= MAX_COLUMNS {
            return Err(FieldlogError::SchemaFull { max: MAX_COLUMNS });
        }
        self.values.push(value);
        Ok(())
    }
}

// ─── CSV Serialization ──────────────────────────────────────────────────────

/// Header line for `columns`: the fixed timestamp column followed by each
/// axis as `name [unit]`.
pub fn format_header(columns: &[Column]) -> String {
    let mut cells = Vec::with_capacity(columns.len() + 1);
    cells.push("Timestamp [ms]".to_string());
    cells.extend(columns.iter().map(|c| format!("{} [{}]", c.name, c.unit)));
    cells.join(",")
}

/// CSV line for one row: the offset in milliseconds, then every value with
/// fixed ten-decimal precision.
pub fn format_row(row: &SampleRow) -> String {
    let mut cells = Vec::with_capacity(row.values.len() + 1);
    cells.push(row.offset_ms.to_string());
    cells.extend(row.values.iter().map(|v| format!("{:.10}", v)));
    cells.join(",")
}

// ─── Experiment ─────────────────────────────────────────────────────────────

/// An ongoing logging session: the declared schema and the rows not yet
/// written out.
///
/// Not internally synchronized; exactly one producer owns it, and through it
/// the session's writer. Normally obtained from `DataLogger::begin_experiment`.
#[derive(Debug)]
pub struct Experiment {
    columns: Vec<Column>,
    column_count: usize,
    columns_flushed: bool,
    rows: VecDeque<SampleRow>,
    auto_flush_rows: usize,
    writer: SessionWriter,
    started_at: DateTime<Utc>,
}

impl Experiment {
    pub fn new(writer: SessionWriter, started_at: DateTime<Utc>, config: &LoggerConfig) -> Self {
        Self {
            columns: Vec::new(),
            column_count: 0,
            columns_flushed: false,
            rows: VecDeque::new(),
            auto_flush_rows: config.auto_flush_rows,
            writer,
            started_at,
        }
    }

    /// Session start time; row offsets are measured from this instant.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of declared measurement axes.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Rows queued but not yet written.
    pub fn pending_rows(&self) -> usize {
        self.rows.len()
    }

    /// The session's writer, for path and sync inspection.
    pub fn writer(&self) -> &SessionWriter {
        &self.writer
    }

    /// Declares the next measurement axis. Must happen before the first row
    /// is pushed; the schema is sealed afterwards.
    pub fn add_column(&mut self, name: impl Into<String>, unit: impl Into<String>) -> Result<()> {
        if self.columns_flushed {
            return Err(FieldlogError::SchemaSealed);
        }
        if self.columns.len() >= MAX_COLUMNS {
            return Err(FieldlogError::SchemaFull { max: MAX_COLUMNS });
        }
        self.columns.push(Column::new(name, unit)?);
        self.column_count = self.columns.len();
        Ok(())
    }

    /// New empty row bound to `offset_ms`, sized for the declared columns.
    pub fn new_row(&self, offset_ms: u64) -> SampleRow {
        SampleRow::with_capacity(offset_ms, self.column_count)
    }

    /// Queues `row` for writing.
    ///
    /// The first accepted row seals the schema and writes the header line;
    /// reaching the auto-flush threshold flushes the whole queue. A row
    /// whose value count differs from the declared column count is rejected.
    pub fn push_row(&mut self, row: SampleRow) -> Result<()> {
        if row.values.len() != self.column_count {
            return Err(FieldlogError::ColumnCountMismatch {
                expected: self.column_count,
                actual: row.values.len(),
            });
        }

        if !self.columns_flushed {
            // Best effort: a failed header write is logged, and the schema
            // seals regardless so it is only ever attempted once.
            let header = format_header(&self.columns);
            if let Err(e) = self.writer.write_line(&header) {
                error!("Failed to write the schema header: {}", e);
            }
            self.columns_flushed = true;
            self.columns = Vec::new();
        }

        self.rows.push_back(row);
        if self.rows.len() >= self.auto_flush_rows {
            return self.flush();
        }
        Ok(())
    }

    /// Writes every queued row out in push order.
    ///
    /// Each row is dropped once its write has been attempted, whether or not
    /// the write succeeded; rows are never retried. The first error, if any,
    /// is returned after the whole queue has been processed.
    pub fn flush(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(row) = self.rows.pop_front() {
            let line = format_row(&row);
            if let Err(e) = self.writer.write_line(&line) {
                error!("Failed to write a row: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flushes outstanding rows and durably closes the session.
    pub fn finish(mut self) -> Result<()> {
        let flushed = self.flush();
        let closed = self.writer.sync();
        flushed.and(closed)
    }
}

impl Drop for Experiment {
    fn drop(&mut self) {
        // Rows still queued at drop go out best effort; `finish` is the
        // durable path.
        if !self.rows.is_empty() {
            let _ = self.flush();
        }
    }
}
