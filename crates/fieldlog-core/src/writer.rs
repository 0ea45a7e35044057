//! Append-only session writer with threshold-based durable sync.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::error::{FieldlogError, Result};
use crate::medium::{MediumFile, StorageMedium};

/// Pattern a session's start time is formatted with to name its file.
const SESSION_FILE_PATTERN: &str = "%Y-%m-%dT%H.%M.%S.csv";

/// File name for a session that started at `start_time`.
pub fn session_file_name(start_time: DateTime<Utc>) -> String {
    start_time.format(SESSION_FILE_PATTERN).to_string()
}

/// Owns the open output file of one logging session.
///
/// Lines are appended in call order. After `sync_every_lines` writes the
/// writer forces a durable sync: stream buffers are flushed into the
/// filesystem, then the filesystem is flushed through to the device. A
/// failed write or sync is reported to the caller but leaves the writer
/// usable, so one bad sector does not end the session.
pub struct SessionWriter {
    path: PathBuf,
    file: Box<dyn MediumFile>,
    writes_since_sync: u32,
    sync_every_lines: u32,
}

impl SessionWriter {
    /// Opens the session file for `start_time` on `medium` and syncs once,
    /// so the file is discoverable even if no row is ever written.
    ///
    /// Callers are expected to have seen the medium available; this does not
    /// re-check.
    pub fn begin(
        medium: &dyn StorageMedium,
        start_time: DateTime<Utc>,
        sync_every_lines: u32,
    ) -> Result<Self> {
        let path = medium.root().join(session_file_name(start_time));
        let file = medium
            .open_append(&path)
            .map_err(|source| FieldlogError::WriteFailure {
                path: path.clone(),
                source,
            })?;
        let mut writer = Self {
            path,
            file,
            writes_since_sync: 0,
            sync_every_lines,
        };
        writer.sync()?;
        info!(path = %writer.path.display(), "Opened logging session");
        Ok(writer)
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written since the last successful sync.
    pub fn writes_since_sync(&self) -> u32 {
        self.writes_since_sync
    }

    /// Appends `line` plus a newline, then syncs if the threshold has been
    /// reached.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.write_all(b"\n"));
        if let Err(source) = written {
            error!(path = %self.path.display(), "Write failed: {}", source);
            return Err(FieldlogError::WriteFailure {
                path: self.path.clone(),
                source,
            });
        }

        self.writes_since_sync += 1;
        if self.writes_since_sync >= self.sync_every_lines {
            self.sync()?;
        }
        Ok(())
    }

    /// Forces a durability point: flush buffered data into the filesystem,
    /// then flush the filesystem through to the device.
    ///
    /// The write counter only resets on success, so a failed sync is retried
    /// by the next write.
    pub fn sync(&mut self) -> Result<()> {
        match self.file.flush().and_then(|_| self.file.sync()) {
            Ok(()) => {
                self.writes_since_sync = 0;
                Ok(())
            }
            Err(source) => {
                warn!(path = %self.path.display(), "Sync failed: {}", source);
                Err(FieldlogError::SyncFailure {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Final sync; the file handle closes when the writer is dropped.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }
}

impl fmt::Debug for SessionWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The file handle is a trait object with nothing to show.
        f.debug_struct("SessionWriter")
            .field("path", &self.path)
            .field("writes_since_sync", &self.writes_since_sync)
            .field("sync_every_lines", &self.sync_every_lines)
            .finish_non_exhaustive()
    }
}
