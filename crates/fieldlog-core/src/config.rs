//! Logger configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the logging core.
///
/// `Default` carries the values the device firmware ships with. The struct
/// deserializes with every field optional, so a partial YAML file overrides
/// only what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum size of the raw medium, in MB. Smaller media are refused.
    pub min_medium_mb: u64,
    /// Minimum free space on the mounted filesystem, in MB.
    pub min_free_mb: u64,
    /// Durable sync is forced after this many written lines.
    pub sync_every_lines: u32,
    /// Queue length at which a pushed row forces a full flush.
    pub auto_flush_rows: usize,
    /// Media monitor polling period, in milliseconds.
    pub poll_period_ms: u64,
    /// Evaluation budget per polling tick while remounting.
    pub mount_retries: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_medium_mb: 1024,
            min_free_mb: 1024,
            sync_every_lines: 20,
            auto_flush_rows: 10,
            poll_period_ms: 1000,
            mount_retries: 3,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum medium size and minimum free space, both in MB.
    pub fn with_thresholds(mut self, min_medium_mb: u64, min_free_mb: u64) -> Self {
        self.min_medium_mb = min_medium_mb;
        self.min_free_mb = min_free_mb;
        self
    }

    /// Sets how many written lines may accumulate between durable syncs.
    pub fn with_sync_every(mut self, lines: u32) -> Self {
        self.sync_every_lines = lines;
        self
    }

    /// Sets how many queued rows trigger an automatic flush.
    pub fn with_auto_flush(mut self, rows: usize) -> Self {
        self.auto_flush_rows = rows;
        self
    }

    /// Sets the media monitor polling period, in milliseconds.
    pub fn with_poll_period_ms(mut self, ms: u64) -> Self {
        self.poll_period_ms = ms;
        self
    }

    /// Sets the evaluation budget per polling tick while remounting.
    pub fn with_mount_retries(mut self, retries: u32) -> Self {
        self.mount_retries = retries;
        self
    }

    /// Polling period as a [`Duration`].
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }
}
