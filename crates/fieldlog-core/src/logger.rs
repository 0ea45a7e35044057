//! Logger context: wires the collaborators together and owns the background
//! runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::Runtime;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::LoggerConfig;
use crate::error::{FieldlogError, Result};
use crate::experiment::Experiment;
use crate::media::{self, MediaMonitor, MediaWatch};
use crate::medium::StorageMedium;
use crate::status::{NullStatusSink, StatusSink};
use crate::writer::SessionWriter;

/// Central context for one logging device.
///
/// Owns a dedicated single-worker runtime on which the media monitor runs,
/// so the public API stays synchronous; the only blocking points are the
/// availability waits. Dropping the logger stops the monitor.
pub struct DataLogger {
    runtime: Arc<Runtime>,
    media: MediaWatch,
    medium: Arc<dyn StorageMedium>,
    clock: Arc<dyn Clock>,
    config: LoggerConfig,
}

impl DataLogger {
    /// Starts configuring a logger.
    pub fn builder() -> DataLoggerBuilder {
        DataLoggerBuilder::new()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// The time source sessions are stamped with.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Watch handle onto the media monitor's signal.
    pub fn media(&self) -> MediaWatch {
        self.media.clone()
    }

    /// Blocks the calling thread until the medium is available.
    ///
    /// Must not be called from async context; the wait runs on the logger's
    /// own runtime.
    pub fn wait_until_available(&self) -> Result<()> {
        let mut watch = self.media.clone();
        self.runtime.block_on(watch.wait_until_available())
    }

    /// Blocks until the medium is available, then opens a new logging
    /// session stamped with the current time.
    pub fn begin_experiment(&self) -> Result<Experiment> {
        self.wait_until_available()?;
        self.open_session()
    }

    /// Like [`DataLogger::begin_experiment`] but fails instead of waiting
    /// when the medium is not available.
    pub fn try_begin_experiment(&self) -> Result<Experiment> {
        let signal = self.media.signal();
        if !signal.available {
            return Err(media::deny_error(signal.state, &self.config));
        }
        self.open_session()
    }

    fn open_session(&self) -> Result<Experiment> {
        let started_at: DateTime<Utc> = self.clock.now_utc()?;
        let writer = SessionWriter::begin(
            self.medium.as_ref(),
            started_at,
            self.config.sync_every_lines,
        )?;
        Ok(Experiment::new(writer, started_at, &self.config))
    }
}

/// Builder wiring collaborator implementations into a [`DataLogger`].
pub struct DataLoggerBuilder {
    medium: Option<Arc<dyn StorageMedium>>,
    clock: Arc<dyn Clock>,
    status: Arc<dyn StatusSink>,
    config: LoggerConfig,
}

impl DataLoggerBuilder {
    pub fn new() -> Self {
        Self {
            medium: None,
            clock: Arc::new(SystemClock),
            status: Arc::new(NullStatusSink),
            config: LoggerConfig::default(),
        }
    }

    /// The storage medium to log onto. Required.
    pub fn medium(mut self, medium: impl StorageMedium) -> Self {
        self.medium = Some(Arc::new(medium));
        self
    }

    /// Time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Fault-flag sink. Defaults to [`NullStatusSink`].
    pub fn status(mut self, sink: impl StatusSink) -> Self {
        self.status = Arc::new(sink);
        self
    }

    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the runtime, spawns the media monitor and hands back the
    /// ready-to-use logger. The medium starts out unavailable until the
    /// monitor's first evaluation.
    pub fn start(self) -> Result<DataLogger> {
        let medium = self
            .medium
            .ok_or_else(|| FieldlogError::Other("A storage medium is required".into()))?;

        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("fieldlog-media")
                .enable_all()
                .build()
                .map_err(|e| FieldlogError::Other(e.to_string()))?,
        );

        let (monitor, media) =
            MediaMonitor::new(medium.clone(), self.status.clone(), self.config.clone());
        runtime.spawn(monitor.run());

        info!("Data logger started");
        Ok(DataLogger {
            runtime,
            media,
            medium,
            clock: self.clock,
            config: self.config,
        })
    }
}

impl Default for DataLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
