//! Media availability monitoring.
//!
//! [`MediaMonitor`] periodically probes the storage medium, classifies its
//! health and publishes the result through a watch channel. [`MediaWatch`] is
//! the read side: producers query or block on it instead of probing the
//! medium themselves.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::LoggerConfig;
use crate::error::{CapacityScope, FieldlogError, Result};
use crate::medium::{MediumGeometry, StorageMedium};
use crate::status::{StatusFlag, StatusSink};

// ─── Signal Types ───────────────────────────────────────────────────────────

/// Health classification of the storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    /// No conclusive probe yet. Before the first probe the medium is treated
    /// as unavailable; afterwards an inconclusive probe fails open.
    Unknown,
    /// The device is absent, failing its status query, or unreadable.
    NotReady,
    /// Mounted, large enough, with sufficient free space.
    Mounted,
    /// A filesystem problem is being retried by remounting.
    MountRetrying,
    /// The raw device is smaller than the configured minimum.
    InsufficientDiskSpace { total_mb: u64 },
    /// Free space on the filesystem is below the configured minimum.
    InsufficientPartitionSpace { free_mb: u64 },
}

/// Snapshot published by the monitor: the classified state plus the derived
/// availability flag that gates session writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSignal {
    pub state: MediaState,
    pub available: bool,
}

impl MediaSignal {
    fn startup() -> Self {
        Self {
            state: MediaState::Unknown,
            available: false,
        }
    }
}

/// Maps an unavailable state to the error a refused caller gets.
pub(crate) fn deny_error(state: MediaState, config: &LoggerConfig) -> FieldlogError {
    match state {
        MediaState::Unknown | MediaState::Mounted => FieldlogError::MediumNotReady,
        MediaState::NotReady => FieldlogError::MediumUnreadable,
        MediaState::MountRetrying => FieldlogError::FilesystemCorrupt,
        MediaState::InsufficientDiskSpace { total_mb } => FieldlogError::CapacityTooSmall {
            scope: CapacityScope::Device,
            actual_mb: total_mb,
            required_mb: config.min_medium_mb,
        },
        MediaState::InsufficientPartitionSpace { free_mb } => FieldlogError::CapacityTooSmall {
            scope: CapacityScope::Filesystem,
            actual_mb: free_mb,
            required_mb: config.min_free_mb,
        },
    }
}

// ─── Watch Handle ───────────────────────────────────────────────────────────

/// Read side of the availability signal.
///
/// Cheap to clone; every clone observes the same monitor.
#[derive(Debug, Clone)]
pub struct MediaWatch {
    rx: watch::Receiver<MediaSignal>,
}

impl MediaWatch {
    /// Most recently published signal.
    pub fn signal(&self) -> MediaSignal {
        *self.rx.borrow()
    }

    /// Most recently published state.
    pub fn state(&self) -> MediaState {
        self.rx.borrow().state
    }

    /// Whether the medium is currently considered writable.
    pub fn is_available(&self) -> bool {
        self.rx.borrow().available
    }

    /// Suspends until the medium is available, returning immediately if it
    /// already is. There is deliberately no timeout: this is the gate a
    /// producer sits behind until a usable medium shows up.
    pub async fn wait_until_available(&mut self) -> Result<()> {
        self.rx
            .wait_for(|signal| signal.available)
            .await
            .map(|_| ())
            .map_err(|_| FieldlogError::MonitorStopped)
    }

    /// Waits for the next published signal. The monitor publishes once per
    /// evaluation, so this also paces to its polling period.
    pub async fn changed(&mut self) -> Result<MediaSignal> {
        self.rx
            .changed()
            .await
            .map_err(|_| FieldlogError::MonitorStopped)?;
        Ok(*self.rx.borrow())
    }
}

// ─── Monitor ────────────────────────────────────────────────────────────────

/// Periodic medium health evaluator.
///
/// Construct with [`MediaMonitor::new`], then spawn [`MediaMonitor::run`] on
/// the runtime that should own it. The loop never exits on its own.
pub struct MediaMonitor {
    medium: Arc<dyn StorageMedium>,
    status: Arc<dyn StatusSink>,
    config: LoggerConfig,
    tx: watch::Sender<MediaSignal>,
    geometry: Option<MediumGeometry>,
}

impl MediaMonitor {
    /// Creates the monitor and the watch handle it will publish to.
    pub fn new(
        medium: Arc<dyn StorageMedium>,
        status: Arc<dyn StatusSink>,
        config: LoggerConfig,
    ) -> (Self, MediaWatch) {
        let (tx, rx) = watch::channel(MediaSignal::startup());
        (
            Self {
                medium,
                status,
                config,
                tx,
                geometry: None,
            },
            MediaWatch { rx },
        )
    }

    /// Endless polling loop. The first evaluation happens immediately, later
    /// ones on the configured period; a tick that overruns the period is
    /// skipped rather than bunched up.
    pub async fn run(mut self) {
        info!(
            period_ms = self.config.poll_period_ms,
            "Media monitor started"
        );
        let mut ticker = interval(self.config.poll_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// One polling tick: evaluate the medium, remount within the bounded
    /// budget, publish the outcome.
    fn tick(&mut self) {
        let mut evaluations: u32 = 0;
        loop {
            evaluations += 1;
            let state = self.evaluate();
            match state {
                MediaState::Mounted => {
                    debug!("Medium is operating normally");
                    self.status.lower(StatusFlag::NoMedium);
                    self.publish(state, true);
                }
                MediaState::Unknown => {
                    // An inconclusive evaluation fails open.
                    self.status.lower(StatusFlag::NoMedium);
                    self.publish(state, true);
                }
                MediaState::NotReady
                | MediaState::InsufficientDiskSpace { .. }
                | MediaState::InsufficientPartitionSpace { .. } => {
                    self.status.raise(StatusFlag::NoMedium);
                    self.publish(state, false);
                }
                MediaState::MountRetrying => {
                    self.publish(state, false);
                    match self.medium.mount() {
                        Ok(()) => {
                            info!("Mounted the medium, re-querying");
                            if evaluations < self.config.mount_retries {
                                continue;
                            }
                            // Budget exhausted; the next tick picks it up.
                        }
                        Err(e) => {
                            warn!("Failed to mount the medium: {}", e);
                            self.status.raise(StatusFlag::NoMedium);
                        }
                    }
                }
            }
            break;
        }
    }

    /// Classifies current medium health, probing in escalating order: device
    /// status, raw read, geometry, capacity, filesystem statistics.
    fn evaluate(&mut self) -> MediaState {
        if let Err(e) = self.medium.status() {
            warn!("Medium status query failed: {}", e);
            return MediaState::NotReady;
        }

        // The read probe costs a device round trip and cannot be trusted
        // until the geometry has been read once, so skip it before then.
        if self.geometry.is_some() {
            if let Err(e) = self.medium.read_probe() {
                warn!("Medium read probe failed: {}", e);
                return MediaState::NotReady;
            }
        }

        let geometry = match self.medium.capacity() {
            Ok(g) => g,
            Err(e) => {
                // Without geometry the size checks cannot run; fail open.
                error!("Could not query medium geometry: {}", e);
                return MediaState::Unknown;
            }
        };
        self.geometry = Some(geometry);
        debug!(
            block_size = geometry.block_size,
            block_count = geometry.block_count,
            "Queried medium geometry"
        );

        let total_mb = geometry.total_mb();
        if total_mb < self.config.min_medium_mb {
            warn!(
                total_mb,
                min_mb = self.config.min_medium_mb,
                "Medium is too small"
            );
            return MediaState::InsufficientDiskSpace { total_mb };
        }

        let free_bytes = match self.medium.free_space() {
            Ok(bytes) => bytes,
            Err(e) => {
                info!("Filesystem statistics unavailable: {}", e);
                return MediaState::MountRetrying;
            }
        };

        let free_mb = free_bytes / (1024 * 1024);
        if free_mb < self.config.min_free_mb {
            warn!(
                free_mb,
                min_mb = self.config.min_free_mb,
                "Filesystem is almost full"
            );
            return MediaState::InsufficientPartitionSpace { free_mb };
        }

        MediaState::Mounted
    }

    fn publish(&self, state: MediaState, available: bool) {
        self.tx.send_replace(MediaSignal { state, available });
    }
}
