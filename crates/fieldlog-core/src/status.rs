//! Status-signal sink collaborator.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

/// Fault conditions reported to the operator-facing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFlag {
    /// No usable storage medium.
    NoMedium,
    /// The time source has not synchronized yet.
    NoClock,
}

impl StatusFlag {
    fn describe(&self) -> &'static str {
        match self {
            StatusFlag::NoMedium => "no usable storage medium",
            StatusFlag::NoClock => "time source not synchronized",
        }
    }
}

/// Receives fault flags. On the device this drives the status LED pattern;
/// host implementations typically log or ignore them.
///
/// The media monitor re-raises active flags on every polling tick, so
/// implementations must tolerate repeated raises and lowers.
pub trait StatusSink: Send + Sync + 'static {
    fn raise(&self, flag: StatusFlag);
    fn lower(&self, flag: StatusFlag);
}

/// Sink that reports flag edges through `tracing`.
///
/// Only transitions are logged; the steady-state repetition coming from the
/// monitor is absorbed silently.
#[derive(Clone, Default)]
pub struct TracingStatusSink {
    raised: Arc<Mutex<HashSet<StatusFlag>>>,
}

impl StatusSink for TracingStatusSink {
    fn raise(&self, flag: StatusFlag) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        if raised.insert(flag) {
            warn!("Fault raised: {}", flag.describe());
        }
    }

    fn lower(&self, flag: StatusFlag) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        if raised.remove(&flag) {
            info!("Fault cleared: {}", flag.describe());
        }
    }
}

/// Sink that ignores everything, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn raise(&self, _flag: StatusFlag) {}
    fn lower(&self, _flag: StatusFlag) {}
}
