//! Time source collaborator.

use chrono::{DateTime, Utc};

use crate::error::{FieldlogError, Result};

/// Provider of validated wall-clock time.
///
/// On the device this is a GPS-disciplined clock that has no usable time
/// until its first fix; [`Clock::is_available`] reports whether readings can
/// be trusted yet.
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time, or [`FieldlogError::TimeUnavailable`] before the
    /// source has synchronized.
    fn now_utc(&self) -> Result<DateTime<Utc>>;

    /// Whether `now_utc` will succeed right now.
    fn is_available(&self) -> bool;

    /// Milliseconds elapsed since `earlier`.
    ///
    /// Fails with [`FieldlogError::ClockSkew`] when `earlier` lies in the
    /// future, which can happen if the source re-synchronizes mid-session.
    fn millis_since(&self, earlier: DateTime<Utc>) -> Result<u64> {
        let now = self.now_utc()?;
        let delta = now.signed_duration_since(earlier).num_milliseconds();
        if delta < 0 {
            return Err(FieldlogError::ClockSkew);
        }
        Ok(delta as u64)
    }
}

/// Host clock backed by the operating system, always synchronized.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }

    fn is_available(&self) -> bool {
        true
    }
}
