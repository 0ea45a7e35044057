//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use fieldlog_core::{
    Clock, FieldlogError, LoggerConfig, MediumFile, MediumGeometry, Result, StatusFlag,
    StatusSink, StorageMedium,
};

/// Config with a fast polling period so tests settle quickly.
pub fn fast_config() -> LoggerConfig {
    LoggerConfig {
        poll_period_ms: 20,
        ..LoggerConfig::default()
    }
}

/// Fixed session start used across tests.
pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 34, 56).unwrap()
}

// ─── Fake Medium ────────────────────────────────────────────────────────────

/// Scripted behavior knobs plus everything the fake observed.
pub struct MediumScript {
    pub device_missing: bool,
    pub probe_fails: bool,
    pub capacity_query_fails: bool,
    pub geometry: MediumGeometry,
    pub mounted: bool,
    pub mount_fails: bool,
    pub free_space_fails: bool,
    pub free_bytes: u64,
    pub fail_next_writes: usize,
    pub sync_fails: bool,
    pub mount_attempts: usize,
    pub files: BTreeMap<PathBuf, FileState>,
}

#[derive(Default)]
pub struct FileState {
    pub data: Vec<u8>,
    pub syncs: usize,
    pub synced_len: usize,
}

/// In-memory [`StorageMedium`] whose behavior is driven by a [`MediumScript`].
///
/// Clones share state, so tests keep one handle for scripting and hand
/// another to the logger.
#[derive(Clone)]
pub struct FakeMedium {
    root: PathBuf,
    inner: Arc<Mutex<MediumScript>>,
}

impl FakeMedium {
    /// A mounted 4 GiB medium with 2 GiB free.
    pub fn healthy() -> Self {
        Self {
            root: PathBuf::from("SD:"),
            inner: Arc::new(Mutex::new(MediumScript {
                device_missing: false,
                probe_fails: false,
                capacity_query_fails: false,
                geometry: MediumGeometry {
                    block_size: 512,
                    block_count: 8_388_608,
                },
                mounted: true,
                mount_fails: false,
                free_space_fails: false,
                free_bytes: 2 * 1024 * 1024 * 1024,
                fail_next_writes: 0,
                sync_fails: false,
                mount_attempts: 0,
                files: BTreeMap::new(),
            })),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, MediumScript> {
        self.inner.lock().unwrap()
    }

    /// Contents of the only file on the medium.
    pub fn only_file_text(&self) -> String {
        let script = self.script();
        assert_eq!(script.files.len(), 1, "expected exactly one session file");
        let state = script.files.values().next().unwrap();
        String::from_utf8(state.data.clone()).unwrap()
    }

    /// Name of the only file on the medium.
    pub fn only_file_name(&self) -> String {
        let script = self.script();
        assert_eq!(script.files.len(), 1, "expected exactly one session file");
        let path = script.files.keys().next().unwrap();
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    /// Total durable syncs observed across all files.
    pub fn sync_count(&self) -> usize {
        self.script().files.values().map(|f| f.syncs).sum()
    }
}

impl StorageMedium for FakeMedium {
    fn status(&self) -> io::Result<()> {
        if self.script().device_missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no card"));
        }
        Ok(())
    }

    fn read_probe(&self) -> io::Result<()> {
        if self.script().probe_fails {
            return Err(io::Error::other("probe read failed"));
        }
        Ok(())
    }

    fn capacity(&self) -> io::Result<MediumGeometry> {
        let script = self.script();
        if script.capacity_query_fails {
            return Err(io::Error::other("capacity ioctl failed"));
        }
        Ok(script.geometry)
    }

    fn mount(&self) -> io::Result<()> {
        let mut script = self.script();
        script.mount_attempts += 1;
        if script.mount_fails {
            return Err(io::Error::other("mount failed"));
        }
        script.mounted = true;
        Ok(())
    }

    fn free_space(&self) -> io::Result<u64> {
        let script = self.script();
        if !script.mounted || script.free_space_fails {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not mounted"));
        }
        Ok(script.free_bytes)
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn open_append(&self, path: &Path) -> io::Result<Box<dyn MediumFile>> {
        let mut script = self.script();
        if !script.mounted {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not mounted"));
        }
        script.files.entry(path.to_path_buf()).or_default();
        Ok(Box::new(FakeFile {
            inner: self.inner.clone(),
            path: path.to_path_buf(),
        }))
    }
}

struct FakeFile {
    inner: Arc<Mutex<MediumScript>>,
    path: PathBuf,
}

impl Write for FakeFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.inner.lock().unwrap();
        if script.fail_next_writes > 0 {
            script.fail_next_writes -= 1;
            return Err(io::Error::other("injected write failure"));
        }
        let state = script.files.get_mut(&self.path).unwrap();
        state.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MediumFile for FakeFile {
    fn sync(&mut self) -> io::Result<()> {
        let mut script = self.inner.lock().unwrap();
        if script.sync_fails {
            return Err(io::Error::other("injected sync failure"));
        }
        let state = script.files.get_mut(&self.path).unwrap();
        state.syncs += 1;
        state.synced_len = state.data.len();
        Ok(())
    }
}

// ─── Fake Clock ─────────────────────────────────────────────────────────────

struct FakeClockState {
    now: DateTime<Utc>,
    available: bool,
}

/// Manually advanced [`Clock`]. Clones share state.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    pub fn synced_at(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now,
                available: true,
            })),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        let mut state = self.inner.lock().unwrap();
        state.now += chrono::Duration::milliseconds(ms as i64);
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.inner.lock().unwrap().now = now;
    }

    pub fn set_available(&self, available: bool) {
        self.inner.lock().unwrap().available = available;
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> Result<DateTime<Utc>> {
        let state = self.inner.lock().unwrap();
        if !state.available {
            return Err(FieldlogError::TimeUnavailable);
        }
        Ok(state.now)
    }

    fn is_available(&self) -> bool {
        self.inner.lock().unwrap().available
    }
}

// ─── Recording Sink ─────────────────────────────────────────────────────────

/// Records every raise and lower in order. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(StatusFlag, bool)>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(StatusFlag, bool)> {
        self.events.lock().unwrap().clone()
    }

    /// Whether `flag` is raised according to the last event affecting it.
    pub fn is_raised(&self, flag: StatusFlag) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(f, _)| *f == flag)
            .map(|(_, raised)| *raised)
            .unwrap_or(false)
    }
}

impl StatusSink for RecordingSink {
    fn raise(&self, flag: StatusFlag) {
        self.events.lock().unwrap().push((flag, true));
    }

    fn lower(&self, flag: StatusFlag) {
        self.events.lock().unwrap().push((flag, false));
    }
}
