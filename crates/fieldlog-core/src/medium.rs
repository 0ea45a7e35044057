//! Storage medium collaborators and the host-side directory implementation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Block-level geometry of a medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumGeometry {
    pub block_size: u32,
    pub block_count: u32,
}

impl MediumGeometry {
    pub fn total_bytes(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    pub fn total_mb(&self) -> u64 {
        self.total_bytes() / (1024 * 1024)
    }
}

/// One open append-only file on a medium.
pub trait MediumFile: Write + Send {
    /// Flushes the filesystem's cache for this file through to the device.
    fn sync(&mut self) -> io::Result<()>;
}

/// Capability surface of the removable storage medium: device status, mount
/// control, capacity queries and append-only file access.
///
/// Every method may fail at any moment; the medium can be yanked mid-call.
pub trait StorageMedium: Send + Sync + 'static {
    /// Low-level device status query. `Err` means absent or failing.
    fn status(&self) -> io::Result<()>;

    /// Cheap read from the raw device, to catch a card that answers status
    /// queries but can no longer serve data.
    fn read_probe(&self) -> io::Result<()>;

    /// Block geometry of the device.
    fn capacity(&self) -> io::Result<MediumGeometry>;

    /// Attempts to (re)mount the filesystem.
    fn mount(&self) -> io::Result<()>;

    /// Free space on the mounted filesystem, in bytes. Fails while nothing
    /// is mounted.
    fn free_space(&self) -> io::Result<u64>;

    /// Directory session files are rooted at.
    fn root(&self) -> &Path;

    /// Opens a file for appending, creating it if needed.
    fn open_append(&self, path: &Path) -> io::Result<Box<dyn MediumFile>>;
}

/// Directory-backed medium for host-side use.
///
/// The root directory stands in for the mount point and `mount` creates it,
/// so deleting the directory mid-run exercises the same recovery paths a
/// pulled card does. A workstation filesystem has no sector counts to
/// report, so block geometry and free space are configured values.
pub struct DirMedium {
    root: PathBuf,
    geometry: MediumGeometry,
    free_bytes: Option<u64>,
}

impl DirMedium {
    /// Medium rooted at `root`, reporting 16 GiB of 512-byte blocks.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            geometry: MediumGeometry {
                block_size: 512,
                block_count: 33_554_432,
            },
            free_bytes: None,
        }
    }

    /// Overrides the reported block geometry.
    pub fn with_geometry(mut self, geometry: MediumGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Overrides the reported free space. Defaults to the full capacity.
    pub fn with_free_bytes(mut self, bytes: u64) -> Self {
        self.free_bytes = Some(bytes);
        self
    }

    fn device_dir(&self) -> &Path {
        self.root
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl StorageMedium for DirMedium {
    fn status(&self) -> io::Result<()> {
        // The parent directory plays the raw device: reachable means present.
        fs::metadata(self.device_dir()).map(|_| ())
    }

    fn read_probe(&self) -> io::Result<()> {
        fs::read_dir(self.device_dir()).map(|_| ())
    }

    fn capacity(&self) -> io::Result<MediumGeometry> {
        Ok(self.geometry)
    }

    fn mount(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    fn free_space(&self) -> io::Result<u64> {
        // NotFound while the root is absent, which drives the remount path.
        fs::metadata(&self.root)?;
        Ok(self
            .free_bytes
            .unwrap_or_else(|| self.geometry.total_bytes()))
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn open_append(&self, path: &Path) -> io::Result<Box<dyn MediumFile>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(DirMediumFile { file }))
    }
}

struct DirMediumFile {
    file: File,
}

impl Write for DirMediumFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl MediumFile for DirMediumFile {
    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}
