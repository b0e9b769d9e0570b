//! Audit log with size-bounded rotation.
//!
//! ```text
//! monitor.log        current
//! monitor.log.0[.gz] newest generation
//! ...
//! monitor.log.N-1    oldest generation, deleted on the next rotation
//! ```
//!
//! Appends and rotation share one lock, so a line written during a rotation
//! lands in the freshly opened file.

mod reader;
mod rotate;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

pub use reader::{read_new, search, tail_lines};
#[cfg(test)]
use rotate::generation_path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rotation policy.
#[derive(Debug, Clone)]
pub struct ArchivePolicy {
    /// Rotate once the current file exceeds this many bytes
    pub max_bytes: u64,
    /// Retained generations
    pub max_files: usize,
    /// Gzip each generation as it is rotated out
    pub compress: bool,
}

struct LogState {
    file: Option<File>,
    /// Approximate; refreshed from metadata on each rotation check
    current_size: u64,
    /// Length of the rotation marker heading the current file; not counted
    /// against the ceiling
    marker_len: u64,
}

impl LogState {
    fn over(&self, max_bytes: u64) -> bool {
        self.current_size.saturating_sub(self.marker_len) > max_bytes
    }
}

pub struct LogArchive {
    path: PathBuf,
    policy: ArchivePolicy,
    state: Mutex<LogState>,
    rotations: AtomicU64,
    bytes_logged: AtomicU64,
}

impl LogArchive {
    /// Open (or create) the log for appending.
    pub fn open(path: &Path, policy: ArchivePolicy) -> io::Result<Self> {
        let file = open_append(path)?;
        let current_size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            policy,
            state: Mutex::new(LogState {
                file: Some(file),
                current_size,
                marker_len: 0,
            }),
            rotations: AtomicU64::new(0),
            bytes_logged: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp, write and flush one line, then rotate if over the ceiling.
    pub fn append(&self, line: &str) -> io::Result<()> {
        let stamped = format!(
            "[{}] {}\n",
            chrono::Local::now().format(TIMESTAMP_FORMAT),
            line
        );

        let mut state = self.state.lock();
        self.write_locked(&mut state, stamped.as_bytes())?;

        if state.over(self.policy.max_bytes) {
            self.rotate_locked(&mut state)?;
        }
        Ok(())
    }

    /// Periodic check; also catches growth from writers outside this process.
    pub fn rotate_if_needed(&self) -> io::Result<bool> {
        let mut state = self.state.lock();
        if let Ok(meta) = std::fs::metadata(&self.path) {
            state.current_size = meta.len();
        }
        if !state.over(self.policy.max_bytes) {
            return Ok(false);
        }
        self.rotate_locked(&mut state)?;
        Ok(true)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn bytes_logged(&self) -> u64 {
        self.bytes_logged.load(Ordering::Relaxed)
    }

    fn write_locked(&self, state: &mut LogState, bytes: &[u8]) -> io::Result<()> {
        // Reopen after a rotation that could not create the new file
        if state.file.is_none() {
            state.file = Some(open_append(&self.path)?);
            state.current_size = 0;
            state.marker_len = 0;
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(bytes)?;
            file.flush()?;
        }
        state.current_size += bytes.len() as u64;
        self.bytes_logged
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn rotate_locked(&self, state: &mut LogState) -> io::Result<()> {
        // Close before renaming so nothing is written to the old inode
        state.file = None;

        rotate::shift_generations(&self.path, &self.policy)?;

        let file = open_append(&self.path)?;
        state.file = Some(file);
        state.current_size = 0;
        state.marker_len = 0;
        let count = self.rotations.fetch_add(1, Ordering::Relaxed) + 1;

        crate::log!("archive"; "log rotated ({} so far)", count);
        let marker = format!(
            "[{}] [INFO] Log file rotated\n",
            chrono::Local::now().format(TIMESTAMP_FORMAT)
        );
        self.write_locked(state, marker.as_bytes())?;
        state.marker_len = marker.len() as u64;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
