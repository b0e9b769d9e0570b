//! Watch registry: kernel handle ↔ directory path.
//!
//! Entries live in a dense `Vec` with a handle index and a path index. The
//! logical capacity starts at [`INITIAL_CAPACITY`] and doubles when an insert
//! would exceed it; every growth bumps a counter. All operations take the
//! same lock, so readers always see a consistent table.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::backend::{WatchBackend, WatchHandle};
use super::error::WatchError;
use super::MAX_PATH_BYTES;

pub const INITIAL_CAPACITY: usize = 1024;
const GROWTH_FACTOR: usize = 2;

/// One watched directory.
#[derive(Debug, Clone)]
pub struct WatchEntry {
    pub handle: WatchHandle,
    pub path: PathBuf,
    pub created_at: SystemTime,
    /// Domain events emitted for children of this directory.
    pub event_count: u64,
}

/// Result of [`WatchRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added(WatchHandle),
    /// The path (or the inode behind it) was already watched.
    Existing(WatchHandle),
}

impl Registration {
    #[inline]
    pub fn handle(self) -> WatchHandle {
        match self {
            Self::Added(h) | Self::Existing(h) => h,
        }
    }

    #[inline]
    pub fn is_added(self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// `(count, capacity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySize {
    pub count: usize,
    pub capacity: usize,
}

pub struct WatchRegistry {
    inner: Mutex<Inner>,
}

struct Inner {
    backend: Box<dyn WatchBackend>,
    entries: Vec<WatchEntry>,
    by_handle: FxHashMap<WatchHandle, usize>,
    by_path: FxHashMap<PathBuf, WatchHandle>,
    capacity: usize,
    reallocations: u64,
}

impl WatchRegistry {
    pub fn new(backend: impl WatchBackend + 'static) -> Self {
        Self::with_capacity(backend, INITIAL_CAPACITY)
    }

    pub fn with_capacity(backend: impl WatchBackend + 'static, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                backend: Box::new(backend),
                entries: Vec::with_capacity(capacity),
                by_handle: FxHashMap::default(),
                by_path: FxHashMap::default(),
                capacity,
                reallocations: 0,
            }),
        }
    }

    /// Start watching `path`. Idempotent per path.
    pub fn register(&self, path: &Path) -> Result<Registration, WatchError> {
        if path.as_os_str().len() > MAX_PATH_BYTES {
            return Err(WatchError::PathTooLong(path.to_path_buf()));
        }

        let mut inner = self.inner.lock();
        if let Some(&handle) = inner.by_path.get(path) {
            return Ok(Registration::Existing(handle));
        }

        let handle = inner
            .backend
            .add_watch(path)
            .map_err(|e| WatchError::from_io(path.to_path_buf(), e))?;

        // Same inode reached through another path: the kernel hands back the
        // live handle. Keep the first path.
        if inner.by_handle.contains_key(&handle) {
            return Ok(Registration::Existing(handle));
        }

        if inner.entries.len() >= inner.capacity {
            if let Err(e) = inner.grow() {
                let _ = inner.backend.remove_watch(handle);
                crate::log!("error"; "watch table growth failed: {}", e);
                return Err(WatchError::OutOfMemory(path.to_path_buf()));
            }
            crate::log!("watch"; "watch table expanded to {} entries", inner.capacity);
        }

        let index = inner.entries.len();
        inner.entries.push(WatchEntry {
            handle,
            path: path.to_path_buf(),
            created_at: SystemTime::now(),
            event_count: 0,
        });
        inner.by_handle.insert(handle, index);
        inner.by_path.insert(path.to_path_buf(), handle);

        Ok(Registration::Added(handle))
    }

    /// Stop watching and drop the entry.
    pub fn unregister(&self, handle: WatchHandle) -> Option<WatchEntry> {
        let mut inner = self.inner.lock();
        let entry = inner.take(handle)?;
        if let Err(e) = inner.backend.remove_watch(handle) {
            crate::debug!("watch"; "remove {} ({}): {}", handle, entry.path.display(), e);
        }
        Some(entry)
    }

    /// Drop the entry for a watch the kernel already invalidated.
    pub fn forget(&self, handle: WatchHandle) -> Option<WatchEntry> {
        let mut inner = self.inner.lock();
        let entry = inner.take(handle)?;
        inner.backend.forget(handle);
        Some(entry)
    }

    /// Unregister every watch at or below `dir`.
    pub fn unregister_subtree(&self, dir: &Path) -> Vec<WatchEntry> {
        let mut inner = self.inner.lock();
        let handles: Vec<_> = inner
            .entries
            .iter()
            .filter(|e| e.path.starts_with(dir))
            .map(|e| e.handle)
            .collect();

        let mut removed = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(entry) = inner.take(handle) {
                let _ = inner.backend.remove_watch(handle);
                removed.push(entry);
            }
        }
        removed
    }

    /// Unregister everything (shutdown). Returns how many were removed.
    pub fn unregister_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let handles: Vec<_> = inner.entries.iter().map(|e| e.handle).collect();
        for &handle in &handles {
            let _ = inner.backend.remove_watch(handle);
        }
        inner.entries.clear();
        inner.by_handle.clear();
        inner.by_path.clear();
        handles.len()
    }

    /// In-memory lookup, no I/O.
    pub fn resolve(&self, handle: WatchHandle) -> Option<PathBuf> {
        let inner = self.inner.lock();
        let &index = inner.by_handle.get(&handle)?;
        Some(inner.entries[index].path.clone())
    }

    pub fn handle_of(&self, path: &Path) -> Option<WatchHandle> {
        self.inner.lock().by_path.get(path).copied()
    }

    /// Count one emitted event against `handle`'s directory.
    pub fn record_event(&self, handle: WatchHandle) -> bool {
        let mut inner = self.inner.lock();
        let Some(&index) = inner.by_handle.get(&handle) else {
            return false;
        };
        inner.entries[index].event_count += 1;
        true
    }

    pub fn size(&self) -> RegistrySize {
        let inner = self.inner.lock();
        RegistrySize {
            count: inner.entries.len(),
            capacity: inner.capacity,
        }
    }

    pub fn reallocations(&self) -> u64 {
        self.inner.lock().reallocations
    }

    /// Directory with the most emitted events so far.
    pub fn most_active(&self) -> Option<(PathBuf, u64)> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter(|e| e.event_count > 0)
            .max_by_key(|e| e.event_count)
            .map(|e| (e.path.clone(), e.event_count))
    }
}

impl Inner {
    /// Double the logical capacity, reserving the backing storage up front.
    fn grow(&mut self) -> Result<(), std::collections::TryReserveError> {
        let new_capacity = self.capacity.saturating_mul(GROWTH_FACTOR);
        let additional = new_capacity.saturating_sub(self.entries.len());
        self.entries.try_reserve_exact(additional)?;
        self.capacity = new_capacity;
        self.reallocations += 1;
        Ok(())
    }

    /// Remove an entry from the table and both indexes.
    fn take(&mut self, handle: WatchHandle) -> Option<WatchEntry> {
        let index = self.by_handle.remove(&handle)?;
        let entry = self.entries.swap_remove(index);
        self.by_path.remove(&entry.path);
        if let Some(moved) = self.entries.get(index) {
            self.by_handle.insert(moved.handle, index);
        }
        Some(entry)
    }
}
