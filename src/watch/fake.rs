//! In-memory backend for registry/installer tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::backend::{WatchBackend, WatchHandle};

#[derive(Default)]
struct State {
    next: i32,
    live: FxHashMap<WatchHandle, PathBuf>,
    failures: FxHashMap<PathBuf, io::ErrorKind>,
    removed: usize,
}

/// Cloneable handle; clones share state so tests can inspect after boxing.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make `add_watch` fail for `path` with `kind`.
    pub(crate) fn fail_on(&self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.state
            .lock()
            .failures
            .insert(path.as_ref().to_path_buf(), kind);
    }

    pub(crate) fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub(crate) fn removed_count(&self) -> usize {
        self.state.lock().removed
    }

    pub(crate) fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.state.lock().live.values().cloned().collect();
        paths.sort();
        paths
    }
}

impl WatchBackend for FakeBackend {
    fn add_watch(&mut self, path: &Path) -> io::Result<WatchHandle> {
        let mut state = self.state.lock();
        if let Some(&kind) = state.failures.get(path) {
            return Err(io::Error::from(kind));
        }
        state.next += 1;
        let handle = WatchHandle::new(state.next);
        state.live.insert(handle, path.to_path_buf());
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let mut state = self.state.lock();
        state.removed += 1;
        state
            .live
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn forget(&mut self, handle: WatchHandle) {
        self.state.lock().live.remove(&handle);
    }
}
