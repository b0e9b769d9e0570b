//! Path → fingerprint map that decides whether a modify notification is real.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::hash::{ContentHash, hash_file};

/// Last known state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub fingerprint: ContentHash,
    pub last_seen_size: u64,
    pub last_seen_time: SystemTime,
}

/// Why [`ChangeCache::check`] reached its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// First time this path was fingerprinted.
    New,
    /// Digest differs from the stored one.
    Changed,
    /// Digest matches; the notification was noise.
    Unchanged,
    /// Could not stat or read the file; reported anyway.
    Unreadable,
    /// Above the hashing ceiling; reported without hashing.
    Oversized(u64),
    /// Checksumming is disabled; every notification counts.
    Unchecked,
}

impl Change {
    #[inline]
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Content-digest cache.
///
/// The map lock is held only for lookup and commit; hashing runs outside it.
/// Two concurrent checks of the same path may both report a change, never
/// neither.
pub struct ChangeCache {
    entries: Mutex<FxHashMap<PathBuf, FingerprintEntry>>,
    enabled: bool,
    ceiling: Option<u64>,
}

impl ChangeCache {
    /// `ceiling` is the size in bytes above which files are not hashed.
    pub fn new(enabled: bool, ceiling: Option<u64>) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            enabled,
            ceiling,
        }
    }

    /// `true` unless the file provably has the same content as last time.
    pub fn confirm_change(&self, path: &Path) -> bool {
        match self.check(path) {
            Change::Oversized(size) => {
                crate::log!("event"; "large file {} ({} bytes), reported without hashing", path.display(), size);
                true
            }
            change => change.is_change(),
        }
    }

    pub fn check(&self, path: &Path) -> Change {
        if !self.enabled {
            return Change::Unchecked;
        }

        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                crate::debug!("event"; "stat {} failed: {}", path.display(), e);
                return Change::Unreadable;
            }
        };
        if let Some(ceiling) = self.ceiling
            && size > ceiling
        {
            return Change::Oversized(size);
        }

        let (fingerprint, read) = match hash_file(path) {
            Ok(result) => result,
            Err(e) => {
                crate::debug!("event"; "hash {} failed: {}", path.display(), e);
                return Change::Unreadable;
            }
        };

        let mut entries = self.entries.lock();
        match entries.get_mut(path) {
            Some(entry) if entry.fingerprint == fingerprint => Change::Unchanged,
            Some(entry) => {
                entry.fingerprint = fingerprint;
                entry.last_seen_size = read;
                entry.last_seen_time = SystemTime::now();
                Change::Changed
            }
            None => {
                entries.insert(
                    path.to_path_buf(),
                    FingerprintEntry {
                        fingerprint,
                        last_seen_size: read,
                        last_seen_time: SystemTime::now(),
                    },
                );
                Change::New
            }
        }
    }

    /// Drop the entry for a path that was deleted or moved away.
    pub fn forget(&self, path: &Path) -> bool {
        self.entries.lock().remove(path).is_some()
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<FingerprintEntry> {
        self.entries.lock().get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_observation_is_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one").unwrap();

        let cache = ChangeCache::new(true, None);
        assert_eq!(cache.check(&path), Change::New);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&path).unwrap().last_seen_size, 3);
    }

    #[test]
    fn test_unmodified_file_not_reported_twice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one").unwrap();

        let cache = ChangeCache::new(true, None);
        assert!(cache.check(&path).is_change());
        let stored = cache.get(&path).unwrap();

        // Rewrite identical bytes
        fs::write(&path, "one").unwrap();
        assert!(!cache.check(&path).is_change());
        assert_eq!(cache.get(&path).unwrap(), stored);
    }

    #[test]
    fn test_real_change_reported_exactly_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one").unwrap();

        let cache = ChangeCache::new(true, None);
        assert!(cache.check(&path).is_change());

        fs::write(&path, "two!").unwrap();
        assert_eq!(cache.check(&path), Change::Changed);
        assert!(!cache.check(&path).is_change());
        assert!(!cache.check(&path).is_change());
        assert_eq!(cache.get(&path).unwrap().last_seen_size, 4);

        fs::write(&path, "three").unwrap();
        assert!(cache.check(&path).is_change());
        assert!(!cache.check(&path).is_change());
    }

    #[test]
    fn test_unreadable_fails_open() {
        let dir = TempDir::new().unwrap();
        let cache = ChangeCache::new(true, None);
        let missing = dir.path().join("gone.txt");

        assert_eq!(cache.check(&missing), Change::Unreadable);
        assert!(cache.check(&missing).is_change());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oversized_skips_hashing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        fs::write(&path, vec![0u8; 64]).unwrap();

        let cache = ChangeCache::new(true, Some(16));
        assert_eq!(cache.check(&path), Change::Oversized(64));
        assert!(cache.confirm_change(&path));
        assert!(cache.confirm_change(&path));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_reports_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "same").unwrap();

        let cache = ChangeCache::new(false, None);
        assert!(cache.check(&path).is_change());
        assert!(cache.check(&path).is_change());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget_restarts_tracking() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x").unwrap();

        let cache = ChangeCache::new(true, None);
        cache.check(&path).is_change();
        assert!(cache.forget(&path));
        assert!(!cache.forget(&path));
        assert_eq!(cache.check(&path), Change::New);
    }
}
