//! Recursive watch installation.
//!
//! Strict at the root, best-effort beneath it: a root that cannot be watched
//! aborts the install, a child subtree that cannot be watched is reported and
//! skipped. The same procedure is re-entered for directories that appear at
//! runtime. A grandchild created before its parent's watch lands can be
//! missed; that window is accepted.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::WatchError;
use super::registry::WatchRegistry;

/// What an install pass did.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Newly watched directories, in visit order.
    pub added: Vec<PathBuf>,
    /// Subtrees left unwatched.
    pub skipped: Vec<WatchError>,
}

impl InstallReport {
    /// Resource exhaustion hits among the skipped subtrees.
    pub fn limit_hits(&self) -> usize {
        self.skipped
            .iter()
            .filter(|e| e.is_resource_exhaustion())
            .count()
    }
}

/// Watch `root` and, when `recursive`, every directory below it (depth-first,
/// symlinks not followed).
pub fn install(
    registry: &WatchRegistry,
    root: &Path,
    recursive: bool,
) -> Result<InstallReport, WatchError> {
    let meta = fs::metadata(root).map_err(|e| WatchError::PathUnreadable(root.to_path_buf(), e))?;
    if !meta.is_dir() {
        return Err(WatchError::NotADirectory(root.to_path_buf()));
    }

    let mut report = InstallReport::default();
    if registry.register(root)?.is_added() {
        report.added.push(root.to_path_buf());
    }

    if recursive {
        descend(registry, root, &mut report);
    }

    for err in &report.skipped {
        crate::log!("warn"; "skipped subtree: {}", err);
    }

    Ok(report)
}

/// Depth-first walk with an explicit stack (no recursion depth limit).
fn descend(registry: &WatchRegistry, root: &Path, report: &mut InstallReport) {
    let mut stack = Vec::new();
    push_children(root, &mut stack, report);

    while let Some(dir) = stack.pop() {
        match registry.register(&dir) {
            Ok(registration) => {
                if registration.is_added() {
                    report.added.push(dir.clone());
                }
                push_children(&dir, &mut stack, report);
            }
            Err(e) => report.skipped.push(e),
        }
    }
}

/// Queue the child directories of `dir` so they pop in name order.
fn push_children(dir: &Path, stack: &mut Vec<PathBuf>, report: &mut InstallReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            report
                .skipped
                .push(WatchError::PathUnreadable(dir.to_path_buf(), e));
            return;
        }
    };

    let mut children: Vec<PathBuf> = entries
        .flatten()
        // file_type() comes from the dirent and does not follow symlinks
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    children.sort_unstable_by(|a, b| b.cmp(a));
    stack.extend(children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::fake::FakeBackend;
    use std::io;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("d")).unwrap();
        fs::write(root.join("a/file.txt"), "x").unwrap();
        dir
    }

    #[test]
    fn test_install_recursive() {
        let dir = tree();
        let root = dir.path();
        let backend = FakeBackend::new();
        let registry = WatchRegistry::new(backend.clone());

        let report = install(&registry, root, true).unwrap();
        assert_eq!(
            report.added,
            vec![
                root.to_path_buf(),
                root.join("a"),
                root.join("a/b"),
                root.join("a/b/c"),
                root.join("d"),
            ]
        );
        assert!(report.skipped.is_empty());
        assert_eq!(backend.live_count(), 5);
    }

    #[test]
    fn test_install_non_recursive() {
        let dir = tree();
        let registry = WatchRegistry::new(FakeBackend::new());

        let report = install(&registry, dir.path(), false).unwrap();
        assert_eq!(report.added, vec![dir.path().to_path_buf()]);
        assert_eq!(registry.size().count, 1);
    }

    #[test]
    fn test_root_errors_are_fatal() {
        let dir = tree();
        let registry = WatchRegistry::new(FakeBackend::new());

        assert!(matches!(
            install(&registry, &dir.path().join("missing"), true),
            Err(WatchError::PathUnreadable(..))
        ));
        assert!(matches!(
            install(&registry, &dir.path().join("a/file.txt"), true),
            Err(WatchError::NotADirectory(_))
        ));

        let backend = FakeBackend::new();
        backend.fail_on(dir.path(), io::ErrorKind::PermissionDenied);
        let registry = WatchRegistry::new(backend);
        assert!(matches!(
            install(&registry, dir.path(), true),
            Err(WatchError::PermissionDenied(..))
        ));
        assert_eq!(registry.size().count, 0);
    }

    #[test]
    fn test_child_failure_skips_subtree_only() {
        let dir = tree();
        let root = dir.path();
        let backend = FakeBackend::new();
        backend.fail_on(root.join("a/b"), io::ErrorKind::StorageFull);
        let registry = WatchRegistry::new(backend.clone());

        let report = install(&registry, root, true).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.limit_hits(), 1);
        // a/b and a/b/c unwatched, siblings still installed
        assert_eq!(
            backend.watched_paths(),
            vec![root.to_path_buf(), root.join("a"), root.join("d")]
        );
    }

    #[test]
    fn test_reinstall_subdirectory() {
        let dir = tree();
        let root = dir.path();
        let registry = WatchRegistry::new(FakeBackend::new());
        install(&registry, root, true).unwrap();

        fs::create_dir_all(root.join("new/inner")).unwrap();
        let report = install(&registry, &root.join("new"), true).unwrap();
        assert_eq!(report.added, vec![root.join("new"), root.join("new/inner")]);
        assert_eq!(registry.size().count, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_not_followed() {
        let dir = tree();
        let root = dir.path();
        std::os::unix::fs::symlink(root.join("a"), root.join("link")).unwrap();
        let registry = WatchRegistry::new(FakeBackend::new());

        let report = install(&registry, root, true).unwrap();
        assert!(!report.added.contains(&root.join("link")));
    }
}
