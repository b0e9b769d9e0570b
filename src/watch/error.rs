use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::MAX_PATH_BYTES;

/// Watch installation failures.
///
/// Messages carry the path and the OS reason so the log alone is enough to
/// diagnose a failure.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("not a directory: `{0}`")]
    NotADirectory(PathBuf),

    #[error("cannot read `{0}`: {1}")]
    PathUnreadable(PathBuf, #[source] io::Error),

    #[error("path longer than {MAX_PATH_BYTES} bytes rejected: `{0}`")]
    PathTooLong(PathBuf),

    #[error("permission denied watching `{0}`: {1}")]
    PermissionDenied(PathBuf, #[source] io::Error),

    #[error("kernel watch limit reached at `{0}`: {1}")]
    LimitReached(PathBuf, #[source] io::Error),

    #[error("registry could not grow while adding `{0}`")]
    OutOfMemory(PathBuf),

    #[error("failed to watch `{0}`: {1}")]
    Os(PathBuf, #[source] io::Error),
}

impl WatchError {
    /// Classify an error returned by the notification subsystem.
    pub fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path, err),
            io::ErrorKind::StorageFull | io::ErrorKind::OutOfMemory => {
                Self::LimitReached(path, err)
            }
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            io::ErrorKind::NotFound => Self::PathUnreadable(path, err),
            _ => Self::Os(path, err),
        }
    }

    /// Kernel or memory exhaustion: the subtree stays unwatched, monitoring continues.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::LimitReached(..) | Self::OutOfMemory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classification() {
        let p = || PathBuf::from("/data/sub");

        assert!(matches!(
            WatchError::from_io(p(), io::Error::from(io::ErrorKind::PermissionDenied)),
            WatchError::PermissionDenied(..)
        ));
        assert!(matches!(
            WatchError::from_io(p(), io::Error::from(io::ErrorKind::NotADirectory)),
            WatchError::NotADirectory(_)
        ));

        let limit = WatchError::from_io(p(), io::Error::from(io::ErrorKind::StorageFull));
        assert!(limit.is_resource_exhaustion());
        assert!(format!("{limit}").contains("/data/sub"));

        assert!(!WatchError::NotADirectory(p()).is_resource_exhaustion());
    }
}
