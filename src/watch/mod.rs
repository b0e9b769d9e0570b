//! Directory watches: the kernel seam, the handle registry and the recursive
//! installer that keeps the tree covered.

mod backend;
mod error;
mod installer;
mod registry;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{EventSource, InotifySource, RawEvent, inotify_pair};
pub use installer::install;
pub use registry::WatchRegistry;

#[cfg(test)]
pub use backend::WatchHandle;
#[cfg(test)]
pub use registry::INITIAL_CAPACITY;

/// Longest path accepted anywhere in the pipeline. Longer paths are rejected,
/// never truncated.
pub const MAX_PATH_BYTES: usize = 4096;
