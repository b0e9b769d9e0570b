//! Seam between the registry/dispatcher and the kernel notification subsystem.
//!
//! The registry only needs add/remove; the dispatcher only needs to read
//! batches. On Linux both halves share one inotify descriptor.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::Path;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use rustc_hash::FxHashMap;

/// Opaque id of one watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(i32);

#[cfg(test)]
impl WatchHandle {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd{}", self.0)
    }
}

/// One kernel notification, owned.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub handle: WatchHandle,
    pub mask: EventMask,
    pub cookie: u32,
    /// Child name; `None` for events about the watched directory itself.
    pub name: Option<OsString>,
}

impl RawEvent {
    #[cfg(test)]
    pub fn new(handle: WatchHandle, mask: EventMask, name: Option<&str>) -> Self {
        Self {
            handle,
            mask,
            cookie: 0,
            name: name.map(OsString::from),
        }
    }

    /// Child name, treating an empty name like a missing one.
    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Starts and stops per-directory watches.
pub trait WatchBackend: Send {
    fn add_watch(&mut self, path: &Path) -> io::Result<WatchHandle>;

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()>;

    /// Drop bookkeeping for a watch the kernel already invalidated.
    fn forget(&mut self, _handle: WatchHandle) {}
}

/// Produces batches of raw notifications.
pub trait EventSource: Send {
    /// Block until at least one event is available.
    fn next_batch(&mut self) -> io::Result<Vec<RawEvent>>;

    /// Return whatever is queued right now (possibly nothing).
    #[cfg(test)]
    fn poll_batch(&mut self) -> io::Result<Vec<RawEvent>>;
}

/// Event classes every directory watch subscribes to.
pub fn watch_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::DELETE
        | WatchMask::MODIFY
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
        | WatchMask::ATTRIB
        | WatchMask::OPEN
        | WatchMask::CLOSE_WRITE
        | WatchMask::DONT_FOLLOW
        | WatchMask::ONLYDIR
}

/// Open one inotify instance and split it into its two halves.
pub fn inotify_pair() -> io::Result<(InotifyBackend, InotifySource)> {
    let inotify = Inotify::init()?;
    let backend = InotifyBackend {
        watches: inotify.watches(),
        descriptors: FxHashMap::default(),
    };
    let source = InotifySource {
        inotify,
        buffer: vec![0; READ_BUFFER_SIZE],
    };
    Ok((backend, source))
}

// ============================================================================
// inotify
// ============================================================================

const READ_BUFFER_SIZE: usize = 64 * 1024;

pub struct InotifyBackend {
    watches: Watches,
    descriptors: FxHashMap<WatchHandle, WatchDescriptor>,
}

impl WatchBackend for InotifyBackend {
    fn add_watch(&mut self, path: &Path) -> io::Result<WatchHandle> {
        let wd = self.watches.add(path, watch_mask())?;
        let handle = WatchHandle(wd.get_watch_descriptor_id());
        self.descriptors.insert(handle, wd);
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        match self.descriptors.remove(&handle) {
            Some(wd) => self.watches.remove(wd),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown watch {handle}"),
            )),
        }
    }

    fn forget(&mut self, handle: WatchHandle) {
        self.descriptors.remove(&handle);
    }
}

pub struct InotifySource {
    inotify: Inotify,
    buffer: Vec<u8>,
}

impl InotifySource {
    fn collect<'a>(events: impl Iterator<Item = inotify::Event<&'a OsStr>>) -> Vec<RawEvent> {
        events
            .map(|event| RawEvent {
                handle: WatchHandle(event.wd.get_watch_descriptor_id()),
                mask: event.mask,
                cookie: event.cookie,
                name: event.name.map(OsStr::to_os_string),
            })
            .collect()
    }
}

impl EventSource for InotifySource {
    fn next_batch(&mut self) -> io::Result<Vec<RawEvent>> {
        let events = self.inotify.read_events_blocking(&mut self.buffer)?;
        Ok(Self::collect(events))
    }

    #[cfg(test)]
    fn poll_batch(&mut self) -> io::Result<Vec<RawEvent>> {
        match self.inotify.read_events(&mut self.buffer) {
            Ok(events) => Ok(Self::collect(events)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
