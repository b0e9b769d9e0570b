//! Event dispatch: raw kernel notifications in, domain events out.
//!
//! ```text
//! RawEvent → overflow? → resolve handle → PathFilter → tree upkeep (dirs)
//!          → kinds → change gate (Modified) → log append → counters
//! ```
//!
//! A rejected directory is never watched. Directories leaving the tree are
//! always released, whatever their name.

mod event;

pub use event::{DomainEvent, DomainEventKind};

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use inotify::EventMask;

use crate::archive::LogArchive;
use crate::filter::{PathFilter, Verdict};
use crate::freshness::ChangeCache;
use crate::stats::Counters;
use crate::watch::{self, EventSource, MAX_PATH_BYTES, RawEvent, WatchRegistry};

pub struct Dispatcher {
    registry: Arc<WatchRegistry>,
    filter: PathFilter,
    cache: Arc<ChangeCache>,
    archive: Arc<LogArchive>,
    counters: Arc<Counters>,
    recursive: bool,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<WatchRegistry>,
        filter: PathFilter,
        cache: Arc<ChangeCache>,
        archive: Arc<LogArchive>,
        counters: Arc<Counters>,
        recursive: bool,
    ) -> Self {
        Self {
            registry,
            filter,
            cache,
            archive,
            counters,
            recursive,
        }
    }

    /// Blocking read loop. Returns when `running` is cleared (the caller
    /// removes all watches to wake the read) or the source fails.
    pub fn run(&self, source: &mut dyn EventSource, running: &AtomicBool) -> io::Result<()> {
        while running.load(Ordering::SeqCst) {
            let batch = match source.next_batch() {
                Ok(batch) => batch,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if !running.load(Ordering::SeqCst) {
                break;
            }
            self.dispatch_batch(&batch);
        }
        Ok(())
    }

    pub fn dispatch_batch(&self, batch: &[RawEvent]) -> usize {
        batch.iter().map(|raw| self.dispatch(raw).len()).sum()
    }

    /// Run the full pipeline for one notification.
    pub fn dispatch(&self, raw: &RawEvent) -> Vec<DomainEvent> {
        crate::debug!("event"; "{} {:?} cookie={}", raw.handle, raw.mask, raw.cookie);

        if raw.mask.contains(EventMask::Q_OVERFLOW) {
            self.report_overflow();
            return Vec::new();
        }
        if raw.mask.contains(EventMask::IGNORED) {
            if let Some(entry) = self.registry.forget(raw.handle) {
                let age = entry.created_at.elapsed().unwrap_or_default();
                crate::debug!("watch"; "kernel dropped watch on {} after {:?}", entry.path.display(), age);
            }
            return Vec::new();
        }

        let Some(dir) = self.registry.resolve(raw.handle) else {
            self.counters.record_unresolved();
            crate::log!("warn"; "event for unknown watch {}", raw.handle);
            return Vec::new();
        };
        let Some(name) = raw.name() else {
            return Vec::new();
        };

        let path = dir.join(name);
        if path.as_os_str().len() > MAX_PATH_BYTES {
            crate::log!("warn"; "path longer than {} bytes dropped under {}", MAX_PATH_BYTES, dir.display());
            return Vec::new();
        }

        let is_dir = raw.mask.contains(EventMask::ISDIR);
        let filename = name.to_string_lossy();
        let verdict = if is_dir {
            self.filter.check_directory(&filename)
        } else {
            self.filter.check(&filename)
        };
        if is_dir {
            self.maintain_tree(raw.mask, &path, verdict.is_accepted());
        }

        let alerts = match verdict {
            Verdict::Accept { alerts } => alerts,
            Verdict::Reject(reason) => {
                crate::debug!("event"; "{} filtered ({:?})", path.display(), reason);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for kind in DomainEventKind::from_mask(raw.mask) {
            if !is_dir {
                match kind {
                    DomainEventKind::Modified if !self.cache.confirm_change(&path) => continue,
                    DomainEventKind::Deleted | DomainEventKind::MovedFrom => {
                        self.cache.forget(&path);
                    }
                    _ => {}
                }
            }
            events.push(DomainEvent::new(kind, path.clone(), is_dir));
        }

        if events.is_empty() {
            return events;
        }

        for rule in alerts {
            self.counters.record_alert();
            let line = format!("[ALERT] pattern '{}' matched: {}", rule.pattern(), path.display());
            crate::log!("alert"; "{}", line);
            self.append(&line);
        }

        for event in &events {
            crate::log!("event"; "{}", event);
            self.append(&event.to_string());
            self.counters.record_event();
            self.registry.record_event(raw.handle);
        }
        events
    }

    /// Extend the watch tree for accepted directories that appear, drop it
    /// for any directory that leaves. For deletions the kernel's IGNORED may
    /// arrive first; whichever comes second finds nothing to remove.
    fn maintain_tree(&self, mask: EventMask, path: &Path, accepted: bool) {
        if mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
            if !self.recursive || !accepted {
                return;
            }
            match watch::install(&self.registry, path, true) {
                Ok(report) => {
                    self.counters.record_limit_hits(report.limit_hits());
                    if !report.added.is_empty() {
                        crate::log!("watch"; "watching {} (+{} directories)", path.display(), report.added.len());
                    }
                }
                Err(e) => {
                    if e.is_resource_exhaustion() {
                        self.counters.record_limit_hits(1);
                    }
                    crate::log!("warn"; "{}", e);
                }
            }
        } else if mask.contains(EventMask::MOVED_FROM) {
            let removed = self.registry.unregister_subtree(path);
            if !removed.is_empty() {
                crate::log!("watch"; "stopped watching {} ({} directories moved out)", path.display(), removed.len());
            }
        } else if mask.contains(EventMask::DELETE)
            && let Some(handle) = self.registry.handle_of(path)
        {
            self.registry.unregister(handle);
            crate::debug!("watch"; "released {} ({})", handle, path.display());
        }
    }

    fn report_overflow(&self) {
        self.counters.record_overflow();
        let line = "[OVERFLOW] kernel event queue overflowed, events may have been lost";
        crate::log!("overflow"; "{}", line);
        self.append(line);
    }

    fn append(&self, line: &str) {
        if let Err(e) = self.archive.append(line) {
            crate::log!("error"; "cannot append to {}: {}", self.archive.path().display(), e);
        }
    }
}

#[cfg(test)]
mod tests;
