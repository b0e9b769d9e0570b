use std::fmt;
use std::path::PathBuf;

use inotify::EventMask;

/// Application-level event kinds, in the order one raw notification expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainEventKind {
    Created,
    Deleted,
    Modified,
    MovedFrom,
    MovedTo,
    AttributeChanged,
    Opened,
    Closed,
}

impl DomainEventKind {
    const MAPPING: [(EventMask, Self); 8] = [
        (EventMask::CREATE, Self::Created),
        (EventMask::DELETE, Self::Deleted),
        (EventMask::MODIFY, Self::Modified),
        (EventMask::MOVED_FROM, Self::MovedFrom),
        (EventMask::MOVED_TO, Self::MovedTo),
        (EventMask::ATTRIB, Self::AttributeChanged),
        (EventMask::OPEN, Self::Opened),
        (EventMask::CLOSE_WRITE, Self::Closed),
    ];

    /// Every kind whose flag is set in `mask`.
    pub fn from_mask(mask: EventMask) -> impl Iterator<Item = Self> {
        Self::MAPPING
            .into_iter()
            .filter(move |(flag, _)| mask.contains(*flag))
            .map(|(_, kind)| kind)
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Deleted => "Deleted",
            Self::Modified => "Modified",
            Self::MovedFrom => "Moved from",
            Self::MovedTo => "Moved to",
            Self::AttributeChanged => "Attribute changed",
            Self::Opened => "Opened",
            Self::Closed => "Closed",
        }
    }

    /// Kinds whose log line carries the file size.
    const fn reports_size(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::MovedTo | Self::Closed
        )
    }
}

/// A classified, filtered event about one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub kind: DomainEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
    /// Size at dispatch time, for kinds that report one
    pub size: Option<u64>,
}

impl DomainEvent {
    pub fn new(kind: DomainEventKind, path: PathBuf, is_dir: bool) -> Self {
        let size = if kind.reports_size() && !is_dir {
            std::fs::symlink_metadata(&path).ok().map(|m| m.len())
        } else {
            None
        };
        Self {
            kind,
            path,
            is_dir,
            size,
        }
    }
}

/// `<verb>: <path>[ (<size> bytes)]`
impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.verb(), self.path.display())?;
        if self.is_dir {
            write!(f, " (directory)")?;
        } else if let Some(size) = self.size {
            write!(f, " ({size} bytes)")?;
        }
        Ok(())
    }
}
