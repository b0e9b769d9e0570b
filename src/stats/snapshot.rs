use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logger::StatsBlock;

/// Point-in-time statistics, persisted wholesale on every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub timestamp: String,
    pub events_total: u64,
    pub events_per_second: f64,
    pub watches_active: usize,
    pub watches_capacity: usize,
    pub watch_reallocations: u64,
    pub watch_limit_hits: u64,
    pub cache_entries: usize,
    pub memory_kb: u64,
    pub cpu_percent: f32,
    pub uptime_seconds: u64,
    pub most_active_path: Option<String>,
    pub disk_percent: f64,
    pub overflow_count: u64,
    pub alerts_total: u64,
    pub unresolved_events: u64,
    pub bytes_logged: u64,
    pub log_rotations: u64,
}

impl StatsSnapshot {
    /// Write to a sibling temp file, then rename over `path`.
    ///
    /// Readers of `path` see either the previous document or this one in full.
    pub fn persist(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        let tmp = temp_sibling(path);
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    /// Read a document written by [`persist`](Self::persist). Fields missing
    /// from older documents load as zero.
    pub fn load(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn to_block(&self) -> StatsBlock {
        let mut block = StatsBlock::new("monitor stats");
        block
            .row("events_total", self.events_total)
            .row("events_per_second", format!("{:.2}", self.events_per_second))
            .row(
                "watches",
                format!("{}/{}", self.watches_active, self.watches_capacity),
            )
            .row("reallocations", self.watch_reallocations)
            .row("limit_hits", self.watch_limit_hits)
            .row("cache_entries", self.cache_entries)
            .row("memory_kb", self.memory_kb)
            .row("cpu_percent", format!("{:.1}", self.cpu_percent))
            .row("disk_percent", format!("{:.1}", self.disk_percent))
            .row("uptime_seconds", self.uptime_seconds)
            .row(
                "most_active",
                self.most_active_path.as_deref().unwrap_or("-"),
            )
            .row("overflows", self.overflow_count)
            .row("alerts", self.alerts_total)
            .row("unresolved", self.unresolved_events)
            .row("bytes_logged", self.bytes_logged)
            .row("rotations", self.log_rotations);
        block
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stats".to_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
