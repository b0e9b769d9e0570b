//! Process and disk resource sampling via sysinfo.

use std::path::{Path, PathBuf};

use sysinfo::{Disks, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// One resource reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    pub memory_kb: u64,
    pub cpu_percent: f32,
    pub disk_percent: f64,
}

/// Keeps one `System` alive between samples; process CPU usage is a delta
/// between two refreshes, so the first reading is always zero.
pub struct ResourceSampler {
    system: System,
    pid: Option<Pid>,
    /// Disk usage is reported for the filesystem holding this path
    anchor: PathBuf,
}

impl ResourceSampler {
    pub fn new(anchor: &Path) -> Self {
        let anchor = if anchor.as_os_str().is_empty() {
            Path::new(".")
        } else {
            anchor
        };
        let anchor = anchor
            .canonicalize()
            .unwrap_or_else(|_| anchor.to_path_buf());
        Self {
            system: System::new_with_specifics(RefreshKind::nothing()),
            pid: sysinfo::get_current_pid().ok(),
            anchor,
        }
    }

    pub fn sample(&mut self) -> ResourceUsage {
        let (memory_kb, cpu_percent) = self.process_usage().unwrap_or((0, 0.0));
        ResourceUsage {
            memory_kb,
            cpu_percent,
            disk_percent: disk_percent(&self.anchor).unwrap_or(0.0),
        }
    }

    fn process_usage(&mut self) -> Option<(u64, f32)> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let process = self.system.process(pid)?;
        Some((process.memory() / 1024, process.cpu_usage()))
    }
}

/// Used-space percentage of the mount with the longest prefix of `path`.
fn disk_percent(path: &Path) -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let total = disk.total_space();
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(disk.available_space());
    Some(used as f64 * 100.0 / total as f64)
}
