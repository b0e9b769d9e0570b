//! Background statistics timer.
//!
//! One thread owns the sampler. Each tick it collects a snapshot, persists it,
//! raises threshold warnings and gives the log a chance to rotate. An
//! out-of-band print can be requested at any time without shifting the tick
//! cadence.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::counters::Counters;
use super::sampler::ResourceSampler;
use super::snapshot::StatsSnapshot;
use crate::archive::LogArchive;
use crate::freshness::ChangeCache;
use crate::watch::WatchRegistry;

const DISK_WARN_PERCENT: f64 = 90.0;
const WATCH_WARN_RATIO: f64 = 0.8;
const MAX_USER_WATCHES: &str = "/proc/sys/fs/inotify/max_user_watches";

/// Everything a snapshot is assembled from.
#[derive(Clone)]
pub struct StatsSources {
    pub registry: Arc<WatchRegistry>,
    pub cache: Arc<ChangeCache>,
    pub archive: Arc<LogArchive>,
    pub counters: Arc<Counters>,
    pub started: Instant,
}

impl StatsSources {
    pub fn collect(&self, sampler: &mut ResourceSampler) -> StatsSnapshot {
        let usage = sampler.sample();
        let size = self.registry.size();
        let elapsed = self.started.elapsed();
        let events_total = self.counters.events_total();

        StatsSnapshot {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            events_total,
            events_per_second: rate(events_total, elapsed),
            watches_active: size.count,
            watches_capacity: size.capacity,
            watch_reallocations: self.registry.reallocations(),
            watch_limit_hits: self.counters.watch_limit_hits(),
            cache_entries: self.cache.len(),
            memory_kb: usage.memory_kb,
            cpu_percent: usage.cpu_percent,
            uptime_seconds: elapsed.as_secs(),
            most_active_path: self
                .registry
                .most_active()
                .map(|(path, _)| path.display().to_string()),
            disk_percent: usage.disk_percent,
            overflow_count: self.counters.overflow_count(),
            alerts_total: self.counters.alerts(),
            unresolved_events: self.counters.unresolved(),
            bytes_logged: self.archive.bytes_logged(),
            log_rotations: self.archive.rotations(),
        }
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 { count as f64 } else { count as f64 / secs }
}

/// Handle to the running aggregator thread.
pub struct Aggregator {
    handle: Option<JoinHandle<StatsSnapshot>>,
    stop_tx: Sender<()>,
    print_tx: Sender<()>,
    latest: Arc<Mutex<Option<StatsSnapshot>>>,
}

impl Aggregator {
    pub fn spawn(
        sources: StatsSources,
        stats_file: PathBuf,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded(1);
        let (print_tx, print_rx) = channel::unbounded();
        let latest = Arc::new(Mutex::new(None));

        let worker = Worker {
            sampler: ResourceSampler::new(stats_file.parent().unwrap_or(&stats_file)),
            sources,
            stats_file,
            latest: Arc::clone(&latest),
            running,
            disk_warned: false,
            watch_warned: false,
        };
        let handle = std::thread::Builder::new()
            .name("fmon-stats".into())
            .spawn(move || worker.run(interval, stop_rx, print_rx))?;

        Ok(Self {
            handle: Some(handle),
            stop_tx,
            print_tx,
            latest,
        })
    }

    /// Sender for the out-of-band print, for other threads.
    pub fn print_trigger(&self) -> Sender<()> {
        self.print_tx.clone()
    }

    /// Shared slot holding the most recent snapshot.
    pub fn latest(&self) -> Arc<Mutex<Option<StatsSnapshot>>> {
        Arc::clone(&self.latest)
    }

    /// Stop the timer and return the final (persisted) snapshot.
    pub fn stop(mut self) -> Option<StatsSnapshot> {
        let _ = self.stop_tx.try_send(());
        self.handle.take()?.join().ok()
    }
}

struct Worker {
    sampler: ResourceSampler,
    sources: StatsSources,
    stats_file: PathBuf,
    latest: Arc<Mutex<Option<StatsSnapshot>>>,
    running: Arc<AtomicBool>,
    disk_warned: bool,
    watch_warned: bool,
}

impl Worker {
    fn run(
        mut self,
        interval: Duration,
        stop_rx: Receiver<()>,
        print_rx: Receiver<()>,
    ) -> StatsSnapshot {
        let ticker = channel::tick(interval);
        // Status queries have something to report from the start
        self.tick();

        while self.running.load(Ordering::SeqCst) {
            channel::select! {
                recv(ticker) -> _ => self.tick(),
                recv(print_rx) -> msg => {
                    if msg.is_ok() {
                        self.print();
                    }
                }
                recv(stop_rx) -> _ => break,
            }
        }

        let last = self.sources.collect(&mut self.sampler);
        self.persist(&last);
        *self.latest.lock() = Some(last.clone());
        last
    }

    fn tick(&mut self) {
        let snapshot = self.sources.collect(&mut self.sampler);
        self.persist(&snapshot);
        self.check_thresholds(&snapshot);

        if let Err(e) = self.sources.archive.rotate_if_needed() {
            crate::log!("error"; "log rotation failed: {}", e);
        }

        crate::debug!(
            "stats";
            "{} events, {} watches, {} cached",
            snapshot.events_total,
            snapshot.watches_active,
            snapshot.cache_entries
        );
        *self.latest.lock() = Some(snapshot);
    }

    fn print(&mut self) {
        let snapshot = self.sources.collect(&mut self.sampler);
        snapshot.to_block().print();
        *self.latest.lock() = Some(snapshot);
    }

    fn persist(&self, snapshot: &StatsSnapshot) {
        if let Err(e) = snapshot.persist(&self.stats_file) {
            crate::log!("error"; "cannot write {}: {}", self.stats_file.display(), e);
        }
    }

    /// Edge-triggered: warn when a threshold is crossed, again only after it
    /// has dropped back below.
    fn check_thresholds(&mut self, snapshot: &StatsSnapshot) {
        let disk_high = snapshot.disk_percent > DISK_WARN_PERCENT;
        if disk_high && !self.disk_warned {
            self.warn(&format!("disk usage at {:.1}%", snapshot.disk_percent));
        }
        self.disk_warned = disk_high;

        let watch_high = max_user_watches()
            .is_some_and(|max| watch_pressure(snapshot.watches_active, max));
        if watch_high && !self.watch_warned {
            self.warn(&format!(
                "{} watches in use, approaching the kernel limit",
                snapshot.watches_active
            ));
        }
        self.watch_warned = watch_high;
    }

    fn warn(&self, message: &str) {
        crate::log!("warn"; "{}", message);
        if let Err(e) = self.sources.archive.append(&format!("[WARN] {message}")) {
            crate::log!("error"; "cannot append to log: {}", e);
        }
    }
}

fn max_user_watches() -> Option<u64> {
    std::fs::read_to_string(MAX_USER_WATCHES)
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn watch_pressure(active: usize, max: u64) -> bool {
    max > 0 && active as f64 > max as f64 * WATCH_WARN_RATIO
}
