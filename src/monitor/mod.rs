//! Monitoring session: owns every service object and the worker threads.
//!
//! ```text
//! start()  canonicalize root → open log → inotify → install watches
//! run()    dispatch thread + stats thread + SIGUSR1 forwarder (+ control thread)
//!          wait for shutdown
//!          clear flag → remove all watches (wakes the blocking read)
//!          join → final snapshot → stop line
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver};

use crate::archive::{ArchivePolicy, LogArchive};
use crate::config::MonitorConfig;
use crate::control::{ControlContext, ControlServer};
use crate::core::PrintSignal;
use crate::dispatch::Dispatcher;
use crate::filter::PathFilter;
use crate::freshness::ChangeCache;
use crate::stats::{Aggregator, Counters, StatsSnapshot, StatsSources};
use crate::watch::{self, InotifySource, WatchRegistry, inotify_pair};

const DISPATCH_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

pub struct MonitorSession {
    root: PathBuf,
    config: MonitorConfig,
    registry: Arc<WatchRegistry>,
    cache: Arc<ChangeCache>,
    archive: Arc<LogArchive>,
    counters: Arc<Counters>,
    dispatcher: Arc<Dispatcher>,
    source: InotifySource,
    running: Arc<AtomicBool>,
    started: Instant,
}

impl MonitorSession {
    /// Set everything up. Any error here is fatal and leaves nothing running.
    pub fn start(root: &Path, config: MonitorConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot resolve root `{}`", root.display()))?;

        let archive = LogArchive::open(
            &config.log_file,
            ArchivePolicy {
                max_bytes: config.max_log_bytes(),
                max_files: config.max_log_files,
                compress: config.enable_compression,
            },
        )
        .with_context(|| format!("cannot open log `{}`", config.log_file.display()))?;
        let archive = Arc::new(archive);

        let (backend, source) =
            inotify_pair().context("cannot initialize the notification subsystem")?;
        let registry = Arc::new(WatchRegistry::new(backend));
        let counters = Arc::new(Counters::new());

        let report = watch::install(&registry, &root, config.recursive)
            .with_context(|| format!("cannot watch `{}`", root.display()))?;
        counters.record_limit_hits(report.limit_hits());

        let cache = Arc::new(ChangeCache::new(
            config.enable_checksum,
            config.hash_ceiling_bytes(),
        ));
        let filter = PathFilter::new(config.rule_set())
            .reserve_with_generations(&config.log_file)
            .reserve(&config.config_path)
            .reserve(&config.stats_file);

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            filter,
            Arc::clone(&cache),
            Arc::clone(&archive),
            Arc::clone(&counters),
            config.recursive,
        ));

        crate::log!(
            "watch";
            "watching {} ({} directories{})",
            root.display(),
            report.added.len(),
            if report.skipped.is_empty() {
                String::new()
            } else {
                format!(", {} skipped", report.skipped.len())
            }
        );
        archive
            .append(&format!(
                "[START] File monitor started: {} (recursive: {}, checksum: {}, compression: {})",
                root.display(),
                yes_no(config.recursive),
                yes_no(config.enable_checksum),
                yes_no(config.enable_compression),
            ))
            .context("cannot write to log")?;

        Ok(Self {
            root,
            config,
            registry,
            cache,
            archive,
            counters,
            dispatcher,
            source,
            running: Arc::new(AtomicBool::new(true)),
            started: Instant::now(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run until `shutdown` fires (or the dispatch thread fails), then tear
    /// down and return the final snapshot.
    pub fn run(self, shutdown: Receiver<()>) -> Result<StatsSnapshot> {
        let Self {
            config,
            registry,
            cache,
            archive,
            counters,
            dispatcher,
            mut source,
            running,
            started,
            ..
        } = self;

        let (done_tx, done_rx) = channel::bounded(1);
        let dispatch_running = Arc::clone(&running);
        let dispatch = std::thread::Builder::new()
            .name("fmon-dispatch".into())
            .spawn(move || {
                let result = dispatcher.run(&mut source, &dispatch_running);
                if let Err(e) = &result {
                    crate::log!("error"; "reading notifications failed: {}", e);
                    crate::core::request_shutdown();
                }
                let _ = done_tx.send(result);
            })
            .context("cannot start dispatch thread")?;

        let sources = StatsSources {
            registry: Arc::clone(&registry),
            cache,
            archive: Arc::clone(&archive),
            counters,
            started,
        };
        let aggregator = Aggregator::spawn(
            sources,
            config.stats_file.clone(),
            config.stats_interval(),
            Arc::clone(&running),
        )
        .context("cannot start stats thread")?;

        let print_signal = match PrintSignal::forward(aggregator.print_trigger()) {
            Ok(forwarder) => {
                crate::log!("stats"; "send SIGUSR1 to pid {} for a stats dump", std::process::id());
                Some(forwarder)
            }
            Err(e) => {
                crate::log!("warn"; "SIGUSR1 stats dump unavailable: {}", e);
                None
            }
        };

        let control = match &config.control_socket {
            Some(path) => {
                let ctx = ControlContext {
                    latest: aggregator.latest(),
                    print_trigger: aggregator.print_trigger(),
                };
                match ControlServer::spawn(path, ctx, Arc::clone(&running)) {
                    Ok(server) => Some(server),
                    Err(e) => {
                        crate::log!("warn"; "control socket disabled: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        // Wait for a signal, or for the dispatch thread to give up
        let mut early_exit = None;
        loop {
            channel::select! {
                recv(shutdown) -> _ => break,
                recv(done_rx) -> result => {
                    early_exit = result.ok();
                    break;
                }
                default(SHUTDOWN_POLL) => {
                    if crate::core::is_shutdown() {
                        break;
                    }
                }
            }
        }

        running.store(false, Ordering::SeqCst);
        let removed = registry.unregister_all();
        crate::debug!("watch"; "removed {} watches", removed);

        let dispatch_result = match early_exit {
            Some(result) => Some(result),
            None => done_rx.recv_timeout(DISPATCH_JOIN_TIMEOUT).ok(),
        };
        match dispatch_result {
            Some(_) => {
                let _ = dispatch.join();
            }
            None => crate::log!("warn"; "dispatch thread did not stop in time"),
        }

        if let Some(server) = control {
            server.shutdown();
        }
        if let Some(forwarder) = print_signal {
            forwarder.stop();
        }
        let snapshot = aggregator
            .stop()
            .ok_or_else(|| anyhow!("stats thread panicked"))?;

        if let Err(e) = archive.append("[STOP] File monitor stopped") {
            crate::log!("error"; "cannot append to log: {}", e);
        }
        crate::log!("watch"; "stopped after {}s, {} events", snapshot.uptime_seconds, snapshot.events_total);

        match dispatch_result {
            Some(Err(e)) => Err(anyhow::Error::new(e).context("notification read failed")),
            _ => Ok(snapshot),
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
