use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters bumped on the dispatch path.
#[derive(Debug, Default)]
pub struct Counters {
    events_total: AtomicU64,
    overflow_count: AtomicU64,
    watch_limit_hits: AtomicU64,
    alerts: AtomicU64,
    unresolved: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_event(&self) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overflow(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_limit_hits(&self, n: usize) {
        self.watch_limit_hits.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    /// Notification for a watch handle the registry no longer knows.
    #[inline]
    pub fn record_unresolved(&self) {
        self.unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn watch_limit_hits(&self) -> u64 {
        self.watch_limit_hits.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn unresolved(&self) -> u64 {
        self.unresolved.load(Ordering::Relaxed)
    }
}
