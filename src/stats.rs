use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

#[derive(Default)]
pub struct Stats {
    start_ms: AtomicU64,
    last_log_ms: AtomicU64,

    cycles: AtomicU64,
    snapshots_persisted: AtomicU64,
    records_written: AtomicU64,
    pairs_tracked: AtomicU64,

    pairs_discovered: AtomicU64,
    pairs_dead: AtomicU64,

    retries: AtomicU64,
    shape_errors: AtomicU64,
    fetch_failures: AtomicU64,
    sink_failures: AtomicU64,
}

impl Stats {
    pub fn new(now_ms: u64) -> Arc<Self> {
        let s = Arc::new(Self::default());
        s.start_ms.store(now_ms, Ordering::Relaxed);
        s.last_log_ms.store(now_ms, Ordering::Relaxed);
        s
    }

    pub fn inc_cycles(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_snapshots_persisted(&self) {
        self.snapshots_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_written(&self, n: u64) {
        self.records_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_pairs_tracked(&self, n: u64) {
        self.pairs_tracked.store(n, Ordering::Relaxed);
    }

    pub fn inc_pairs_discovered(&self) {
        self.pairs_discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pairs_dead(&self) {
        self.pairs_dead.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shape_errors(&self) {
        self.shape_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_failures(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn should_log(&self, now_ms: u64, every_sec: u64) -> bool {
        if every_sec == 0 { return false; }
        let last = self.last_log_ms.load(Ordering::Relaxed);
        now_ms.saturating_sub(last) >= every_sec.saturating_mul(1000)
    }

    pub fn mark_logged(&self, now_ms: u64) {
        self.last_log_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self, now_ms: u64) -> StatsSnapshot {
        let start = self.start_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            now_ms,
            up_sec: (now_ms.saturating_sub(start)) / 1000,
            cycles: self.cycles.load(Ordering::Relaxed),
            snapshots_persisted: self.snapshots_persisted.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            pairs_tracked: self.pairs_tracked.load(Ordering::Relaxed),
            pairs_discovered: self.pairs_discovered.load(Ordering::Relaxed),
            pairs_dead: self.pairs_dead.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            shape_errors: self.shape_errors.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub now_ms: u64,
    pub up_sec: u64,
    pub cycles: u64,
    pub snapshots_persisted: u64,
    pub records_written: u64,
    pub pairs_tracked: u64,
    pub pairs_discovered: u64,
    pub pairs_dead: u64,
    pub retries: u64,
    pub shape_errors: u64,
    pub fetch_failures: u64,
    pub sink_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_log_respects_cadence() {
        let s = Stats::new(10_000);
        assert!(!s.should_log(10_500, 60));
        assert!(s.should_log(70_000, 60));
        s.mark_logged(70_000);
        assert!(!s.should_log(71_000, 60));
    }

    #[test]
    fn zero_cadence_disables_logging() {
        let s = Stats::new(0);
        assert!(!s.should_log(1_000_000, 0));
    }

    #[test]
    fn snapshot_reflects_counters() {
        let s = Stats::new(10_000);
        s.inc_cycles();
        s.inc_cycles();
        s.add_records_written(5);
        s.inc_pairs_dead();
        let snap = s.snapshot(14_000);
        assert_eq!(snap.up_sec, 4);
        assert_eq!(snap.cycles, 2);
        assert_eq!(snap.records_written, 5);
        assert_eq!(snap.pairs_dead, 1);
    }
}
