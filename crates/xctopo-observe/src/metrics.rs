use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Count, total and maximum of a set of recorded durations.
#[derive(Debug, Default)]
pub struct DurationAgg {
    count: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl DurationAgg {
    pub fn record(&self, dur: Duration) {
        let ns = dur.as_nanos().min(u64::MAX as u128) as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DurationAggSnapshot {
        DurationAggSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total_ns: self.total_ns.load(Ordering::Relaxed),
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationAggSnapshot {
    pub count: u64,
    pub total_ns: u64,
    pub max_ns: u64,
}

impl DurationAggSnapshot {
    pub fn avg_ns(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ns / self.count
        }
    }
}

/// Records the elapsed time into `agg` when dropped.
pub struct ScopedTimer<'a> {
    start: Instant,
    agg: &'a DurationAgg,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(agg: &'a DurationAgg) -> Self {
        Self {
            start: Instant::now(),
            agg,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.agg.record(self.start.elapsed());
    }
}
