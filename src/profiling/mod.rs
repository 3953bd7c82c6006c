//! Lightweight statistics - atomic counters only
//!
//! Fire-and-forget updates, no locks. Read side is a point-in-time
//! snapshot; counters are not mutually consistent under concurrent traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Statistics snapshot exposed for reporting and tuning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontswapStats {
    // Operations
    pub succ_puts: u64,
    pub failed_puts: u64,
    pub gets: u64,
    pub failed_gets: u64,
    pub flushes: u64,

    /// Failed overwrites of a resident slot that forced an invalidation
    pub invariant_repairs: u64,

    // Current state
    pub resident_pages: u64,
    pub enabled: bool,
    pub uptime_secs: u64,
}

impl FrontswapStats {
    /// Share of puts the backend accepted (0.0 - 1.0)
    #[inline]
    pub fn put_acceptance(&self) -> f64 {
        let total = self.succ_puts + self.failed_puts;
        if total > 0 {
            self.succ_puts as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Profiler - lock-free operation counters
pub struct Profiler {
    succ_puts: AtomicU64,
    failed_puts: AtomicU64,
    gets: AtomicU64,
    failed_gets: AtomicU64,
    flushes: AtomicU64,
    invariant_repairs: AtomicU64,

    start_time: Instant,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            succ_puts: AtomicU64::new(0),
            failed_puts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            failed_gets: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            invariant_repairs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Counter snapshot; state fields are filled in by the caller
    pub fn stats(&self, resident_pages: u64, enabled: bool) -> FrontswapStats {
        FrontswapStats {
            succ_puts: self.succ_puts.load(Ordering::Relaxed),
            failed_puts: self.failed_puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            failed_gets: self.failed_gets.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            invariant_repairs: self.invariant_repairs.load(Ordering::Relaxed),
            resident_pages,
            enabled,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn record_put(&self) {
        self.succ_puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_put(&self) {
        self.failed_puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invariant_repair(&self) {
        self.invariant_repairs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_get(&self) {
        self.failed_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}
