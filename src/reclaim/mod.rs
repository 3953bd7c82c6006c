//! Cooperative reclaim.
//!
//! The cache never evicts on its own. Shrinking asks an external unuse path
//! to pull pages back into memory, which in turn flushes them from the cache
//! through the normal operations.

mod daemon;
mod shrink;

pub use daemon::{DaemonHandle, ShrinkDaemon};
pub use shrink::{Reclaimer, ShrinkReport};

use std::sync::Arc;

/// The paging path's "bring these pages back" routine
pub trait UnuseCollaborator: Send + Sync {
    /// Try to retire up to `budget` cached pages from `area`
    ///
    /// Never retires more than `budget`; may retire fewer under concurrent
    /// activity. May block for as long as the real I/O takes.
    fn try_retire(&self, area: u32, budget: u64, allow_blocking: bool) -> u64;
}

impl<F> UnuseCollaborator for F
where
    F: Fn(u32, u64, bool) -> u64 + Send + Sync,
{
    fn try_retire(&self, area: u32, budget: u64, allow_blocking: bool) -> u64 {
        self(area, budget, allow_blocking)
    }
}

/// Memory commit accounting consulted before each unuse request
pub trait MemoryAccounting: Send + Sync {
    /// Reserve room for `pages` to come back into memory; false if there
    /// is not enough
    fn charge(&self, pages: u64) -> bool;

    /// Give back a reservation made by `charge`
    fn uncharge(&self, pages: u64);
}

/// Accounting that always has room
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl MemoryAccounting for Unlimited {
    fn charge(&self, _pages: u64) -> bool {
        true
    }

    fn uncharge(&self, _pages: u64) {}
}

/// Extension trait to start target enforcement in one call.
pub trait ReclaimerDaemonExt {
    /// Start the shrink daemon, re-applying the current target every
    /// `Config::daemon_interval`.
    ///
    /// Usage:
    /// ```rust
    /// use frontswap_cache::{Config, Frontswap, Reclaimer, ReclaimerDaemonExt};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let cache = Arc::new(Frontswap::new(Config {
    ///     daemon_interval: Duration::from_millis(100),
    ///     ..Config::default()
    /// }));
    /// let reclaimer = Arc::new(Reclaimer::unlimited(
    ///     cache,
    ///     Box::new(|_area: u32, _budget: u64, _block: bool| -> u64 { 0 }),
    /// ));
    /// let daemon = reclaimer.start_daemon();
    /// daemon.stop();
    /// ```
    fn start_daemon(&self) -> DaemonHandle;
}

impl ReclaimerDaemonExt for Arc<Reclaimer> {
    fn start_daemon(&self) -> DaemonHandle {
        let interval = self.cache().config().daemon_interval;
        ShrinkDaemon::new(self).start(interval)
    }
}
