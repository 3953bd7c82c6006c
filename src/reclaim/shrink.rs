use parking_lot::RwLockReadGuard;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{MemoryAccounting, UnuseCollaborator, Unlimited};
use crate::cache::{AreaList, Frontswap};

/// Sentinel for "no target set"
const NO_TARGET: u64 = u64::MAX;

/// What one pass decided while holding the area-list lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShrinkPlan {
    /// Already at or under target
    Done,

    /// Over target but every candidate failed the accounting check
    Starved,

    /// Ask the unuse path to retire `quota` pages from `area`
    Retire { area: u32, quota: u64 },
}

/// Outcome of one `shrink` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShrinkReport {
    pub passes: usize,
    pub unuse_calls: usize,
    pub pages_requested: u64,
    pub pages_retired: u64,
    pub resident_before: u64,
    pub resident_after: u64,

    /// False when the passes ran out first; shrink is best-effort
    pub reached: bool,
}

/// Drives resident pages down to a target through the unuse path
pub struct Reclaimer {
    cache: Arc<Frontswap>,
    unuse: Box<dyn UnuseCollaborator>,
    accounting: Box<dyn MemoryAccounting>,

    /// Last target written through `set_target_pages`
    target_pages: AtomicU64,
}

impl Reclaimer {
    pub fn new(
        cache: Arc<Frontswap>,
        unuse: Box<dyn UnuseCollaborator>,
        accounting: Box<dyn MemoryAccounting>,
    ) -> Self {
        Self {
            cache,
            unuse,
            accounting,
            target_pages: AtomicU64::new(NO_TARGET),
        }
    }

    /// Reclaimer without an accounting limit
    pub fn unlimited(cache: Arc<Frontswap>, unuse: Box<dyn UnuseCollaborator>) -> Self {
        Self::new(cache, unuse, Box::new(Unlimited))
    }

    pub fn cache(&self) -> &Arc<Frontswap> {
        &self.cache
    }

    /// Record `target` and shrink to it right away
    pub fn set_target_pages(&self, target: u64) -> ShrinkReport {
        self.target_pages.store(target, Ordering::Release);
        self.shrink(target)
    }

    /// Last target set, if any
    pub fn target_pages(&self) -> Option<u64> {
        match self.target_pages.load(Ordering::Acquire) {
            NO_TARGET => None,
            target => Some(target),
        }
    }

    /// Reduce resident pages across all areas to at most `target`
    ///
    /// Runs at most `Config::shrink_passes` passes. Each pass re-reads fresh
    /// counts from the head of the area list, so a short retire is simply
    /// made up by the next pass. Returns normally whether or not the target
    /// was reached.
    pub fn shrink(&self, target: u64) -> ShrinkReport {
        let mut report = ShrinkReport {
            resident_before: self.cache.current_resident_pages(),
            ..ShrinkReport::default()
        };

        for _ in 0..self.cache.config().shrink_passes {
            report.passes += 1;

            // The guard moves into `plan` and is gone before any unuse call
            match self.plan(self.cache.area_list(), target) {
                ShrinkPlan::Done => break,
                ShrinkPlan::Starved => {
                    log::debug!("shrink: no area passed accounting");
                    break;
                }
                ShrinkPlan::Retire { area, quota } => {
                    let retired = self.unuse.try_retire(area, quota, true);
                    log::debug!(
                        "shrink: area {} asked for {} pages, retired {}",
                        area,
                        quota,
                        retired
                    );
                    report.unuse_calls += 1;
                    report.pages_requested += quota;
                    report.pages_retired += retired.min(quota);
                }
            }
        }

        report.resident_after = self.cache.current_resident_pages();
        report.reached = report.resident_after <= target;
        report
    }

    /// Pick the first area, in id order, that can cover some of the deficit
    fn plan(&self, areas: RwLockReadGuard<'_, AreaList>, target: u64) -> ShrinkPlan {
        let total = Frontswap::total_resident(&areas);
        if total <= target {
            return ShrinkPlan::Done;
        }
        let deficit = total - target;

        for area in areas.values() {
            let resident = area.resident();
            if resident == 0 {
                continue;
            }

            // The whole area if it cannot close the deficit on its own
            let quota = resident.min(deficit);
            if !self.accounting.charge(quota) {
                continue;
            }
            self.accounting.uncharge(quota);

            return ShrinkPlan::Retire {
                area: area.id(),
                quota,
            };
        }

        ShrinkPlan::Starved
    }
}

impl std::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("cache", &self.cache)
            .field("target_pages", &self.target_pages())
            .finish()
    }
}
