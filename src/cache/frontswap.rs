use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::area::SwapArea;
use crate::profiling::{FrontswapStats, Profiler};
use crate::registry::{BackendRef, Registry};
use crate::types::{Config, FrontswapError, PutOutcome, Result, SwapPage, SwapSlot};

/// Active areas keyed by id; iteration order is the stable shrink order
pub(crate) type AreaList = BTreeMap<u32, Arc<SwapArea>>;

/// The cache façade the paging path talks to
///
/// Keeps one presence bit per swap slot in step with what the registered
/// backend holds. Callers hold the page lock for a slot across any put, get
/// or flush of it; distinct slots may be driven from any number of threads.
pub struct Frontswap {
    registry: Registry,

    /// Global area-list lock. Held only for bookkeeping, never across a
    /// backend call.
    areas: RwLock<AreaList>,

    config: Config,

    profiler: Profiler,
}

impl Frontswap {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            areas: RwLock::new(BTreeMap::new()),
            config,
            profiler: Profiler::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Make `backend` the active backend and return the previous one
    ///
    /// Areas activated before any backend existed are initialized on the
    /// new backend here.
    pub fn register_backend(&self, backend: BackendRef) -> Option<BackendRef> {
        let previous = self.registry.register(Arc::clone(&backend));

        let active: Vec<u32> = self.areas.read().keys().copied().collect();
        for area in &active {
            backend.init(*area);
        }

        log::debug!(
            "backend registered (replaced: {}, areas initialized: {})",
            previous.is_some(),
            active.len()
        );
        previous
    }

    /// Whether a backend was ever registered
    pub fn is_enabled(&self) -> bool {
        self.registry.is_enabled()
    }

    /// Bring a swap area of `capacity` pages online
    pub fn activate_area(&self, area: u32, capacity: u64) -> Result<()> {
        // Allocated outside the lock; may fail for absurd capacities
        let created = Arc::new(SwapArea::new(area, capacity)?);
        {
            let mut areas = self.areas.write();
            if areas.contains_key(&area) {
                return Err(FrontswapError::AreaActive(area));
            }
            areas.insert(area, created);
        }

        log::debug!("swap area {} online ({} pages)", area, capacity);
        self.init_store(area);
        Ok(())
    }

    /// Take a swap area offline, dropping everything cached for it
    pub fn deactivate_area(&self, area: u32) -> Result<()> {
        let removed = self
            .areas
            .write()
            .remove(&area)
            .ok_or(FrontswapError::UnknownArea(area))?;

        self.discard_area(&removed);
        log::debug!("swap area {} offline", area);
        Ok(())
    }

    /// Announce `area` to the backend
    ///
    /// No-op for areas without a tracker, or while no backend is registered
    /// (registration initializes them later).
    pub fn init_store(&self, area: u32) {
        if self.lookup(area).is_err() {
            return;
        }
        if let Ok(backend) = self.registry.current() {
            backend.init(area);
        }
    }

    /// Offer a page to the backend
    ///
    /// On `Err` the caller writes the page to the real device. A failed
    /// overwrite of a resident slot also invalidates the older copy, so the
    /// slot is never left pointing at stale data.
    pub fn put(&self, page: &SwapPage) -> Result<PutOutcome> {
        let slot = page.slot;
        let area = self.lookup(slot.area)?;
        let offset = area.check(slot)?;
        let backend = self.registry.current()?;

        let dup = area.tracker().test(offset);

        match backend.put(slot, &page.data) {
            Ok(()) => {
                // Only flips (and counts) when the slot was absent
                area.tracker().set(offset);
                self.profiler.record_put();
                log::trace!("put {} (dup: {})", slot, dup);

                if self.config.writethrough {
                    Ok(PutOutcome::WriteThrough)
                } else {
                    Ok(PutOutcome::Stored)
                }
            }
            Err(err) => {
                self.profiler.record_failed_put();
                if dup {
                    self.invalidate_stale(&area, &backend, slot);
                }
                log::trace!("put {} rejected: {}", slot, err);
                Err(FrontswapError::BackendFailure(slot))
            }
        }
    }

    /// A failed overwrite leaves no copy behind: drop the slot entirely.
    fn invalidate_stale(&self, area: &SwapArea, backend: &BackendRef, slot: SwapSlot) {
        backend.invalidate_one(slot);
        area.tracker().clear(slot.offset);
        self.profiler.record_invariant_repair();
        log::warn!("failed overwrite of {}, slot invalidated", slot);
    }

    /// Fill `page` from the backend
    ///
    /// Misses cost no backend call. A backend failure keeps the presence
    /// bit: the copy may still be there, and the caller reads the device.
    pub fn get(&self, page: &mut SwapPage) -> Result<()> {
        let slot = page.slot;
        let area = self.lookup(slot.area)?;
        let offset = area.check(slot)?;

        if !area.tracker().test(offset) {
            return Err(FrontswapError::Miss(slot));
        }

        let backend = self.registry.current()?;
        if let Err(err) = backend.get(slot, &mut page.data) {
            self.profiler.record_failed_get();
            log::warn!("get {} failed: {}", slot, err);
            return Err(FrontswapError::BackendFailure(slot));
        }

        self.profiler.record_get();
        if self.config.exclusive_gets {
            // Ownership moves back to the caller
            backend.invalidate_one(slot);
            area.tracker().clear(offset);
        }
        log::trace!("get {}", slot);
        Ok(())
    }

    /// Drop one slot. Returns false, without touching the backend, when the
    /// slot was not resident.
    pub fn flush_page(&self, slot: SwapSlot) -> bool {
        let Ok(area) = self.lookup(slot.area) else {
            return false;
        };
        let Ok(offset) = area.check(slot) else {
            return false;
        };
        if !area.tracker().test(offset) {
            return false;
        }
        let Ok(backend) = self.registry.current() else {
            return false;
        };

        backend.invalidate_one(slot);
        area.tracker().clear(offset);
        self.profiler.record_flush();
        true
    }

    /// Drop every slot of `area`, whatever its current state
    pub fn flush_area(&self, area: u32) -> Result<()> {
        let area = self.lookup(area)?;
        self.discard_area(&area);
        Ok(())
    }

    fn discard_area(&self, area: &SwapArea) {
        if let Ok(backend) = self.registry.current() {
            backend.invalidate_area(area.id());
        }
        area.tracker().reset();
    }

    /// Whether `slot` is currently held by the backend
    pub fn is_resident(&self, slot: SwapSlot) -> bool {
        match self.lookup(slot.area) {
            Ok(area) => area
                .check(slot)
                .map(|offset| area.tracker().test(offset))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Resident pages of one area
    pub fn resident_pages(&self, area: u32) -> Option<u64> {
        self.areas.read().get(&area).map(|a| a.resident())
    }

    /// Offset count of one area
    pub fn capacity(&self, area: u32) -> Option<u64> {
        self.areas.read().get(&area).map(|a| a.capacity())
    }

    /// Resident pages across all areas, one snapshot under the area lock
    pub fn current_resident_pages(&self) -> u64 {
        Self::total_resident(&self.areas.read())
    }

    pub(crate) fn total_resident(areas: &AreaList) -> u64 {
        areas.values().map(|a| a.resident()).sum()
    }

    /// Take the area-list lock; the shrinker plans under it
    pub(crate) fn area_list(&self) -> RwLockReadGuard<'_, AreaList> {
        self.areas.read()
    }

    pub fn stats(&self) -> FrontswapStats {
        self.profiler
            .stats(self.current_resident_pages(), self.is_enabled())
    }

    fn lookup(&self, area: u32) -> Result<Arc<SwapArea>> {
        self.areas
            .read()
            .get(&area)
            .cloned()
            .ok_or(FrontswapError::UnknownArea(area))
    }
}

impl Default for Frontswap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Frontswap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // One guard: a second read behind a queued writer would deadlock
        let areas = self.areas.read();
        f.debug_struct("Frontswap")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("areas", &areas.len())
            .field("resident_pages", &Self::total_resident(&areas))
            .finish()
    }
}
