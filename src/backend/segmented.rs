use crate::backend::FrontswapBackend;
use crate::types::{FrontswapError, PageBuf, Result, SwapSlot};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Heap backend keeping one boxed page per slot
/// Unbounded, suitable for tests and as a reference implementation
pub struct SegmentedBackend {
    /// Map of slot to stored page
    pages: Mutex<HashMap<SwapSlot, PageBuf>>,

    /// Areas announced through `init`
    areas: Mutex<HashSet<u32>>,
}

impl SegmentedBackend {
    /// Create a new segmented backend
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            areas: Mutex::new(HashSet::new()),
        }
    }

    /// Number of pages currently held
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Whether `init` was called for `area`
    pub fn is_initialized(&self, area: u32) -> bool {
        self.areas.lock().contains(&area)
    }
}

impl Default for SegmentedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontswapBackend for SegmentedBackend {
    fn init(&self, area: u32) {
        self.areas.lock().insert(area);
    }

    fn put(&self, slot: SwapSlot, page: &PageBuf) -> Result<()> {
        if !self.is_initialized(slot.area) {
            // Never keep a stale copy behind a failed put.
            self.pages.lock().remove(&slot);
            return Err(FrontswapError::BackendFailure(slot));
        }

        self.pages.lock().insert(slot, page.clone());
        Ok(())
    }

    fn get(&self, slot: SwapSlot, page: &mut PageBuf) -> Result<()> {
        let pages = self.pages.lock();
        let stored = pages
            .get(&slot)
            .ok_or(FrontswapError::BackendFailure(slot))?;
        page.as_bytes_mut().copy_from_slice(stored.as_bytes());
        Ok(())
    }

    fn invalidate_one(&self, slot: SwapSlot) {
        self.pages.lock().remove(&slot);
    }

    fn invalidate_area(&self, area: u32) {
        self.pages.lock().retain(|slot, _| slot.area != area);
    }
}

impl std::fmt::Debug for SegmentedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedBackend")
            .field("page_count", &self.page_count())
            .field("areas", &self.areas.lock().len())
            .finish()
    }
}
