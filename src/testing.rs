//! Shared test doubles.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{FrontswapBackend, SegmentedBackend};
use crate::cache::Frontswap;
use crate::reclaim::UnuseCollaborator;
use crate::types::{FrontswapError, PageBuf, Result, SwapSlot};

/// Backend that counts every call and can be told to fail
#[derive(Default)]
pub struct CountingBackend {
    inner: SegmentedBackend,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,

    pub inits: AtomicUsize,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub invalidate_ones: AtomicUsize,
    pub invalidate_areas: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn held(&self) -> usize {
        self.inner.page_count()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl FrontswapBackend for CountingBackend {
    fn init(&self, area: u32) {
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.inner.init(area);
    }

    fn put(&self, slot: SwapSlot, page: &PageBuf) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            self.inner.invalidate_one(slot);
            return Err(FrontswapError::BackendFailure(slot));
        }
        self.inner.put(slot, page)
    }

    fn get(&self, slot: SwapSlot, page: &mut PageBuf) -> Result<()> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(FrontswapError::BackendFailure(slot));
        }
        self.inner.get(slot, page)
    }

    fn invalidate_one(&self, slot: SwapSlot) {
        self.invalidate_ones.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_one(slot);
    }

    fn invalidate_area(&self, area: u32) {
        self.invalidate_areas.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_area(area);
    }
}

/// Unuse stand-in that flushes resident pages straight out of the cache,
/// up to a per-call cap on top of the budget
pub struct FlushingUnuse {
    cache: Arc<Frontswap>,
    cap: Option<u64>,
    pub calls: Mutex<Vec<(u32, u64)>>,
}

impl FlushingUnuse {
    pub fn new(cache: Arc<Frontswap>) -> Self {
        Self {
            cache,
            cap: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Retire at most `cap` pages per call, whatever the budget
    pub fn capped(cache: Arc<Frontswap>, cap: u64) -> Self {
        Self {
            cap: Some(cap),
            ..Self::new(cache)
        }
    }
}

impl UnuseCollaborator for FlushingUnuse {
    fn try_retire(&self, area: u32, budget: u64, _allow_blocking: bool) -> u64 {
        self.calls.lock().push((area, budget));

        let limit = self.cap.map_or(budget, |cap| cap.min(budget));
        let capacity = self.cache.capacity(area).unwrap_or(0);
        let mut retired = 0;
        for offset in 0..capacity {
            if retired == limit {
                break;
            }
            if self.cache.flush_page(SwapSlot::new(area, offset)) {
                retired += 1;
            }
        }
        retired
    }
}

/// Fill `count` offsets of `area`, starting at 0, with distinct bytes
pub fn fill(cache: &Frontswap, area: u32, count: u64) -> HashMap<SwapSlot, PageBuf> {
    let mut written = HashMap::new();
    for offset in 0..count {
        let slot = SwapSlot::new(area, offset);
        let data = PageBuf::filled((offset % 251) as u8);
        cache
            .put(&crate::types::SwapPage::new(slot, data.clone()))
            .unwrap();
        written.insert(slot, data);
    }
    written
}
