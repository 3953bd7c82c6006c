use crate::backend::FrontswapBackend;
use crate::types::{FrontswapError, PageBuf, Result, SwapSlot, PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Frame bookkeeping, guarded by one lock
struct PoolState {
    /// Slot to frame index
    frames: HashMap<SwapSlot, usize>,

    /// Unused frame indices
    free: Vec<usize>,
}

/// Fixed-capacity RAM pool backend
///
/// Reserves `capacity` page frames in one anonymous mapping up front. Puts
/// fail once every frame is taken, which makes this the backend to use when
/// exercising the cache's failure paths.
pub struct PoolBackend {
    /// Base pointer to mmap'd region
    base_ptr: *mut u8,

    /// Number of page frames in the region
    capacity: usize,

    state: Mutex<PoolState>,

    /// Frames in use (mirrors `state.frames.len()` for lock-free reads)
    used: AtomicUsize,
}

impl PoolBackend {
    /// Create a new pool of `capacity` page frames
    ///
    /// # Safety
    /// Uses mmap to reserve the region. Physical memory is allocated
    /// on-demand via page faults when a frame is first written.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FrontswapError::OutOfMemory);
        }
        let size = capacity
            .checked_mul(PAGE_SIZE)
            .ok_or(FrontswapError::OutOfMemory)?;
        let base_ptr = Self::mmap_anonymous(size)?;

        Ok(Self {
            base_ptr,
            capacity,
            state: Mutex::new(PoolState {
                frames: HashMap::new(),
                // Pop from the back hands out frame 0 first
                free: (0..capacity).rev().collect(),
            }),
            used: AtomicUsize::new(0),
        })
    }

    /// Reserve address space using mmap
    #[cfg(unix)]
    fn mmap_anonymous(size: usize) -> Result<*mut u8> {
        use libc::{mmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};

        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            return Err(FrontswapError::OutOfMemory);
        }

        Ok(ptr as *mut u8)
    }

    #[cfg(windows)]
    fn mmap_anonymous(size: usize) -> Result<*mut u8> {
        use winapi::um::memoryapi::VirtualAlloc;
        use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE};

        let ptr = unsafe {
            VirtualAlloc(
                std::ptr::null_mut(),
                size,
                MEM_RESERVE | MEM_COMMIT,
                PAGE_READWRITE,
            )
        };

        if ptr.is_null() {
            return Err(FrontswapError::OutOfMemory);
        }

        Ok(ptr as *mut u8)
    }

    /// Pointer to the first byte of `frame`
    fn frame_ptr(&self, frame: usize) -> *mut u8 {
        debug_assert!(frame < self.capacity);
        // SAFETY: frame < capacity, so the offset stays inside the mapping
        unsafe { self.base_ptr.add(frame * PAGE_SIZE) }
    }

    /// Get the number of frames in use
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Get the total number of frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, state: &mut PoolState, slot: SwapSlot) {
        if let Some(frame) = state.frames.remove(&slot) {
            state.free.push(frame);
            self.used.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl FrontswapBackend for PoolBackend {
    fn init(&self, area: u32) {
        log::trace!("pool backend: area {} online", area);
    }

    fn put(&self, slot: SwapSlot, page: &PageBuf) -> Result<()> {
        let mut state = self.state.lock();

        // A dup reuses the frame it already holds
        let held = state.frames.get(&slot).copied();
        let frame = match held {
            Some(frame) => frame,
            None => {
                let frame = state
                    .free
                    .pop()
                    .ok_or(FrontswapError::BackendFailure(slot))?;
                state.frames.insert(slot, frame);
                self.used.fetch_add(1, Ordering::AcqRel);
                frame
            }
        };

        // SAFETY: the frame belongs to `slot` and the state lock is held,
        // so no other thread reads or writes it.
        unsafe {
            std::ptr::copy_nonoverlapping(
                page.as_bytes().as_ptr(),
                self.frame_ptr(frame),
                PAGE_SIZE,
            );
        }

        Ok(())
    }

    fn get(&self, slot: SwapSlot, page: &mut PageBuf) -> Result<()> {
        let state = self.state.lock();
        let frame = *state
            .frames
            .get(&slot)
            .ok_or(FrontswapError::BackendFailure(slot))?;

        // SAFETY: as in `put`
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.frame_ptr(frame),
                page.as_bytes_mut().as_mut_ptr(),
                PAGE_SIZE,
            );
        }

        Ok(())
    }

    fn invalidate_one(&self, slot: SwapSlot) {
        let mut state = self.state.lock();
        self.release(&mut state, slot);
    }

    fn invalidate_area(&self, area: u32) {
        let mut state = self.state.lock();
        let doomed: Vec<SwapSlot> = state
            .frames
            .keys()
            .filter(|slot| slot.area == area)
            .copied()
            .collect();
        for slot in doomed {
            self.release(&mut state, slot);
        }
    }
}

impl Drop for PoolBackend {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::munmap(self.base_ptr as *mut libc::c_void, self.capacity * PAGE_SIZE);
        }

        #[cfg(windows)]
        unsafe {
            use winapi::um::memoryapi::VirtualFree;
            use winapi::um::winnt::MEM_RELEASE;
            VirtualFree(self.base_ptr as *mut winapi::ctypes::c_void, 0, MEM_RELEASE);
        }
    }
}

// Thread safety: frames are only touched under the state lock
unsafe impl Send for PoolBackend {}
unsafe impl Sync for PoolBackend {}

impl std::fmt::Debug for PoolBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBackend")
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .field(
                "utilization",
                &format!(
                    "{:.2}%",
                    (self.used() as f64 / self.capacity as f64) * 100.0
                ),
            )
            .finish()
    }
}
