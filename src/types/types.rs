use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Size in bytes of one staged page.
pub const PAGE_SIZE: usize = 4096;

/// Cache key: one offset inside one swap area.
///
/// Never materialized as an object by the cache itself, it is only the
/// addressing scheme every operation is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwapSlot {
    /// Swap area (backing store) identifier
    pub(crate) area: u32,

    /// Page offset inside the area
    pub(crate) offset: u64,
}

impl SwapSlot {
    pub fn new(area: u32, offset: u64) -> Self {
        Self { area, offset }
    }

    /// Get the swap area identifier
    pub fn area(&self) -> u32 {
        self.area
    }

    /// Get the page offset inside the area
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl fmt::Display for SwapSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#x}", self.area, self.offset)
    }
}

/// Fixed-size page contents, heap allocated so pages can be moved cheaply.
#[derive(Clone, PartialEq, Eq)]
pub struct PageBuf(Box<[u8; PAGE_SIZE]>);

impl PageBuf {
    /// A zero-filled page
    pub fn zeroed() -> Self {
        Self(Box::new([0u8; PAGE_SIZE]))
    }

    /// A page with every byte set to `byte`
    pub fn filled(byte: u8) -> Self {
        Self(Box::new([byte; PAGE_SIZE]))
    }

    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.0
    }
}

impl Default for PageBuf {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for PageBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Dumping 4KB is useless in logs, show a short prefix.
        f.debug_struct("PageBuf")
            .field("head", &&self.0[..8])
            .finish()
    }
}

/// A locked page on its way to or from swap.
///
/// The paging subsystem guarantees exclusive access to a slot for the
/// duration of a put, get or flush on it; holding `&mut SwapPage` or an
/// exclusive borrow of the slot is how callers express that here.
#[derive(Debug, Clone)]
pub struct SwapPage {
    pub(crate) slot: SwapSlot,
    pub(crate) data: PageBuf,
}

impl SwapPage {
    pub fn new(slot: SwapSlot, data: PageBuf) -> Self {
        Self { slot, data }
    }

    /// An empty page addressed at `slot`, ready to be filled by a get
    pub fn empty(slot: SwapSlot) -> Self {
        Self::new(slot, PageBuf::zeroed())
    }

    pub fn slot(&self) -> SwapSlot {
        self.slot
    }

    pub fn data(&self) -> &PageBuf {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut PageBuf {
        &mut self.data
    }
}

/// Result of a successful put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The backend holds the only copy, the device write can be skipped
    Stored,

    /// The backend holds a copy but the page must still go to the device
    WriteThrough,
}

/// Configuration for the cache and its reclaim path
#[derive(Debug, Clone)]
pub struct Config {
    /// Report every successful put as write-through (default: false)
    pub writethrough: bool,

    /// A successful get transfers ownership back to the caller and drops
    /// the backend copy (default: false)
    pub exclusive_gets: bool,

    /// Upper bound on shrink passes (default: 3)
    pub shrink_passes: usize,

    /// How often the shrink daemon re-applies the target (default: 1s)
    pub daemon_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            writethrough: false,
            exclusive_gets: false,
            shrink_passes: 3,
            daemon_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Gets hand pages back and free their backend copy
    pub fn exclusive() -> Self {
        Self {
            exclusive_gets: true,
            ..Self::default()
        }
    }

    /// Backend copies are kept but every page is also written to the device
    pub fn writethrough() -> Self {
        Self {
            writethrough: true,
            ..Self::default()
        }
    }
}

/// Errors surfaced by the cache
///
/// None of these are fatal: for `put` and `get` every error means "fall back
/// to the real swap device".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontswapError {
    #[error("slot {0} is not resident")]
    Miss(SwapSlot),

    #[error("backend failed on slot {0}")]
    BackendFailure(SwapSlot),

    #[error("no backend registered")]
    NoBackend,

    #[error("swap area {0} is not active")]
    UnknownArea(u32),

    #[error("offset {offset} out of range for area {area} (capacity: {capacity})")]
    OffsetOutOfRange {
        area: u32,
        offset: u64,
        capacity: u64,
    },

    #[error("swap area {0} is already active")]
    AreaActive(u32),

    #[error("Out of memory (failed to reserve page pool)")]
    OutOfMemory,
}

pub type Result<T> = std::result::Result<T, FrontswapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_display() {
        assert_eq!(SwapSlot::new(1, 255).to_string(), "1:0xff");
    }

    #[test]
    fn test_config_presets() {
        let config = Config::exclusive();
        assert!(config.exclusive_gets);
        assert!(!config.writethrough);
        assert_eq!(config.shrink_passes, 3);

        assert!(Config::writethrough().writethrough);
    }
}
