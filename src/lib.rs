//! # Frontswap Cache
//!
//! A transparent staging cache for swapped-out pages.
//!
//! Sits between the swap path and a pluggable fast backend (a compressed RAM
//! pool, a hypervisor page pool, ...). Page write-outs and read-ins are
//! offered to the backend first, and a per-area presence bitmap records
//! exactly which slots the backend holds.
//!
//! ## Features
//!
//! - **Exact Bookkeeping**: presence bits and resident counts always match the backend
//! - **Hot-Swappable Backends**: registration returns the previous backend
//! - **Cooperative Reclaim**: bounded shrink towards a resident-page target
//! - **Never Authoritative**: every failure falls back to the real swap device
//!
//! ## Example
//!
//! ```rust
//! use frontswap_cache::{Frontswap, PageBuf, SegmentedBackend, SwapPage, SwapSlot};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Frontswap::with_defaults();
//! cache.register_backend(Arc::new(SegmentedBackend::new()));
//! cache.activate_area(0, 1024)?;
//!
//! // Swap out
//! let slot = SwapSlot::new(0, 42);
//! cache.put(&SwapPage::new(slot, PageBuf::filled(7)))?;
//!
//! // Swap in
//! let mut page = SwapPage::empty(slot);
//! if cache.get(&mut page).is_ok() {
//!     assert_eq!(page.data(), &PageBuf::filled(7));
//! }
//!
//! // Slot freed by the swap path
//! cache.flush_page(slot);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod profiling;
pub mod reclaim;
pub mod registry;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{FrontswapBackend, PoolBackend, SegmentedBackend};
pub use cache::{Frontswap, SwapArea};
pub use profiling::FrontswapStats;
pub use reclaim::{
    DaemonHandle, MemoryAccounting, Reclaimer, ReclaimerDaemonExt, ShrinkDaemon, ShrinkReport,
    Unlimited, UnuseCollaborator,
};
pub use registry::{BackendRef, Registry};
pub use types::{
    Config, FrontswapError, PageBuf, PutOutcome, Result, SwapPage, SwapSlot, PAGE_SIZE,
};
