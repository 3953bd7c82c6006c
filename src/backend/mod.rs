use crate::types::{PageBuf, Result, SwapSlot};

#[cfg(test)]
use mockall::automock;

/// Contract every frontswap backend implements.
///
/// Backends are shared across threads and called concurrently for distinct
/// slots. The cache owns all presence bookkeeping: nothing here may assume
/// a call updates it.
#[cfg_attr(test, automock)]
pub trait FrontswapBackend: Send + Sync {
    /// A swap area became active. Must be idempotent per area.
    fn init(&self, area: u32);

    /// Store a copy of `page` under `slot`.
    ///
    /// On error the backend must retain nothing for `slot`, including any
    /// copy from an earlier put.
    fn put(&self, slot: SwapSlot, page: &PageBuf) -> Result<()>;

    /// Fill `page` with the contents last stored under `slot`.
    ///
    /// Only called for slots with a successful put outstanding.
    fn get(&self, slot: SwapSlot, page: &mut PageBuf) -> Result<()>;

    /// Drop any data for `slot`. No-op for slots never stored.
    fn invalidate_one(&self, slot: SwapSlot);

    /// Drop every slot of `area`. Safe on empty or uninitialized areas.
    fn invalidate_area(&self, area: u32);
}

pub mod pool;
pub mod segmented;

pub use pool::PoolBackend;
pub use segmented::SegmentedBackend;
