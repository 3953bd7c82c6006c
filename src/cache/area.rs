use crate::tracker::PresenceTracker;
use crate::types::{FrontswapError, Result, SwapSlot};

/// One active swap area and its presence bookkeeping
pub struct SwapArea {
    id: u32,
    tracker: PresenceTracker,
}

impl SwapArea {
    pub(crate) fn new(id: u32, capacity: u64) -> Result<Self> {
        Ok(Self {
            id,
            tracker: PresenceTracker::new(capacity)?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of page offsets in the area
    pub fn capacity(&self) -> u64 {
        self.tracker.capacity()
    }

    /// Pages currently held by the backend for this area
    pub fn resident(&self) -> u64 {
        self.tracker.resident()
    }

    pub(crate) fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Reject offsets past the end of the area
    pub(crate) fn check(&self, slot: SwapSlot) -> Result<u64> {
        if slot.offset < self.capacity() {
            Ok(slot.offset)
        } else {
            Err(FrontswapError::OffsetOutOfRange {
                area: self.id,
                offset: slot.offset,
                capacity: self.capacity(),
            })
        }
    }
}

impl std::fmt::Debug for SwapArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapArea")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("resident", &self.resident())
            .finish()
    }
}
