use super::bitmap::AtomicBitmap;
use crate::types::Result;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which offsets of one swap area are resident in the backend
///
/// The resident count moves with every bit that actually flips, so it equals
/// the bitmap's population count whenever no operation is in flight.
/// Callers serialize operations on the same offset; distinct offsets may be
/// updated concurrently.
pub struct PresenceTracker {
    present: AtomicBitmap,
    resident: AtomicU64,
}

impl PresenceTracker {
    /// Tracker for offsets `0..capacity`, all absent
    pub fn new(capacity: u64) -> Result<Self> {
        Ok(Self {
            present: AtomicBitmap::new(capacity)?,
            resident: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.present.len()
    }

    pub fn test(&self, offset: u64) -> bool {
        self.present.test(offset)
    }

    /// Mark `offset` resident. Idempotent: setting a set bit leaves the
    /// count unchanged.
    pub fn set(&self, offset: u64) -> bool {
        let flipped = self.present.set(offset);
        if flipped {
            self.resident.fetch_add(1, Ordering::AcqRel);
        }
        flipped
    }

    /// Mark `offset` absent. Idempotent.
    pub fn clear(&self, offset: u64) -> bool {
        let flipped = self.present.clear(offset);
        if flipped {
            self.resident.fetch_sub(1, Ordering::AcqRel);
        }
        flipped
    }

    /// Clear every offset
    ///
    /// The count drops by exactly the bits cleared, so a `set` racing the
    /// reset on another offset stays counted.
    pub fn reset(&self) {
        let cleared = self.present.clear_all();
        self.resident.fetch_sub(cleared, Ordering::AcqRel);
    }

    pub fn resident(&self) -> u64 {
        self.resident.load(Ordering::Acquire)
    }

    /// Re-derive the count from the bitmap; only meaningful at quiescence
    pub fn popcount(&self) -> u64 {
        self.present.count_ones()
    }
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("capacity", &self.capacity())
            .field("resident", &self.resident())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_count_follows_bits() {
        let tracker = PresenceTracker::new(64).unwrap();

        tracker.set(3);
        tracker.set(3);
        tracker.set(10);
        assert_eq!(tracker.resident(), 2);

        tracker.clear(3);
        tracker.clear(3);
        tracker.clear(40);
        assert_eq!(tracker.resident(), 1);
        assert_eq!(tracker.popcount(), 1);

        tracker.reset();
        assert_eq!(tracker.resident(), 0);
        assert!(!tracker.test(10));
    }

    #[test]
    fn test_concurrent_distinct_offsets() {
        let tracker = Arc::new(PresenceTracker::new(4096).unwrap());

        let workers: Vec<_> = (0..8u64)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    // Interleaved offsets so threads share words
                    for offset in (t..4096).step_by(8) {
                        tracker.set(offset);
                    }
                    for offset in (t..4096).step_by(16) {
                        tracker.clear(offset);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(tracker.resident(), 2048);
        assert_eq!(tracker.resident(), tracker.popcount());
    }

    #[test]
    fn test_reset_racing_sets_keeps_count() {
        for _ in 0..50 {
            let tracker = Arc::new(PresenceTracker::new(1024).unwrap());

            let setters: Vec<_> = (0..4u64)
                .map(|t| {
                    let tracker = Arc::clone(&tracker);
                    thread::spawn(move || {
                        for offset in (t..1024).step_by(4) {
                            tracker.set(offset);
                        }
                    })
                })
                .collect();

            let resetter = {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..64 {
                        tracker.reset();
                        thread::yield_now();
                    }
                })
            };

            for setter in setters {
                setter.join().unwrap();
            }
            resetter.join().unwrap();

            assert_eq!(tracker.resident(), tracker.popcount());

            // Clearing every survivor brings the count to exactly zero
            for offset in 0..1024 {
                tracker.clear(offset);
            }
            assert_eq!(tracker.resident(), 0);
        }
    }
}
