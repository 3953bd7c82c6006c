use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{FrontswapError, Result};

const WORD_BITS: u64 = u64::BITS as u64;

/// Fixed-length bitset with per-word atomic updates
///
/// Concurrent `set`/`clear` on different bits of the same word are safe;
/// each call reports whether it actually flipped the bit so callers can
/// keep a running count without re-scanning.
pub(crate) struct AtomicBitmap {
    words: Box<[AtomicU64]>,
    len: u64,
}

impl AtomicBitmap {
    /// All-clear bitmap of `len` bits, or `OutOfMemory` if the words cannot
    /// be addressed or allocated
    pub fn new(len: u64) -> Result<Self> {
        let word_count = usize::try_from(len.div_ceil(WORD_BITS))
            .map_err(|_| FrontswapError::OutOfMemory)?;

        let mut words = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| FrontswapError::OutOfMemory)?;
        words.extend((0..word_count).map(|_| AtomicU64::new(0)));

        Ok(Self {
            words: words.into_boxed_slice(),
            len,
        })
    }

    #[inline]
    fn locate(bit: u64) -> (usize, u64) {
        ((bit / WORD_BITS) as usize, 1u64 << (bit % WORD_BITS))
    }

    /// Number of addressable bits
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn test(&self, bit: u64) -> bool {
        debug_assert!(bit < self.len);
        let (word, mask) = Self::locate(bit);
        self.words[word].load(Ordering::Acquire) & mask != 0
    }

    /// Set `bit`, returning true if it was previously clear
    pub fn set(&self, bit: u64) -> bool {
        debug_assert!(bit < self.len);
        let (word, mask) = Self::locate(bit);
        self.words[word].fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    /// Clear `bit`, returning true if it was previously set
    pub fn clear(&self, bit: u64) -> bool {
        debug_assert!(bit < self.len);
        let (word, mask) = Self::locate(bit);
        self.words[word].fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }

    /// Clear every bit, returning how many were set
    ///
    /// Each word is swapped out whole, so a bit set concurrently is either
    /// counted here or survives the call.
    pub fn clear_all(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.swap(0, Ordering::AcqRel).count_ones() as u64)
            .sum()
    }

    /// Population count across all words
    pub fn count_ones(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as u64)
            .sum()
    }
}
