//! Sub-word emulation
//!
//! RV32A can only reserve whole words. A 1 or 2 byte operand is handled as a
//! lane of its naturally aligned containing word: the word is reserved, the
//! lane is masked out of the reserved value, compared, spliced and stored
//! back conditionally. Masking happens after the reservation, never before.

use crate::operand::AtomicOperand;
use crate::platform;
use std::sync::atomic::Ordering;

/// Position of a 1 or 2 byte operand inside its containing word
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lane {
    word: *mut u32,
    shift: u32,
    mask: u32,
}

impl Lane {
    /// Lane of the operand at `ptr`
    ///
    /// The operand must be naturally aligned so it never straddles two words.
    #[inline(always)]
    pub(crate) fn of<T: AtomicOperand>(ptr: *mut T) -> Self {
        let width = T::WIDTH.bytes();
        let offset = (ptr as usize) & 3;
        debug_assert!(offset + width <= 4, "operand straddles a word boundary");

        let word = ptr.cast::<u8>().wrapping_sub(offset).cast::<u32>();

        #[cfg(target_endian = "little")]
        let shift = (offset * 8) as u32;
        #[cfg(target_endian = "big")]
        let shift = ((4 - width - offset) * 8) as u32;

        Self {
            word,
            shift,
            mask: T::WIDTH.lane_mask() << shift,
        }
    }

    #[inline(always)]
    fn insert(&self, bits: u32) -> u32 {
        (bits << self.shift) & self.mask
    }

    #[inline(always)]
    fn extract(&self, word: u32) -> u32 {
        (word & self.mask) >> self.shift
    }

    /// Compare-and-exchange the lane, returning the observed lane bits
    ///
    /// # Safety
    /// The containing word must be valid and only accessed through this crate.
    #[inline(always)]
    pub(crate) unsafe fn compare_and_exchange(&self, expected: u32, desired: u32) -> u32 {
        platform::cmpxchg_lane(
            self.word,
            self.shift,
            self.mask,
            self.insert(expected),
            self.insert(desired),
        )
    }

    /// Atomically replace the lane with `update(current)`, returning the
    /// previous lane bits
    ///
    /// # Safety
    /// The containing word must be valid and only accessed through this crate.
    #[inline(always)]
    pub(crate) unsafe fn fetch_update<F>(&self, mut update: F) -> u32
    where
        F: FnMut(u32) -> u32,
    {
        let mut current = self.load(Ordering::Relaxed);
        loop {
            let observed = self.compare_and_exchange(current, update(current));
            if observed == current {
                return current;
            }
            current = observed;
        }
    }

    /// Atomic load of the lane
    ///
    /// # Safety
    /// The containing word must be valid and only accessed through this crate.
    #[inline(always)]
    pub(crate) unsafe fn load(&self, order: Ordering) -> u32 {
        self.extract(platform::load_word(self.word, order))
    }
}
