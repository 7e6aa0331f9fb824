//! Host back-end
//!
//! The word loop delegates to the native strong compare-and-exchange.
//! The lane loop keeps the LR/SC shape: a reservation is an acquire load of
//! the whole word, and the conditional store is a weak compare-and-exchange
//! against the reserved value, which may fail spuriously just like `sc.w`.

use super::word;
use std::sync::atomic::{AtomicU32, Ordering};

/// Emulated load-reserved word
struct Reservation<'a> {
    cell: &'a AtomicU32,
    value: u32,
}

impl<'a> Reservation<'a> {
    #[inline(always)]
    fn load(cell: &'a AtomicU32) -> Self {
        let value = cell.load(Ordering::Acquire);
        Self { cell, value }
    }

    /// Store `new` if nothing wrote the word since the reservation
    #[inline(always)]
    fn store_conditional(self, new: u32) -> bool {
        self.cell
            .compare_exchange_weak(self.value, new, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }
}

/// Strong 4-byte compare-and-exchange, returns the observed value
///
/// # Safety
/// `dest` must be valid and 4-byte aligned.
#[inline(always)]
pub(crate) unsafe fn cmpxchg_word(dest: *mut u32, expected: u32, desired: u32) -> u32 {
    match word(dest).compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire) {
        Ok(previous) => previous,
        Err(observed) => observed,
    }
}

/// Strong compare-and-exchange of a lane inside a reserved word
///
/// `mask`, `expected` and `desired` are already shifted into lane position.
///
/// # Safety
/// `word` must be valid and 4-byte aligned.
#[inline(always)]
pub(crate) unsafe fn cmpxchg_lane(
    word_ptr: *mut u32,
    shift: u32,
    mask: u32,
    expected: u32,
    desired: u32,
) -> u32 {
    let cell = word(word_ptr);
    loop {
        let reserved = Reservation::load(cell);
        let lane = reserved.value & mask;
        if lane != expected {
            return lane >> shift;
        }

        let spliced = (reserved.value & !mask) | desired;
        if reserved.store_conditional(spliced) {
            return lane >> shift;
        }
    }
}
