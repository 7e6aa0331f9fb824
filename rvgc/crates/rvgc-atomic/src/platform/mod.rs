//! Platform Primitives
//!
//! The word-sized building blocks every public operation is made of:
//!
//! - `cmpxchg_word`: strong 4-byte compare-and-exchange with acquire on the
//!   load and release on the store, no surrounding fences
//! - `cmpxchg_lane`: the same loop over the containing word of a 1 or 2 byte
//!   lane; the lane is masked out of the reserved word, so neighbouring
//!   lanes are preserved and any write to them fails the conditional store
//! - `fetch_add_word` / `swap_word` / `load_word` / `store_word`: the
//!   compiler intrinsics for naturally sized words
//!
//! On `riscv32` the two compare-and-exchange loops are LR/SC inline assembly.
//! Everywhere else the word loop delegates to the native strong
//! `compare_exchange` and the lane loop runs on an emulated reservation.
//!
//! Both LR/SC loops can in theory livelock under pathological contention.
//! That risk is accepted; the loops are not bounded.

#[cfg(target_arch = "riscv32")]
mod riscv32;
#[cfg(target_arch = "riscv32")]
pub(crate) use riscv32::{cmpxchg_lane, cmpxchg_word};

#[cfg(not(target_arch = "riscv32"))]
mod generic;
#[cfg(not(target_arch = "riscv32"))]
pub(crate) use generic::{cmpxchg_lane, cmpxchg_word};

use std::sync::atomic::{AtomicU32, Ordering};

/// Word at `dest` as an atomic cell
///
/// # Safety
/// `dest` must be valid, 4-byte aligned, and only accessed atomically for
/// the returned lifetime.
#[inline(always)]
pub(crate) unsafe fn word<'a>(dest: *mut u32) -> &'a AtomicU32 {
    AtomicU32::from_ptr(dest)
}

/// Add to a word, returning the previous value
#[inline(always)]
pub(crate) unsafe fn fetch_add_word(dest: *mut u32, delta: u32, order: Ordering) -> u32 {
    word(dest).fetch_add(delta, order)
}

/// Swap a word, returning the previous value
#[inline(always)]
pub(crate) unsafe fn swap_word(dest: *mut u32, value: u32, order: Ordering) -> u32 {
    word(dest).swap(value, order)
}

/// Atomic word load
#[inline(always)]
pub(crate) unsafe fn load_word(src: *mut u32, order: Ordering) -> u32 {
    word(src).load(order)
}

/// Atomic word store
#[inline(always)]
pub(crate) unsafe fn store_word(dest: *mut u32, value: u32, order: Ordering) {
    word(dest).store(value, order)
}
