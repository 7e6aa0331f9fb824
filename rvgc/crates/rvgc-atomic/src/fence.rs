//! Fence Primitives
//!
//! Thin wrappers over the CPU fence instruction. On RV32 each fence is a
//! single `fence` instruction with the matching predecessor/successor sets;
//! elsewhere the `std::sync::atomic::fence` intrinsic is used.
//!
//! * [`full_fence`] -- `fence rw, rw`
//! * [`acquire_fence`] -- `fence r, rw`
//! * [`release_fence`] -- `fence rw, w`
//!
//! Fences touch no registers and no memory; issuing one changes ordering
//! only.

#[cfg(not(target_arch = "riscv32"))]
use std::sync::atomic::{fence, Ordering};

/// Store+load fence visible to all threads
#[inline(always)]
pub fn full_fence() {
    #[cfg(target_arch = "riscv32")]
    {
        // SAFETY: `fence rw, rw` orders all prior accesses before all later ones
        // and has no other effect.
        unsafe {
            core::arch::asm!("fence rw, rw", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_arch = "riscv32"))]
    {
        fence(Ordering::SeqCst);
    }
}

/// Later loads/stores cannot be observed before earlier loads complete
#[inline(always)]
pub fn acquire_fence() {
    #[cfg(target_arch = "riscv32")]
    {
        // SAFETY: `fence r, rw` orders prior loads before later accesses.
        unsafe {
            core::arch::asm!("fence r, rw", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_arch = "riscv32"))]
    {
        fence(Ordering::Acquire);
    }
}

/// Earlier loads/stores cannot be observed after a later store
#[inline(always)]
pub fn release_fence() {
    #[cfg(target_arch = "riscv32")]
    {
        // SAFETY: `fence rw, w` orders prior accesses before later stores.
        unsafe {
            core::arch::asm!("fence rw, w", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_arch = "riscv32"))]
    {
        fence(Ordering::Release);
    }
}

/// Load-load ordering
#[inline(always)]
pub fn loadload() {
    acquire_fence();
}

/// Store-store ordering
#[inline(always)]
pub fn storestore() {
    release_fence();
}

/// Load-store ordering
#[inline(always)]
pub fn loadstore() {
    acquire_fence();
}

/// Store-load ordering, the only pair that needs a full fence
#[inline(always)]
pub fn storeload() {
    full_fence();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fences_do_not_change_values() {
        let cell = AtomicU32::new(7);
        release_fence();
        acquire_fence();
        assert_eq!(cell.load(Ordering::Relaxed), 7);

        full_fence();
        loadload();
        storestore();
        loadstore();
        storeload();
        cell.store(9, Ordering::Relaxed);
        assert_eq!(cell.load(Ordering::Relaxed), 9);
    }
}
