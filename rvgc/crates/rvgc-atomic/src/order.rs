//! Memory Ordering Modes
//!
//! Every read-modify-write in this crate takes an [`AtomicOrder`].
//! The order decides which fences surround the primitive:
//!
//! | Order     | Before        | After         |
//! |-----------|---------------|---------------|
//! | `Relaxed` | -             | -             |
//! | `Acquire` | -             | acquire fence |
//! | `Release` | release fence | -             |
//! | `AcqRel`  | release fence | acquire fence |
//! | `SeqCst`  | full fence    | full fence    |
//!
//! Width-4 compare-and-exchange is stricter: any order other than
//! `Relaxed` gets a full fence on both sides of the LR/SC loop.

use crate::fence;
use std::sync::atomic::Ordering;

/// Memory ordering requested by a caller of the atomic layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtomicOrder {
    /// Atomicity only, no ordering with other locations
    Relaxed,
    /// Later accesses cannot be observed before the operation
    Acquire,
    /// Earlier accesses cannot be observed after the operation
    Release,
    /// Both acquire and release
    AcqRel,
    /// Totally ordered with every other `SeqCst` operation
    #[default]
    SeqCst,
}

/// Fence emitted around an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    None,
    Acquire,
    Release,
    Full,
}

impl FenceKind {
    /// Issue this fence
    #[inline(always)]
    pub fn emit(self) {
        match self {
            FenceKind::None => {}
            FenceKind::Acquire => fence::acquire_fence(),
            FenceKind::Release => fence::release_fence(),
            FenceKind::Full => fence::full_fence(),
        }
    }
}

impl AtomicOrder {
    /// Fence issued before the primitive
    #[inline(always)]
    pub const fn leading_fence(self) -> FenceKind {
        match self {
            AtomicOrder::Relaxed | AtomicOrder::Acquire => FenceKind::None,
            AtomicOrder::Release | AtomicOrder::AcqRel => FenceKind::Release,
            AtomicOrder::SeqCst => FenceKind::Full,
        }
    }

    /// Fence issued after the primitive
    #[inline(always)]
    pub const fn trailing_fence(self) -> FenceKind {
        match self {
            AtomicOrder::Relaxed | AtomicOrder::Release => FenceKind::None,
            AtomicOrder::Acquire | AtomicOrder::AcqRel => FenceKind::Acquire,
            AtomicOrder::SeqCst => FenceKind::Full,
        }
    }

    /// Fence issued on both sides of the width-4 LR/SC compare-and-exchange
    #[inline(always)]
    pub const fn cmpxchg_fence(self) -> FenceKind {
        match self {
            AtomicOrder::Relaxed => FenceKind::None,
            _ => FenceKind::Full,
        }
    }

    /// True if no fence is ever emitted for this order
    #[inline]
    pub const fn is_relaxed(self) -> bool {
        matches!(self, AtomicOrder::Relaxed)
    }

    /// Ordering to use for a plain atomic load
    ///
    /// Release has no meaning for a load and degrades to `Relaxed`.
    pub const fn load_ordering(self) -> Ordering {
        match self {
            AtomicOrder::Relaxed | AtomicOrder::Release => Ordering::Relaxed,
            AtomicOrder::Acquire | AtomicOrder::AcqRel => Ordering::Acquire,
            AtomicOrder::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering to use for a plain atomic store
    ///
    /// Acquire has no meaning for a store and degrades to `Relaxed`.
    pub const fn store_ordering(self) -> Ordering {
        match self {
            AtomicOrder::Relaxed | AtomicOrder::Acquire => Ordering::Relaxed,
            AtomicOrder::Release | AtomicOrder::AcqRel => Ordering::Release,
            AtomicOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

impl From<AtomicOrder> for Ordering {
    fn from(order: AtomicOrder) -> Self {
        match order {
            AtomicOrder::Relaxed => Ordering::Relaxed,
            AtomicOrder::Acquire => Ordering::Acquire,
            AtomicOrder::Release => Ordering::Release,
            AtomicOrder::AcqRel => Ordering::AcqRel,
            AtomicOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AtomicOrder; 5] = [
        AtomicOrder::Relaxed,
        AtomicOrder::Acquire,
        AtomicOrder::Release,
        AtomicOrder::AcqRel,
        AtomicOrder::SeqCst,
    ];

    #[test]
    fn test_relaxed_never_fences() {
        let order = AtomicOrder::Relaxed;
        assert_eq!(order.leading_fence(), FenceKind::None);
        assert_eq!(order.trailing_fence(), FenceKind::None);
        assert_eq!(order.cmpxchg_fence(), FenceKind::None);
    }

    #[test]
    fn test_non_relaxed_orders_fence_at_least_once() {
        for order in ALL.iter().copied().filter(|o| !o.is_relaxed()) {
            let fenced = order.leading_fence() != FenceKind::None
                || order.trailing_fence() != FenceKind::None;
            assert!(fenced, "{:?} must emit a fence", order);
            assert_eq!(order.cmpxchg_fence(), FenceKind::Full);
        }
    }

    #[test]
    fn test_seq_cst_is_fully_fenced() {
        assert_eq!(AtomicOrder::SeqCst.leading_fence(), FenceKind::Full);
        assert_eq!(AtomicOrder::SeqCst.trailing_fence(), FenceKind::Full);
    }

    #[test]
    fn test_load_store_orderings_are_valid() {
        for order in ALL {
            assert_ne!(order.load_ordering(), Ordering::Release);
            assert_ne!(order.load_ordering(), Ordering::AcqRel);
            assert_ne!(order.store_ordering(), Ordering::Acquire);
            assert_ne!(order.store_ordering(), Ordering::AcqRel);
        }
    }
}
