//! Allocator Module - Allocation Fast Path Pools
//!
//! The barrier set's allocation hook bumps a pointer in one of two pools and
//! hands control to a caller-supplied slow path when neither has room.
//!
//! ## Pools
//!
//! - **Thread-local (TLAB)**: plain bump pointer, owned by one thread
//! - **Shared (eden)**: 4-byte frontier moved only by compare-and-exchange
//!
//! ## Fast Path States
//!
//! ```text
//! TryThreadLocal --overflow--> TrySharedCas --lost race--> TrySharedCas
//!        |                          |
//!        v                          +--exhausted / retries spent--> SlowPath
//!     Claimed <---------------------+
//! ```
//!
//! `SlowPath` is terminal: the fast path never refills a TLAB or collects.

pub mod shared;
pub mod tlab;

pub use shared::{ClaimOutcome, SharedPool};
pub use tlab::ThreadLocalPool;

use crate::heap::HeapRef;
use crate::util::Alignment;

/// Size of an allocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocSize {
    /// Known when the allocation site is generated; already aligned
    Constant(usize),
    /// Only known at run time, rounded up to the object alignment
    Variable(usize),
}

impl AllocSize {
    /// Request size in bytes, aligned
    ///
    /// None when a variable size overflows on alignment.
    #[inline]
    pub fn aligned(self, alignment: usize) -> Option<usize> {
        match self {
            AllocSize::Constant(size) => {
                debug_assert!(
                    Alignment::is_aligned(size, alignment),
                    "constant allocation size {} not aligned to {}",
                    size,
                    alignment
                );
                Some(size)
            },
            AllocSize::Variable(size) => Alignment::checked_align_up(size, alignment),
        }
    }
}

/// Allocation fast path state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocState {
    TryThreadLocal,
    TrySharedCas,
    SlowPath,
}

/// What the slow path is told about the failed fast path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRequest {
    /// Aligned request size; `usize::MAX` if alignment overflowed
    pub size: usize,
    /// TLAB room at the time of the overflow
    pub tlab_remaining: usize,
    /// Shared pool CAS attempts made
    pub shared_attempts: u32,
}

/// Result of the allocation fast path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation<R> {
    /// Fresh object, and the state that produced it
    Claimed { obj: HeapRef, state: AllocState },
    /// Whatever the slow path returned
    SlowPath(R),
}

impl<R> Allocation<R> {
    /// The claimed object, if the fast path succeeded
    pub fn claimed(&self) -> Option<HeapRef> {
        match self {
            Allocation::Claimed { obj, .. } => Some(*obj),
            Allocation::SlowPath(_) => None,
        }
    }

    pub fn is_slow_path(&self) -> bool {
        matches!(self, Allocation::SlowPath(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_size_passes_through() {
        assert_eq!(AllocSize::Constant(24).aligned(8), Some(24));
    }

    #[test]
    fn test_variable_size_rounds_up() {
        assert_eq!(AllocSize::Variable(20).aligned(8), Some(24));
        assert_eq!(AllocSize::Variable(0).aligned(8), Some(0));
        assert_eq!(AllocSize::Variable(usize::MAX - 2).aligned(8), None);
    }

    #[test]
    fn test_allocation_accessors() {
        let claimed: Allocation<()> = Allocation::Claimed {
            obj: HeapRef::from_raw(16),
            state: AllocState::TryThreadLocal,
        };
        assert_eq!(claimed.claimed(), Some(HeapRef::from_raw(16)));
        assert!(!claimed.is_slow_path());

        let slow = Allocation::SlowPath(7);
        assert_eq!(slow.claimed(), None);
        assert!(slow.is_slow_path());
    }
}
