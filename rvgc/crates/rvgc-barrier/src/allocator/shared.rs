//! Shared Pool - Bump Pointer Allocation Across Threads
//!
//! The pool frontier is a 4-byte arena offset. It only ever moves through
//! the width-4 `compare_and_exchange` of `rvgc-atomic`, so a claim is one
//! successful CAS and two claims can never overlap.

use crate::error::{BarrierError, Result};
use crate::heap::Heap;
use crossbeam::utils::Backoff;
use rvgc_atomic::{atomic_load, atomic_store, compare_and_exchange, AtomicOrder};
use std::sync::atomic::AtomicU32;

/// Result of one bounded claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// `[offset, offset + size)` now belongs to the caller
    Claimed { offset: usize, attempts: u32 },
    /// Not enough room left
    Exhausted { available: usize, attempts: u32 },
    /// Every attempt lost a race
    Contended { attempts: u32 },
}

/// SharedPool - CAS bump pointer over a range of the heap arena
pub struct SharedPool {
    /// Frontier offset; accessed only through `rvgc-atomic`
    top: AtomicU32,
    start: u32,
    end: u32,
    alignment: usize,
}

impl SharedPool {
    /// Pool over arena offsets `[start, end)`
    ///
    /// # Validation
    /// - `start` must be non-zero, aligned, and less than `end`
    /// - `end` must not exceed the arena
    pub fn new(heap: &Heap, start: usize, end: usize) -> Result<Self> {
        let alignment = heap.alignment();

        if start == 0 || start >= end {
            return Err(BarrierError::InvalidArgument(format!(
                "shared pool range [{:#x}, {:#x}) is empty or starts at null",
                start, end
            )));
        }

        if end > heap.size() {
            return Err(BarrierError::InvalidArgument(format!(
                "shared pool end {:#x} past arena end {:#x}",
                end,
                heap.size()
            )));
        }

        if start % alignment != 0 {
            return Err(BarrierError::AlignmentError {
                address: start,
                alignment,
            });
        }

        Ok(Self {
            top: AtomicU32::new(start as u32),
            start: start as u32,
            end: (end & !(alignment - 1)) as u32,
            alignment,
        })
    }

    /// Pool over the whole arena, or its first `size` bytes
    pub fn for_heap(heap: &Heap, size: Option<usize>) -> Result<Self> {
        let end = size.unwrap_or(heap.size()).min(heap.size());
        Self::new(heap, heap.first_allocatable(), end)
    }

    #[inline]
    fn top_ptr(&self) -> *mut u32 {
        self.top.as_ptr()
    }

    /// Current frontier offset
    #[inline]
    pub fn top(&self) -> usize {
        unsafe { atomic_load(self.top_ptr(), AtomicOrder::Acquire) as usize }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start as usize
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end as usize
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn capacity(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn remaining(&self) -> usize {
        self.end().saturating_sub(self.top())
    }

    pub fn used(&self) -> usize {
        self.top() - self.start()
    }

    /// Claim `size` bytes, retrying lost races up to `max_attempts` times
    ///
    /// `size` must be a multiple of the pool alignment.
    pub fn try_claim(&self, size: usize, max_attempts: u32) -> ClaimOutcome {
        debug_assert!(size % self.alignment == 0, "unaligned claim of {} bytes", size);

        let backoff = Backoff::new();
        let mut top = unsafe { atomic_load(self.top_ptr(), AtomicOrder::Relaxed) };
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;

            let available = self.end.saturating_sub(top) as usize;
            if size > available {
                return ClaimOutcome::Exhausted {
                    available,
                    attempts,
                };
            }

            let new_top = top + size as u32;
            let observed =
                unsafe { compare_and_exchange(top, new_top, self.top_ptr(), AtomicOrder::AcqRel) };
            if observed == top {
                return ClaimOutcome::Claimed {
                    offset: top as usize,
                    attempts,
                };
            }

            top = observed;
            backoff.spin();
        }

        ClaimOutcome::Contended { attempts }
    }

    /// Claim `size` bytes for a slow-path caller, retrying until the pool
    /// has room or runs out
    pub fn claim(&self, size: usize) -> Result<usize> {
        loop {
            match self.try_claim(size, u32::MAX) {
                ClaimOutcome::Claimed { offset, .. } => return Ok(offset),
                ClaimOutcome::Exhausted { available, .. } => {
                    return Err(BarrierError::OutOfMemory {
                        requested: size,
                        available,
                    })
                },
                ClaimOutcome::Contended { .. } => continue,
            }
        }
    }

    /// Move the frontier back to the start
    ///
    /// Only valid while no mutator can allocate, e.g. after a collection.
    pub fn reset(&self) {
        unsafe { atomic_store(self.start, self.top_ptr(), AtomicOrder::SeqCst) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap() -> Heap {
        Heap::new(64 * 1024, 8).unwrap()
    }

    #[test]
    fn test_for_heap_skips_null_granule() {
        let heap = heap();
        let pool = SharedPool::for_heap(&heap, None).unwrap();
        assert_eq!(pool.start(), 8);
        assert_eq!(pool.end(), heap.size());
        assert_eq!(pool.remaining(), heap.size() - 8);
    }

    #[test]
    fn test_claims_are_contiguous() {
        let heap = heap();
        let pool = SharedPool::for_heap(&heap, None).unwrap();
        assert_eq!(
            pool.try_claim(16, 4),
            ClaimOutcome::Claimed { offset: 8, attempts: 1 }
        );
        assert_eq!(
            pool.try_claim(32, 4),
            ClaimOutcome::Claimed { offset: 24, attempts: 1 }
        );
        assert_eq!(pool.used(), 48);
    }

    #[test]
    fn test_exhaustion() {
        let heap = heap();
        let pool = SharedPool::new(&heap, 8, 40).unwrap();
        assert!(matches!(pool.try_claim(24, 4), ClaimOutcome::Claimed { .. }));
        assert_eq!(
            pool.try_claim(16, 4),
            ClaimOutcome::Exhausted { available: 8, attempts: 1 }
        );
        assert!(matches!(
            pool.claim(16),
            Err(BarrierError::OutOfMemory { requested: 16, available: 8 })
        ));
        assert_eq!(pool.claim(8).unwrap(), 32);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_zero_attempts_is_contended() {
        let heap = heap();
        let pool = SharedPool::for_heap(&heap, None).unwrap();
        assert_eq!(pool.try_claim(16, 0), ClaimOutcome::Contended { attempts: 0 });
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn test_reset() {
        let heap = heap();
        let pool = SharedPool::for_heap(&heap, Some(1024)).unwrap();
        pool.claim(512).unwrap();
        pool.reset();
        assert_eq!(pool.top(), pool.start());
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let heap = heap();
        assert!(SharedPool::new(&heap, 0, 64).is_err());
        assert!(SharedPool::new(&heap, 64, 64).is_err());
        assert!(SharedPool::new(&heap, 8, heap.size() + 8).is_err());
        assert!(matches!(
            SharedPool::new(&heap, 12, 64),
            Err(BarrierError::AlignmentError { address: 12, alignment: 8 })
        ));
    }
}
