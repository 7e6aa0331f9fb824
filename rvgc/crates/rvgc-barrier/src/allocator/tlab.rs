//! Thread-Local Allocation Buffer (TLAB)
//!
//! A TLAB is a range of the arena owned by one thread. Bumping it needs no
//! atomics: `top` and `end` are plain fields behind `&mut self`, and the type
//! is `!Sync` so a shared reference can never reach another thread.
//!
//! ## Lifecycle
//!
//! 1. Start empty (`top == end`), so the first allocation overflows
//! 2. `refill_from` carves a fresh buffer out of the shared pool
//! 3. `try_bump` hands out objects until the buffer is exhausted
//! 4. `retire` gives up the tail and accounts the bytes used

use super::shared::SharedPool;
use crate::error::{BarrierError, Result};
use crate::logging::{log_event, BarrierEvent};
use std::cell::Cell;
use std::marker::PhantomData;

/// ThreadLocalPool - per-thread bump pointer over `[top, end)`
#[derive(Debug)]
pub struct ThreadLocalPool {
    start: usize,
    top: usize,
    end: usize,
    /// Bytes allocated in retired buffers
    allocated_bytes: u64,
    _not_sync: PhantomData<Cell<()>>,
}

impl ThreadLocalPool {
    /// Pool with no buffer
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Pool over arena offsets `[start, end)`
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted TLAB [{:#x}, {:#x})", start, end);
        Self {
            start,
            top: start,
            end,
            allocated_bytes: 0,
            _not_sync: PhantomData,
        }
    }

    /// Bump `top` by `size` if the buffer has room
    ///
    /// On overflow the pool is left exactly as it was.
    #[inline]
    pub fn try_bump(&mut self, size: usize) -> Option<usize> {
        if size > self.remaining() {
            return None;
        }
        let obj = self.top;
        self.top += size;
        Some(obj)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.top
    }

    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Bytes handed out from the current buffer
    pub fn used(&self) -> usize {
        self.top - self.start
    }

    /// Give up the current buffer
    ///
    /// Accounts the used part and returns the number of bytes wasted.
    pub fn retire(&mut self) -> usize {
        let waste = self.remaining();
        self.incr_allocated_bytes(self.used() as u64);
        self.start = self.end;
        self.top = self.end;
        waste
    }

    /// Retire the current buffer and claim a new one of `size` bytes from
    /// `pool`
    ///
    /// A slow-path helper; the fast path never refills.
    pub fn refill_from(&mut self, pool: &SharedPool, size: usize) -> Result<()> {
        if size == 0 || size % pool.alignment() != 0 {
            return Err(BarrierError::InvalidArgument(format!(
                "TLAB size {} is not a positive multiple of {}",
                size,
                pool.alignment()
            )));
        }

        let start = pool.claim(size)?;
        let retired_waste = self.retire();
        self.start = start;
        self.top = start;
        self.end = start + size;

        log::debug!(
            "TLAB refilled: [{:#x}, {:#x}), {} bytes retired",
            self.start,
            self.end,
            retired_waste
        );
        log_event(BarrierEvent::TlabRefilled { size, retired_waste });

        Ok(())
    }

    /// Account bytes allocated for this thread outside the buffer
    #[inline]
    pub fn incr_allocated_bytes(&mut self, bytes: u64) {
        self.allocated_bytes += bytes;
    }

    /// Bytes accounted so far, not counting the current buffer
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    /// Bytes accounted so far plus the current buffer's used bytes
    pub fn total_allocated(&self) -> u64 {
        self.allocated_bytes + self.used() as u64
    }
}

impl Default for ThreadLocalPool {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn test_empty_always_overflows() {
        let mut tlab = ThreadLocalPool::empty();
        assert_eq!(tlab.remaining(), 0);
        assert_eq!(tlab.try_bump(8), None);
    }

    #[test]
    fn test_bump() {
        let mut tlab = ThreadLocalPool::new(64, 128);
        assert_eq!(tlab.try_bump(16), Some(64));
        assert_eq!(tlab.try_bump(48), Some(80));
        assert_eq!(tlab.remaining(), 0);
        assert_eq!(tlab.try_bump(8), None);
    }

    #[test]
    fn test_overflow_leaves_pool_unchanged() {
        let mut tlab = ThreadLocalPool::new(64, 80);
        assert_eq!(tlab.try_bump(24), None);
        assert_eq!(tlab.top(), 64);
        assert_eq!(tlab.remaining(), 16);
        assert_eq!(tlab.try_bump(16), Some(64));
    }

    #[test]
    fn test_retire_accounts_used_bytes() {
        let mut tlab = ThreadLocalPool::new(0, 256);
        tlab.try_bump(96).unwrap();
        assert_eq!(tlab.total_allocated(), 96);
        assert_eq!(tlab.retire(), 160);
        assert_eq!(tlab.allocated_bytes(), 96);
        assert_eq!(tlab.remaining(), 0);
        assert_eq!(tlab.retire(), 0);
        assert_eq!(tlab.allocated_bytes(), 96);
    }

    #[test]
    fn test_refill_from_shared_pool() {
        let heap = Heap::new(64 * 1024, 8).unwrap();
        let pool = SharedPool::for_heap(&heap, None).unwrap();
        let mut tlab = ThreadLocalPool::empty();

        tlab.refill_from(&pool, 1024).unwrap();
        assert_eq!(tlab.top(), 8);
        assert_eq!(tlab.end(), 8 + 1024);

        tlab.try_bump(64).unwrap();
        tlab.refill_from(&pool, 512).unwrap();
        assert_eq!(tlab.top(), 8 + 1024);
        assert_eq!(tlab.allocated_bytes(), 64);
    }

    #[test]
    fn test_refill_failure_keeps_buffer() {
        let heap = Heap::new(64 * 1024, 8).unwrap();
        let pool = SharedPool::new(&heap, 8, 72).unwrap();
        let mut tlab = ThreadLocalPool::empty();
        tlab.refill_from(&pool, 32).unwrap();

        assert!(matches!(
            tlab.refill_from(&pool, 64),
            Err(BarrierError::OutOfMemory { requested: 64, available: 32 })
        ));
        assert_eq!(tlab.remaining(), 32);
        assert!(tlab.refill_from(&pool, 12).is_err());
    }
}
