//! Test Utilities for the atomic layer
//!
//! Shared memory fixtures and a start-line thread runner. Every test that
//! shares a location between threads goes through these helpers so the
//! layout rules of the layer (natural alignment, sub-word lanes living in an
//! aligned word) hold by construction.

#![allow(dead_code)]

use std::cell::UnsafeCell;
use std::sync::{Arc, Barrier};
use std::thread;

/// ============================================================================
/// SHARED CELLS
/// ============================================================================

/// One aligned block holding a location of every width
#[repr(C, align(8))]
pub struct SharedCells {
    bytes: UnsafeCell<[u8; 4]>,
    halves: UnsafeCell<[u16; 2]>,
    word: UnsafeCell<u32>,
    signed: UnsafeCell<i32>,
    wide: UnsafeCell<u64>,
}

// SAFETY: every access in the tests goes through rvgc_atomic.
unsafe impl Sync for SharedCells {}

impl SharedCells {
    /// All cells zeroed
    pub fn zeroed() -> Arc<Self> {
        Self::with_word(0)
    }

    /// All cells zeroed except the 4-byte word
    pub fn with_word(word: u32) -> Arc<Self> {
        Arc::new(Self {
            bytes: UnsafeCell::new([0; 4]),
            halves: UnsafeCell::new([0; 2]),
            word: UnsafeCell::new(word),
            signed: UnsafeCell::new(0),
            wide: UnsafeCell::new(0),
        })
    }

    /// Byte lane `index` (0..4)
    pub fn byte(&self, index: usize) -> *mut u8 {
        assert!(index < 4);
        self.bytes.get().cast::<u8>().wrapping_add(index)
    }

    /// Half-word lane `index` (0..2)
    pub fn half(&self, index: usize) -> *mut u16 {
        assert!(index < 2);
        self.halves.get().cast::<u16>().wrapping_add(index)
    }

    pub fn word(&self) -> *mut u32 {
        self.word.get()
    }

    pub fn signed(&self) -> *mut i32 {
        self.signed.get()
    }

    pub fn wide(&self) -> *mut u64 {
        self.wide.get()
    }
}

/// ============================================================================
/// THREAD RUNNER
/// ============================================================================

/// Run `threads` workers released together from a start line
///
/// Each worker receives its index. Results come back in index order.
pub fn run_workers<T, F>(threads: usize, worker: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let start = Arc::new(Barrier::new(threads));
    let worker = Arc::new(worker);

    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let start = Arc::clone(&start);
            let worker = Arc::clone(&worker);
            thread::spawn(move || {
                start.wait();
                worker(index)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("worker thread should not panic"))
        .collect()
}
