//! Test Utilities for the barrier layer
//!
//! A fixture bundles a barrier set with the collector structures it drives,
//! so a test can act as both mutator and collector.

#![allow(dead_code)]

use rvgc_barrier::{
    BarrierConfig, BarrierKind, BarrierSet, ConcurrentCollaborators, ForwardingTable, Heap,
    HeapRef, SatbRememberedSet,
};
use std::sync::{Arc, Barrier};
use std::thread;

/// Default heap size for tests (1MB)
pub const DEFAULT_HEAP_SIZE: usize = 1024 * 1024;

/// Reference field offset inside test objects
pub const FIELD: usize = 8;

/// ============================================================================
/// BARRIER FIXTURE
/// ============================================================================

pub struct BarrierFixture {
    pub barriers: BarrierSet,
    pub forwarding: Arc<ForwardingTable>,
    pub satb: Arc<SatbRememberedSet>,
}

impl BarrierFixture {
    pub fn config(barrier: BarrierKind) -> BarrierConfig {
        BarrierConfig {
            barrier,
            heap_size: DEFAULT_HEAP_SIZE,
            verbose: false,
            ..Default::default()
        }
    }

    pub fn new(barrier: BarrierKind) -> Self {
        Self::with_config(Self::config(barrier))
    }

    pub fn minimal() -> Self {
        Self::new(BarrierKind::Minimal)
    }

    pub fn card_table() -> Self {
        Self::new(BarrierKind::CardTable)
    }

    pub fn concurrent() -> Self {
        Self::new(BarrierKind::Concurrent)
    }

    pub fn with_config(config: BarrierConfig) -> Self {
        let heap = Arc::new(Heap::from_config(&config).expect("heap should map"));
        let forwarding = Arc::new(ForwardingTable::new(&heap));
        let satb = Arc::new(SatbRememberedSet::new());
        let collaborators =
            ConcurrentCollaborators::new(forwarding.clone(), satb.clone(), satb.clone());
        let barriers = BarrierSet::from_config(&config, heap, Some(collaborators))
            .expect("barrier set should build");

        Self {
            barriers,
            forwarding,
            satb,
        }
    }

    pub fn heap(&self) -> &Heap {
        self.barriers.heap()
    }

    /// Claim a zeroed object of `size` bytes from the shared pool
    pub fn new_object(&self, size: usize) -> HeapRef {
        let pool = self.barriers.shared_pool().expect("shared pool enabled");
        let offset = pool.claim(size).expect("test heap should not run out");
        HeapRef::from_raw(offset as u32)
    }

    /// Address of the reference field of `obj`
    pub fn field(&self, obj: HeapRef) -> *mut u8 {
        self.heap().field_addr(obj, FIELD)
    }

    /// Arena offset of the reference field of `obj`
    pub fn field_offset(&self, obj: HeapRef) -> usize {
        obj.raw() as usize + FIELD
    }

    /// Address of element `index` of a reference array starting at `obj`
    pub fn element(&self, obj: HeapRef, index: usize) -> *mut u8 {
        self.heap().element_addr(obj, 0, index, 4)
    }
}

/// ============================================================================
/// THREAD RUNNER
/// ============================================================================

/// Run `threads` workers released together from a start line
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

/// Assert that `[start, start + len)` ranges are pairwise disjoint
pub fn assert_disjoint(mut ranges: Vec<(usize, usize)>) {
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        let (start, len) = pair[0];
        let (next, _) = pair[1];
        assert!(
            start + len <= next,
            "range [{:#x}, {:#x}) overlaps range starting at {:#x}",
            start,
            start + len,
            next
        );
    }
}
