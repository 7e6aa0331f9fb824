//! SATB Remembered Set
//!
//! Snapshot-at-the-beginning marking needs every reference that is about to
//! be overwritten while marking runs, so the snapshot stays reachable. A
//! concurrent collector also needs to know which fields were written, to
//! remap or rescan them.
//!
//! Mutators push from store barriers without blocking; collector threads
//! drain.

use super::{MarkingState, WriteRecorder};
use crate::heap::HeapRef;
use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marking flag plus pre-value and written-field queues
#[derive(Default)]
pub struct SatbRememberedSet {
    marking: AtomicBool,
    pre_values: SegQueue<HeapRef>,
    fields: SegQueue<usize>,
    ranges: SegQueue<(usize, usize)>,
}

impl SatbRememberedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a marking cycle
    pub fn start_marking(&self) {
        self.marking.store(true, Ordering::Release);
    }

    /// End a marking cycle
    pub fn stop_marking(&self) {
        self.marking.store(false, Ordering::Release);
    }

    /// Take every queued pre-value
    pub fn drain_pre_values(&self) -> Vec<HeapRef> {
        std::iter::from_fn(|| self.pre_values.pop()).collect()
    }

    /// Take every queued field offset
    pub fn drain_fields(&self) -> Vec<usize> {
        std::iter::from_fn(|| self.fields.pop()).collect()
    }

    /// Take every queued `(start, count)` range
    pub fn drain_ranges(&self) -> Vec<(usize, usize)> {
        std::iter::from_fn(|| self.ranges.pop()).collect()
    }

    pub fn pending_pre_values(&self) -> usize {
        self.pre_values.len()
    }

    pub fn pending_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn pending_ranges(&self) -> usize {
        self.ranges.len()
    }
}

impl MarkingState for SatbRememberedSet {
    #[inline]
    fn is_marking(&self) -> bool {
        self.marking.load(Ordering::Acquire)
    }
}

impl WriteRecorder for SatbRememberedSet {
    /// Null pre-values carry nothing to keep alive and are dropped
    fn record_pre_value(&self, previous: HeapRef) {
        if !previous.is_null() {
            self.pre_values.push(previous);
        }
    }

    fn record_field(&self, field: usize) {
        self.fields.push(field);
    }

    fn record_range(&self, start: usize, count: usize) {
        if count > 0 {
            self.ranges.push((start, count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_marking_flag() {
        let satb = SatbRememberedSet::new();
        assert!(!satb.is_marking());
        satb.start_marking();
        assert!(satb.is_marking());
        satb.stop_marking();
        assert!(!satb.is_marking());
    }

    #[test]
    fn test_null_pre_value_dropped() {
        let satb = SatbRememberedSet::new();
        satb.record_pre_value(HeapRef::NULL);
        satb.record_pre_value(HeapRef::from_raw(64));
        assert_eq!(satb.drain_pre_values(), vec![HeapRef::from_raw(64)]);
        assert_eq!(satb.pending_pre_values(), 0);
    }

    #[test]
    fn test_fields_and_ranges_fifo() {
        let satb = SatbRememberedSet::new();
        satb.record_field(8);
        satb.record_field(16);
        satb.record_range(32, 4);
        satb.record_range(64, 0);
        assert_eq!(satb.drain_fields(), vec![8, 16]);
        assert_eq!(satb.drain_ranges(), vec![(32, 4)]);
    }

    #[test]
    fn test_concurrent_recording() {
        let satb = Arc::new(SatbRememberedSet::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let satb = Arc::clone(&satb);
                thread::spawn(move || {
                    for i in 0..1000 {
                        satb.record_field(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut fields = satb.drain_fields();
        fields.sort_unstable();
        assert_eq!(fields, (0..4000).collect::<Vec<_>>());
    }
}
