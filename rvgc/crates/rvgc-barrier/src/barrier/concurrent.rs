//! Concurrent Barrier - SATB Pre-Write and Self-Healing Load Barrier
//!
//! Used while the collector marks and relocates concurrently with mutators.
//!
//! Load Barrier:
//! ```text
//! LOAD(slot):
//!     obj = *slot
//!     fwd = RESOLVE(obj)
//!     if fwd != obj:
//!         CAS(slot, obj, fwd)    // heal; losing the race is fine
//!     return fwd
//! ```
//!
//! Store Barrier:
//! ```text
//! STORE(slot, value):
//!     if MARKING and slot is initialized:
//!         RECORD_PRE_VALUE(*slot)   // keep the snapshot reachable
//!     *slot = RESOLVE(value)
//!     release_fence()
//!     RECORD_FIELD(slot)
//! ```
//!
//! Reference equality resolves both sides before comparing, so a stale
//! reference and its forwardee compare equal. Array copies resolve every
//! copied reference the same way a store does.

use super::{raw, AccessBarrier, AccessKind, BarrierCore};
use crate::collector::{MarkingState, ReferenceResolver, WriteRecorder};
use crate::decorators::{BasicType, DecoratorSet, Value};
use crate::heap::HeapRef;
use crate::logging::{log_event, BarrierEvent};
use crate::register::{RegSet, T0, T1, T2};
use crate::util::constants::HEAP_REF_SIZE;
use rvgc_atomic::{compare_and_exchange, release_fence, AtomicOrder};
use std::sync::Arc;

/// Collector structures the concurrent barrier drives
#[derive(Clone)]
pub struct ConcurrentCollaborators {
    pub resolver: Arc<dyn ReferenceResolver>,
    pub marking: Arc<dyn MarkingState>,
    pub recorder: Arc<dyn WriteRecorder>,
}

impl ConcurrentCollaborators {
    pub fn new(
        resolver: Arc<dyn ReferenceResolver>,
        marking: Arc<dyn MarkingState>,
        recorder: Arc<dyn WriteRecorder>,
    ) -> Self {
        Self {
            resolver,
            marking,
            recorder,
        }
    }
}

pub struct ConcurrentBarrier {
    core: BarrierCore,
    collaborators: ConcurrentCollaborators,
}

impl ConcurrentBarrier {
    pub fn new(core: BarrierCore, collaborators: ConcurrentCollaborators) -> Self {
        Self {
            core,
            collaborators,
        }
    }

    pub fn collaborators(&self) -> &ConcurrentCollaborators {
        &self.collaborators
    }

    #[inline]
    fn resolve(&self, obj: HeapRef) -> HeapRef {
        if obj.is_null() {
            obj
        } else {
            self.collaborators.resolver.resolve(obj)
        }
    }

    /// Replace `stale` with `healed` in `slot` unless another thread got
    /// there first
    unsafe fn heal(&self, slot: *mut u8, stale: HeapRef, healed: HeapRef) {
        let observed = compare_and_exchange(
            stale.raw(),
            healed.raw(),
            slot.cast::<u32>(),
            AtomicOrder::Release,
        );

        if observed == stale.raw() {
            log::trace!("healed slot {:p}: {:?} -> {:?}", slot, stale, healed);
            if self.core.verbose() {
                log_event(BarrierEvent::ReferenceHealed {
                    from: stale.raw(),
                    to: healed.raw(),
                });
            }
        }
    }
}

impl AccessBarrier for ConcurrentBarrier {
    fn core(&self) -> &BarrierCore {
        &self.core
    }

    fn clobbers(&self, kind: AccessKind) -> RegSet {
        match kind {
            AccessKind::ArrayCopy => RegSet::of(&[T0, T1, T2]),
            _ => RegSet::of(&[T0, T1]),
        }
    }

    unsafe fn load(&self, decorators: DecoratorSet, ty: BasicType, src: *mut u8) -> Value {
        if !ty.is_reference() {
            return raw::load(decorators, ty, src);
        }

        let obj = raw::load_reference(decorators, src);
        let resolved = self.resolve(obj);
        if resolved != obj {
            self.heal(src, obj, resolved);
        }

        // A weak referent read during marking becomes strongly reachable
        if decorators.is_weak()
            && !decorators.contains(DecoratorSet::AS_NO_KEEPALIVE)
            && self.collaborators.marking.is_marking()
        {
            self.collaborators.recorder.record_pre_value(resolved);
        }

        Value::Reference(resolved)
    }

    unsafe fn store(&self, decorators: DecoratorSet, ty: BasicType, dst: *mut u8, value: Value) {
        if !ty.is_reference() {
            raw::store(decorators, dst, value);
            return;
        }

        let in_heap = decorators.is_in_heap();
        if in_heap && !decorators.is_dest_uninitialized() && self.collaborators.marking.is_marking()
        {
            let previous = raw::load_reference(DecoratorSet::NONE, dst);
            self.collaborators.recorder.record_pre_value(previous);
        }

        let value = match value {
            Value::Reference(obj) => Value::Reference(self.resolve(obj)),
            other => other,
        };
        raw::store(decorators, dst, value);

        if !in_heap {
            return;
        }
        if let Some(field) = self.core.heap().offset_of(dst) {
            release_fence();
            self.collaborators.recorder.record_field(field);
        }
    }

    fn reference_equals(&self, a: HeapRef, b: HeapRef) -> bool {
        a == b || self.resolve(a) == self.resolve(b)
    }

    /// Copied references are resolved, as a store would resolve them
    unsafe fn copy_element(&self, decorators: DecoratorSet, ty: BasicType, src: *mut u8, dst: *mut u8) {
        let value = match raw::load(decorators, ty, src) {
            Value::Reference(obj) => Value::Reference(self.resolve(obj)),
            other => other,
        };
        raw::store(decorators, dst, value);
    }

    unsafe fn array_copy_pre(
        &self,
        decorators: DecoratorSet,
        ty: BasicType,
        _src: *mut u8,
        dst: *mut u8,
        count: usize,
    ) {
        if !ty.is_reference()
            || decorators.is_dest_uninitialized()
            || !self.collaborators.marking.is_marking()
        {
            return;
        }

        for index in 0..count {
            let slot = dst.wrapping_add(index * HEAP_REF_SIZE);
            let previous = raw::load_reference(DecoratorSet::NONE, slot);
            self.collaborators.recorder.record_pre_value(previous);
        }
    }

    unsafe fn array_copy_post(
        &self,
        decorators: DecoratorSet,
        ty: BasicType,
        _src: *mut u8,
        dst: *mut u8,
        count: usize,
    ) {
        if !ty.is_reference() || !decorators.is_in_heap() || count == 0 {
            return;
        }

        if let Some(start) = self.core.heap().offset_of(dst) {
            release_fence();
            self.collaborators.recorder.record_range(start, count);
        }
    }
}
