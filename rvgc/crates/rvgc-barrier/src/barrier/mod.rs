//! Barrier Module - Barrier Set Dispatch
//!
//! The barrier set is what a code generator calls at every managed-memory
//! access site. It is chosen once, when the collector is configured, and is
//! then shared read-only by every mutator thread.
//!
//! Access Hooks:
//! - `load` / `store`: typed access plus collector fix-up or bookkeeping
//! - `reference_equals`: identity that may see through forwarding
//! - `array_copy_pre` / `array_copy_post`: bracket a bulk copy, batching
//!   bookkeeping for the whole destination range
//! - `allocate`: bump-pointer fast path with a caller-supplied slow path
//!
//! Variants:
//! - [`MinimalBarrier`]: raw access, no bookkeeping
//! - [`CardTableBarrier`]: generational card marking after reference stores
//! - [`ConcurrentBarrier`]: SATB pre-write recording and self-healing loads
//!
//! Each variant declares the scratch registers its emitted code may clobber
//! per access kind ([`BarrierSet::clobbers`]). Registers a caller preserves
//! across an array copy must not overlap that set.

pub mod card_table;
pub mod concurrent;
pub mod minimal;
pub mod raw;

pub use card_table::CardTableBarrier;
pub use concurrent::{ConcurrentBarrier, ConcurrentCollaborators};
pub use minimal::MinimalBarrier;

use crate::allocator::{
    AllocRequest, AllocSize, AllocState, Allocation, ClaimOutcome, SharedPool, ThreadLocalPool,
};
use crate::collector::CardTable;
use crate::config::{BarrierConfig, BarrierKind};
use crate::decorators::{BasicType, DecoratorSet, Value};
use crate::error::{BarrierError, Result};
use crate::heap::{Heap, HeapRef};
use crate::logging::{log_event, BarrierEvent};
use crate::register::RegSet;
use std::sync::Arc;

/// Low bit of a native handle marking it weak
pub const WEAK_HANDLE_TAG: usize = 1;

/// Access kinds a barrier declares clobbers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Load,
    Store,
    Equals,
    ArrayCopy,
    Allocate,
}

/// State every variant shares
pub struct BarrierCore {
    heap: Arc<Heap>,
    shared: Option<SharedPool>,
    shared_cas_retries: u32,
    verbose: bool,
}

impl BarrierCore {
    /// Validate `config` against `heap` and set up the shared pool
    pub fn new(config: &BarrierConfig, heap: Arc<Heap>) -> Result<Self> {
        config.validate()?;

        if heap.alignment() != config.object_alignment {
            return Err(BarrierError::InvalidArgument(format!(
                "heap alignment {} does not match object alignment {}",
                heap.alignment(),
                config.object_alignment
            )));
        }

        let shared = if config.shared_pool_enabled {
            Some(SharedPool::for_heap(&heap, config.shared_pool_size)?)
        } else {
            None
        };

        Ok(Self {
            heap,
            shared,
            shared_cas_retries: config.shared_cas_retries,
            verbose: config.verbose,
        })
    }

    #[inline]
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    #[inline]
    pub fn shared_pool(&self) -> Option<&SharedPool> {
        self.shared.as_ref()
    }

    #[inline]
    pub fn shared_cas_retries(&self) -> u32 {
        self.shared_cas_retries
    }

    #[inline]
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Capability interface every variant implements
///
/// Defaults are the raw access with no bookkeeping.
pub trait AccessBarrier: Send + Sync {
    fn core(&self) -> &BarrierCore;

    /// Scratch registers the variant's code for `kind` may clobber
    fn clobbers(&self, kind: AccessKind) -> RegSet;

    /// # Safety
    /// See [`raw::load`].
    unsafe fn load(&self, decorators: DecoratorSet, ty: BasicType, src: *mut u8) -> Value {
        raw::load(decorators, ty, src)
    }

    /// # Safety
    /// See [`raw::store`].
    unsafe fn store(&self, decorators: DecoratorSet, _ty: BasicType, dst: *mut u8, value: Value) {
        raw::store(decorators, dst, value)
    }

    fn reference_equals(&self, a: HeapRef, b: HeapRef) -> bool {
        a == b
    }

    /// Move one element of an array copy
    ///
    /// # Safety
    /// `src` and `dst` must each hold a valid, aligned `ty`.
    unsafe fn copy_element(&self, decorators: DecoratorSet, ty: BasicType, src: *mut u8, dst: *mut u8) {
        raw::store(decorators, dst, raw::load(decorators, ty, src));
    }

    /// # Safety
    /// `dst` must hold `count` valid elements of `ty`.
    unsafe fn array_copy_pre(
        &self,
        _decorators: DecoratorSet,
        _ty: BasicType,
        _src: *mut u8,
        _dst: *mut u8,
        _count: usize,
    ) {
    }

    /// # Safety
    /// `dst` must hold `count` valid elements of `ty`.
    unsafe fn array_copy_post(
        &self,
        _decorators: DecoratorSet,
        _ty: BasicType,
        _src: *mut u8,
        _dst: *mut u8,
        _count: usize,
    ) {
    }
}

macro_rules! dispatch {
    ($set:expr, $barrier:ident => $body:expr) => {
        match $set {
            BarrierSet::Minimal($barrier) => $body,
            BarrierSet::CardTable($barrier) => $body,
            BarrierSet::Concurrent($barrier) => $body,
        }
    };
}

/// BarrierSet - the configured barrier variant
///
/// Built once at startup and shared by reference afterwards. All methods
/// take `&self`; the collector structures a variant drives carry their own
/// synchronization.
///
/// # Examples
///
/// ```rust
/// use rvgc_barrier::{BarrierConfig, BarrierKind, BarrierSet, Heap};
/// use std::sync::Arc;
///
/// let config = BarrierConfig {
///     barrier: BarrierKind::CardTable,
///     heap_size: 1 << 20,
///     ..Default::default()
/// };
/// let heap = Arc::new(Heap::from_config(&config).unwrap());
/// let barriers = BarrierSet::from_config(&config, heap, None).unwrap();
/// assert_eq!(barriers.kind(), BarrierKind::CardTable);
/// ```
pub enum BarrierSet {
    Minimal(MinimalBarrier),
    CardTable(CardTableBarrier),
    Concurrent(ConcurrentBarrier),
}

impl BarrierSet {
    pub fn minimal(config: &BarrierConfig, heap: Arc<Heap>) -> Result<Self> {
        let core = BarrierCore::new(config, heap)?;
        Ok(Self::configured(config, BarrierSet::Minimal(MinimalBarrier::new(core))))
    }

    pub fn generational(config: &BarrierConfig, heap: Arc<Heap>) -> Result<Self> {
        let core = BarrierCore::new(config, heap)?;
        let barrier = CardTableBarrier::new(core, config.card_shift);
        Ok(Self::configured(config, BarrierSet::CardTable(barrier)))
    }

    pub fn concurrent(
        config: &BarrierConfig,
        heap: Arc<Heap>,
        collaborators: ConcurrentCollaborators,
    ) -> Result<Self> {
        let core = BarrierCore::new(config, heap)?;
        let barrier = ConcurrentBarrier::new(core, collaborators);
        Ok(Self::configured(config, BarrierSet::Concurrent(barrier)))
    }

    /// Build the variant `config.barrier` names
    ///
    /// The concurrent variant needs `collaborators`; the others ignore them.
    pub fn from_config(
        config: &BarrierConfig,
        heap: Arc<Heap>,
        collaborators: Option<ConcurrentCollaborators>,
    ) -> Result<Self> {
        match (config.barrier, collaborators) {
            (BarrierKind::Minimal, _) => Self::minimal(config, heap),
            (BarrierKind::CardTable, _) => Self::generational(config, heap),
            (BarrierKind::Concurrent, Some(collaborators)) => {
                Self::concurrent(config, heap, collaborators)
            },
            (BarrierKind::Concurrent, None) => Err(BarrierError::InvalidState {
                expected: "collector collaborators for the concurrent barrier".to_string(),
                actual: "none supplied".to_string(),
            }),
        }
    }

    fn configured(config: &BarrierConfig, set: BarrierSet) -> BarrierSet {
        log::debug!(
            "configured {} barrier set: heap {} bytes, shared pool {}",
            set.kind(),
            set.heap().size(),
            if set.core().shared_pool().is_some() { "enabled" } else { "disabled" }
        );
        if config.verbose {
            log_event(BarrierEvent::Configured {
                kind: set.kind().as_str().to_string(),
                heap_size: set.heap().size(),
                card_shift: config.card_shift,
            });
        }
        set
    }

    fn core(&self) -> &BarrierCore {
        dispatch!(self, barrier => barrier.core())
    }

    pub fn kind(&self) -> BarrierKind {
        match self {
            BarrierSet::Minimal(_) => BarrierKind::Minimal,
            BarrierSet::CardTable(_) => BarrierKind::CardTable,
            BarrierSet::Concurrent(_) => BarrierKind::Concurrent,
        }
    }

    pub fn heap(&self) -> &Arc<Heap> {
        self.core().heap()
    }

    pub fn shared_pool(&self) -> Option<&SharedPool> {
        self.core().shared_pool()
    }

    /// Card table of the generational variant
    pub fn card_table(&self) -> Option<&Arc<CardTable>> {
        match self {
            BarrierSet::CardTable(barrier) => Some(barrier.card_table()),
            _ => None,
        }
    }

    /// Scratch registers the barrier may clobber for `kind`
    pub fn clobbers(&self, kind: AccessKind) -> RegSet {
        dispatch!(self, barrier => barrier.clobbers(kind))
    }

    /// Load a `ty` from `src`, applying the collector's fix-up
    ///
    /// # Safety
    /// `src` must be valid and naturally aligned for `ty`. Reference slots
    /// and the words holding ordered 1 and 2 byte fields must only be
    /// accessed through barriers or `rvgc-atomic`.
    #[inline]
    pub unsafe fn load(&self, decorators: DecoratorSet, ty: BasicType, src: *mut u8) -> Value {
        dispatch!(self, barrier => barrier.load(decorators, ty, src))
    }

    /// Store `value` as a `ty` to `dst`, then do the collector's bookkeeping
    ///
    /// # Safety
    /// As for [`BarrierSet::load`], for writes.
    #[inline]
    pub unsafe fn store(&self, decorators: DecoratorSet, ty: BasicType, dst: *mut u8, value: Value) {
        debug_assert!(value.fits(ty), "{:?} stored as {:?}", value, ty);
        dispatch!(self, barrier => barrier.store(decorators, ty, dst, value))
    }

    #[inline]
    pub fn reference_equals(&self, a: HeapRef, b: HeapRef) -> bool {
        dispatch!(self, barrier => barrier.reference_equals(a, b))
    }

    #[inline]
    pub fn reference_not_equals(&self, a: HeapRef, b: HeapRef) -> bool {
        !self.reference_equals(a, b)
    }

    /// Hook before copying `count` elements of `ty` from `src` to `dst`
    ///
    /// # Safety
    /// `src` and `dst` must each hold `count` valid, aligned elements.
    pub unsafe fn array_copy_pre(
        &self,
        decorators: DecoratorSet,
        ty: BasicType,
        src: *mut u8,
        dst: *mut u8,
        count: usize,
        preserved: RegSet,
    ) {
        debug_assert!(
            preserved.is_disjoint(self.clobbers(AccessKind::ArrayCopy)),
            "preserved {:?} overlaps array copy clobbers {:?}",
            preserved,
            self.clobbers(AccessKind::ArrayCopy)
        );
        dispatch!(self, barrier => barrier.array_copy_pre(decorators, ty, src, dst, count))
    }

    /// Hook after copying `count` elements of `ty` from `src` to `dst`
    ///
    /// # Safety
    /// As for [`BarrierSet::array_copy_pre`].
    pub unsafe fn array_copy_post(
        &self,
        decorators: DecoratorSet,
        ty: BasicType,
        src: *mut u8,
        dst: *mut u8,
        count: usize,
        preserved: RegSet,
    ) {
        debug_assert!(
            preserved.is_disjoint(self.clobbers(AccessKind::ArrayCopy)),
            "preserved {:?} overlaps array copy clobbers {:?}",
            preserved,
            self.clobbers(AccessKind::ArrayCopy)
        );
        dispatch!(self, barrier => barrier.array_copy_post(decorators, ty, src, dst, count))
    }

    /// Copy `count` elements of `ty` between the hooks
    ///
    /// Overlapping ranges are copied in the safe direction unless the
    /// decorators promise `ARRAYCOPY_DISJOINT`.
    ///
    /// # Safety
    /// As for [`BarrierSet::array_copy_pre`].
    pub unsafe fn array_copy(
        &self,
        decorators: DecoratorSet,
        ty: BasicType,
        src: *mut u8,
        dst: *mut u8,
        count: usize,
        preserved: RegSet,
    ) {
        self.array_copy_pre(decorators, ty, src, dst, count, preserved);
        dispatch!(self, barrier => copy_elements(barrier, decorators, ty, src, dst, count));
        self.array_copy_post(decorators, ty, src, dst, count, preserved);
    }

    /// Read the reference a native handle points at
    ///
    /// A handle is the address of a 4-byte slot, tagged with
    /// [`WEAK_HANDLE_TAG`] when the slot holds a weak reference.
    ///
    /// # Safety
    /// `handle` must be null or a tagged address of a valid reference slot.
    pub unsafe fn resolve_handle(&self, handle: *mut u8) -> HeapRef {
        if handle.is_null() {
            return HeapRef::NULL;
        }

        let weak = handle as usize & WEAK_HANDLE_TAG != 0;
        let slot = if weak {
            handle.wrapping_sub(WEAK_HANDLE_TAG)
        } else {
            handle
        };
        let strength = if weak {
            DecoratorSet::ON_WEAK_OOP_REF
        } else {
            DecoratorSet::ON_STRONG_OOP_REF
        };

        self.load(DecoratorSet::IN_NATIVE | strength, BasicType::Object, slot)
            .as_reference()
            .unwrap_or(HeapRef::NULL)
    }

    /// Allocation fast path
    ///
    /// Bumps `tlab`, then claims from the shared pool, and calls `slow_path`
    /// when neither succeeds. A TLAB overflow leaves `tlab` untouched. The
    /// fast path never refills the TLAB.
    pub fn allocate<R, F>(&self, tlab: &mut ThreadLocalPool, size: AllocSize, slow_path: F) -> Allocation<R>
    where
        F: FnOnce(AllocRequest) -> R,
    {
        let core = self.core();
        let mut request = AllocRequest {
            size: usize::MAX,
            tlab_remaining: tlab.remaining(),
            shared_attempts: 0,
        };
        let mut state = AllocState::TryThreadLocal;

        loop {
            match state {
                AllocState::TryThreadLocal => {
                    request.size = match size.aligned(core.heap().alignment()) {
                        Some(bytes) => bytes,
                        None => {
                            state = AllocState::SlowPath;
                            continue;
                        },
                    };
                    if request.size == 0 {
                        state = AllocState::SlowPath;
                        continue;
                    }

                    if let Some(offset) = tlab.try_bump(request.size) {
                        return Self::claimed(offset, state);
                    }

                    log::trace!(
                        "TLAB overflow: {} bytes requested, {} left",
                        request.size,
                        request.tlab_remaining
                    );
                    state = if core.shared_pool().is_some() {
                        AllocState::TrySharedCas
                    } else {
                        AllocState::SlowPath
                    };
                },

                AllocState::TrySharedCas => {
                    let pool = match core.shared_pool() {
                        Some(pool) => pool,
                        None => {
                            state = AllocState::SlowPath;
                            continue;
                        },
                    };

                    match pool.try_claim(request.size, core.shared_cas_retries()) {
                        ClaimOutcome::Claimed { offset, .. } => {
                            return Self::claimed(offset, state);
                        },
                        ClaimOutcome::Exhausted {
                            available,
                            attempts,
                        } => {
                            request.shared_attempts += attempts;
                            log::trace!(
                                "shared pool exhausted: {} bytes requested, {} available",
                                request.size,
                                available
                            );
                            if core.verbose() {
                                log_event(BarrierEvent::SharedPoolExhausted {
                                    requested: request.size,
                                    available,
                                });
                            }
                        },
                        ClaimOutcome::Contended { attempts } => {
                            request.shared_attempts += attempts;
                            log::warn!(
                                "shared pool CAS lost {} races for {} bytes",
                                attempts,
                                request.size
                            );
                        },
                    }
                    state = AllocState::SlowPath;
                },

                AllocState::SlowPath => {
                    log::trace!(
                        "allocation slow path: {} bytes after {} shared attempts",
                        request.size,
                        request.shared_attempts
                    );
                    if core.verbose() {
                        log_event(BarrierEvent::SlowPathTaken {
                            size: request.size,
                            shared_attempts: request.shared_attempts,
                        });
                    }
                    return Allocation::SlowPath(slow_path(request));
                },
            }
        }
    }

    #[inline]
    fn claimed<R>(offset: usize, state: AllocState) -> Allocation<R> {
        Allocation::Claimed {
            obj: HeapRef::from_raw(offset as u32),
            state,
        }
    }
}

/// Element loop of [`BarrierSet::array_copy`]
unsafe fn copy_elements<B: AccessBarrier>(
    barrier: &B,
    decorators: DecoratorSet,
    ty: BasicType,
    src: *mut u8,
    dst: *mut u8,
    count: usize,
) {
    let size = ty.size_in_bytes();
    let element = |index: usize| {
        let offset = index * size;
        barrier.copy_element(decorators, ty, src.wrapping_add(offset), dst.wrapping_add(offset));
    };

    let backwards = !decorators.contains(DecoratorSet::ARRAYCOPY_DISJOINT)
        && (dst as usize) > (src as usize)
        && (dst as usize) < (src as usize) + count * size;
    if backwards {
        (0..count).rev().for_each(element);
    } else {
        (0..count).for_each(element);
    }
}

impl std::fmt::Debug for BarrierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierSet")
            .field("kind", &self.kind())
            .field("heap", self.heap())
            .field("shared_pool", &self.shared_pool().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ForwardingTable, SatbRememberedSet};
    use crate::register::{T0, T1, T2, X10};

    fn config(barrier: BarrierKind) -> BarrierConfig {
        BarrierConfig {
            barrier,
            heap_size: 64 * 1024,
            ..Default::default()
        }
    }

    fn build(barrier: BarrierKind) -> BarrierSet {
        let config = config(barrier);
        let heap = Arc::new(Heap::from_config(&config).unwrap());
        let forwarding = Arc::new(ForwardingTable::new(&heap));
        let satb = Arc::new(SatbRememberedSet::new());
        let collaborators = ConcurrentCollaborators::new(forwarding, satb.clone(), satb);
        BarrierSet::from_config(&config, heap, Some(collaborators)).unwrap()
    }

    #[test]
    fn test_from_config_selects_variant() {
        for kind in [BarrierKind::Minimal, BarrierKind::CardTable, BarrierKind::Concurrent] {
            assert_eq!(build(kind).kind(), kind);
        }
    }

    #[test]
    fn test_concurrent_requires_collaborators() {
        let config = config(BarrierKind::Concurrent);
        let heap = Arc::new(Heap::from_config(&config).unwrap());
        assert!(matches!(
            BarrierSet::from_config(&config, heap, None),
            Err(BarrierError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let heap = Arc::new(Heap::new(64 * 1024, 8).unwrap());
        let bad = BarrierConfig {
            shared_cas_retries: 0,
            ..config(BarrierKind::Minimal)
        };
        assert!(matches!(
            BarrierSet::minimal(&bad, heap.clone()),
            Err(BarrierError::Configuration(_))
        ));

        let misaligned = BarrierConfig {
            object_alignment: 16,
            ..config(BarrierKind::Minimal)
        };
        assert!(matches!(
            BarrierSet::minimal(&misaligned, heap),
            Err(BarrierError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_clobber_sets() {
        let minimal = build(BarrierKind::Minimal);
        assert!(minimal.clobbers(AccessKind::Store).is_empty());
        assert_eq!(minimal.clobbers(AccessKind::Allocate), RegSet::of(&[T0, T1]));

        let cards = build(BarrierKind::CardTable);
        assert_eq!(cards.clobbers(AccessKind::Store), RegSet::of(&[T0]));
        assert!(cards.clobbers(AccessKind::Load).is_empty());

        let concurrent = build(BarrierKind::Concurrent);
        assert_eq!(concurrent.clobbers(AccessKind::ArrayCopy), RegSet::of(&[T0, T1, T2]));
        assert!(concurrent.clobbers(AccessKind::ArrayCopy).is_disjoint(RegSet::of(&[X10])));
    }

    #[test]
    fn test_card_table_only_on_generational() {
        assert!(build(BarrierKind::Minimal).card_table().is_none());
        assert!(build(BarrierKind::CardTable).card_table().is_some());

        let config = config(BarrierKind::CardTable);
        let heap = Arc::new(Heap::from_config(&config).unwrap());
        let barriers = BarrierSet::generational(&config, heap).unwrap();
        assert_eq!(barriers.kind(), BarrierKind::CardTable);
        assert!(barriers.card_table().is_some());
    }

    #[test]
    fn test_not_equals_is_negation() {
        let barriers = build(BarrierKind::Minimal);
        let a = HeapRef::from_raw(16);
        let b = HeapRef::from_raw(32);
        assert!(barriers.reference_equals(a, a));
        assert!(barriers.reference_not_equals(a, b));
    }

    #[test]
    fn test_allocate_from_tlab() {
        let barriers = build(BarrierKind::Minimal);
        let mut tlab = ThreadLocalPool::new(64, 128);
        let allocation = barriers.allocate(&mut tlab, AllocSize::Constant(16), |_| ());
        assert_eq!(
            allocation,
            Allocation::Claimed {
                obj: HeapRef::from_raw(64),
                state: AllocState::TryThreadLocal
            }
        );
        assert_eq!(tlab.top(), 80);
    }

    #[test]
    fn test_allocate_falls_back_to_shared_pool() {
        let barriers = build(BarrierKind::Minimal);
        let mut tlab = ThreadLocalPool::empty();
        let allocation = barriers.allocate(&mut tlab, AllocSize::Variable(20), |_| ());
        assert_eq!(
            allocation,
            Allocation::Claimed {
                obj: HeapRef::from_raw(8),
                state: AllocState::TrySharedCas
            }
        );
        assert_eq!(barriers.shared_pool().unwrap().used(), 24);
    }

    #[test]
    fn test_allocate_without_shared_pool_goes_slow() {
        let config = BarrierConfig {
            shared_pool_enabled: false,
            ..config(BarrierKind::Minimal)
        };
        let heap = Arc::new(Heap::from_config(&config).unwrap());
        let barriers = BarrierSet::minimal(&config, heap).unwrap();
        let mut tlab = ThreadLocalPool::new(64, 80);

        let allocation = barriers.allocate(&mut tlab, AllocSize::Constant(24), |request| request);
        assert_eq!(
            allocation,
            Allocation::SlowPath(AllocRequest {
                size: 24,
                tlab_remaining: 16,
                shared_attempts: 0
            })
        );
        assert_eq!(tlab.top(), 64);
    }

    #[test]
    fn test_zero_size_goes_slow() {
        let barriers = build(BarrierKind::Minimal);
        let mut tlab = ThreadLocalPool::new(64, 128);
        assert!(barriers
            .allocate(&mut tlab, AllocSize::Variable(0), |_| ())
            .is_slow_path());
        assert_eq!(tlab.top(), 64);
    }

    #[test]
    fn test_resolve_handle() {
        let barriers = build(BarrierKind::Minimal);
        #[repr(C, align(8))]
        struct Slot(u32, u32);
        let mut slot = Slot(0x40, 0);
        let strong = std::ptr::addr_of_mut!(slot.0).cast::<u8>();
        unsafe {
            assert_eq!(barriers.resolve_handle(std::ptr::null_mut()), HeapRef::NULL);
            assert_eq!(barriers.resolve_handle(strong), HeapRef::from_raw(0x40));
            assert_eq!(
                barriers.resolve_handle(strong.wrapping_add(WEAK_HANDLE_TAG)),
                HeapRef::from_raw(0x40)
            );
        }
    }
}
