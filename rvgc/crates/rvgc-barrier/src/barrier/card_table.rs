//! Card Table Barrier - Generational Post-Write Barrier
//!
//! A reference store into the heap dirties the card covering the field, so
//! a young collection can find old-to-young pointers by scanning dirty cards
//! instead of the whole old generation.
//!
//! ```text
//! store(field, value):
//!     *field = value
//!     release_fence()
//!     cards[field >> card_shift] = DIRTY
//! ```
//!
//! The release fence keeps a collector thread that sees the dirty card from
//! missing the reference that dirtied it. Array copies dirty every card of
//! the destination once, after the whole copy, behind a single fence.

use super::{raw, AccessBarrier, AccessKind, BarrierCore};
use crate::collector::CardTable;
use crate::decorators::{BasicType, DecoratorSet, Value};
use crate::logging::{log_event, BarrierEvent};
use crate::register::{RegSet, T0, T1};
use crate::util::constants::HEAP_REF_SIZE;
use rvgc_atomic::release_fence;
use std::sync::Arc;

pub struct CardTableBarrier {
    core: BarrierCore,
    cards: Arc<CardTable>,
}

impl CardTableBarrier {
    /// Barrier over `core` dirtying a table sized for its heap
    pub fn new(core: BarrierCore, card_shift: u32) -> Self {
        let cards = Arc::new(CardTable::new(core.heap().size(), card_shift));
        Self::with_table(core, cards)
    }

    /// Barrier over `core` dirtying an existing table
    pub fn with_table(core: BarrierCore, cards: Arc<CardTable>) -> Self {
        debug_assert!(
            cards.card_count() << cards.shift() >= core.heap().size(),
            "card table does not cover the heap"
        );
        Self { core, cards }
    }

    pub fn card_table(&self) -> &Arc<CardTable> {
        &self.cards
    }
}

impl AccessBarrier for CardTableBarrier {
    fn core(&self) -> &BarrierCore {
        &self.core
    }

    fn clobbers(&self, kind: AccessKind) -> RegSet {
        match kind {
            AccessKind::Load | AccessKind::Equals => RegSet::EMPTY,
            AccessKind::Store => RegSet::of(&[T0]),
            AccessKind::ArrayCopy | AccessKind::Allocate => RegSet::of(&[T0, T1]),
        }
    }

    unsafe fn store(&self, decorators: DecoratorSet, ty: BasicType, dst: *mut u8, value: Value) {
        raw::store(decorators, dst, value);

        if !ty.is_reference() || !decorators.is_in_heap() {
            return;
        }

        if let Some(offset) = self.core.heap().offset_of(dst) {
            release_fence();
            self.cards.dirty_card(offset);
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

        let Some(start) = self.core.heap().offset_of(dst) else {
            return;
        };

        release_fence();
        let (first_card, dirtied) = self.cards.dirty_range(start, count * HEAP_REF_SIZE);

        log::trace!(
            "array copy of {} references at {:#x} dirtied {} cards",
            count,
            start,
            dirtied
        );
        if self.core.verbose() {
            log_event(BarrierEvent::CardsDirtied {
                first_card,
                count: dirtied,
            });
        }
    }
}
