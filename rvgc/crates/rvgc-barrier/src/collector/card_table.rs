//! Card Table
//!
//! One byte per card of `2^shift` heap bytes. A generational store barrier
//! dirties the card covering every reference field it writes; the collector
//! scans dirty cards for old-to-young pointers and cleans them.
//!
//! Cards are cleared to `CLEAN_CARD` (0xff) and dirtied to `DIRTY_CARD` (0),
//! so dirtying is a single byte store of zero.

use std::sync::atomic::{AtomicU8, Ordering};

pub const DIRTY_CARD: u8 = 0;
pub const CLEAN_CARD: u8 = 0xff;

/// Byte-per-card dirty table covering a heap arena
pub struct CardTable {
    cards: Box<[AtomicU8]>,
    shift: u32,
}

impl CardTable {
    /// Table covering `covered_bytes` of heap with cards of `2^shift` bytes
    pub fn new(covered_bytes: usize, shift: u32) -> Self {
        let count = (covered_bytes + (1 << shift) - 1) >> shift;
        let cards = (0..count).map(|_| AtomicU8::new(CLEAN_CARD)).collect();
        Self { cards, shift }
    }

    #[inline]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    #[inline]
    pub fn card_size(&self) -> usize {
        1 << self.shift
    }

    #[inline]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Index of the card covering arena offset `offset`
    #[inline]
    pub fn card_index(&self, offset: usize) -> usize {
        offset >> self.shift
    }

    /// Dirty the card covering `offset`
    ///
    /// Callers order the reference store before this with a release fence.
    #[inline]
    pub fn dirty_card(&self, offset: usize) {
        let index = self.card_index(offset);
        debug_assert!(index < self.cards.len(), "offset {:#x} past card table", offset);
        if let Some(card) = self.cards.get(index) {
            card.store(DIRTY_CARD, Ordering::Relaxed);
        }
    }

    /// Dirty every card overlapping `[start, start + len)`
    ///
    /// Returns the first card index and the number of cards dirtied.
    pub fn dirty_range(&self, start: usize, len: usize) -> (usize, usize) {
        if len == 0 {
            return (self.card_index(start), 0);
        }

        let first = self.card_index(start);
        let last = self.card_index(start + len - 1).min(self.cards.len().saturating_sub(1));
        if first > last {
            return (first, 0);
        }

        for card in &self.cards[first..=last] {
            card.store(DIRTY_CARD, Ordering::Relaxed);
        }
        (first, last - first + 1)
    }

    /// True if the card covering `offset` is dirty
    pub fn is_dirty(&self, offset: usize) -> bool {
        self.is_card_dirty(self.card_index(offset))
    }

    /// True if card `index` is dirty
    pub fn is_card_dirty(&self, index: usize) -> bool {
        self.cards
            .get(index)
            .map(|card| card.load(Ordering::Acquire) == DIRTY_CARD)
            .unwrap_or(false)
    }

    /// Indices of all dirty cards, ascending
    pub fn dirty_cards(&self) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.load(Ordering::Acquire) == DIRTY_CARD)
            .map(|(index, _)| index)
            .collect()
    }

    /// Clean card `index`
    pub fn clean_card(&self, index: usize) {
        if let Some(card) = self.cards.get(index) {
            card.store(CLEAN_CARD, Ordering::Relaxed);
        }
    }

    /// Clean every card
    pub fn clear(&self) {
        for card in self.cards.iter() {
            card.store(CLEAN_CARD, Ordering::Relaxed);
        }
    }
}
