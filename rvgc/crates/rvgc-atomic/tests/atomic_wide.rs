//! 8-byte Coherence Tests
//!
//! A writer alternates between two patterns whose halves differ; readers
//! must only ever see one of the two patterns.

mod common;

use common::{run_workers, SharedCells};
use rvgc_atomic::wide::{atomic_load_8_with, atomic_store_8_with};
use rvgc_atomic::{atomic_load_8, atomic_store_8, StripedCopy64};
use std::sync::Arc;

const PATTERN_A: u64 = 0x1111_1111_2222_2222;
const PATTERN_B: u64 = 0xaaaa_aaaa_bbbb_bbbb;
const ROUNDS: usize = 20_000;

/// **Bug this finds:** Torn 8-byte read on a target without a native
/// 64-bit atomic (half old, half new)
#[test]
fn test_default_copier_never_tears() {
    let cells = SharedCells::zeroed();
    unsafe { atomic_store_8(PATTERN_A, cells.wide()) };
    let shared = cells.clone();

    let torn = run_workers(3, move |index| {
        let mut torn = 0usize;
        for round in 0..ROUNDS {
            if index == 0 {
                let next = if round % 2 == 0 { PATTERN_B } else { PATTERN_A };
                unsafe { atomic_store_8(next, shared.wide()) };
            } else {
                let seen: u64 = unsafe { atomic_load_8(shared.wide()) };
                if seen != PATTERN_A && seen != PATTERN_B {
                    torn += 1;
                }
            }
        }
        torn
    });

    assert_eq!(torn.iter().sum::<usize>(), 0, "observed a torn 8-byte value");
}

/// Same property with the lock-striped copier forced on
#[test]
fn test_striped_copier_never_tears() {
    let copier = Arc::new(StripedCopy64::new());
    let cells = SharedCells::zeroed();
    unsafe { atomic_store_8_with(&*copier, PATTERN_A, cells.wide()) };
    let shared = cells.clone();

    let torn = run_workers(3, move |index| {
        let mut torn = 0usize;
        for round in 0..ROUNDS {
            if index == 0 {
                let next = if round % 2 == 0 { PATTERN_B } else { PATTERN_A };
                unsafe { atomic_store_8_with(&*copier, next, shared.wide()) };
            } else {
                let seen: u64 = unsafe { atomic_load_8_with(&*copier, shared.wide()) };
                if seen != PATTERN_A && seen != PATTERN_B {
                    torn += 1;
                }
            }
        }
        torn
    });

    assert_eq!(torn.iter().sum::<usize>(), 0, "observed a torn 8-byte value");
}

/// A signed 8-byte value survives a store and load
#[test]
fn test_signed_wide_value() {
    let cells = SharedCells::zeroed();
    let loc = cells.wide().cast::<i64>();
    unsafe {
        atomic_store_8(i64::MIN + 7, loc);
        assert_eq!(atomic_load_8::<i64>(loc), i64::MIN + 7);
    }
}
