//! # rvgc-atomic - Platform Atomic Operations for RV32
//!
//! A uniform, width-polymorphic atomic layer for a 32-bit RISC-V target whose
//! only read-modify-write primitive is the 4-byte `lr.w`/`sc.w` pair.
//!
//! ## Overview
//!
//! | Width | add / exchange / compare-and-exchange  | load / store            |
//! |-------|----------------------------------------|-------------------------|
//! | 1, 2  | masked LR/SC loop on containing word   | word load / lane xchg   |
//! | 4     | native intrinsic / LR/SC loop          | native                  |
//! | 8     | not provided (compile error)           | coherent 8-byte copy    |
//!
//! Each read-modify-write takes an [`AtomicOrder`]. `Relaxed` never emits a
//! fence; stronger orders surround the primitive with fences of at least the
//! named strength (see [`order`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use rvgc_atomic::{add_and_fetch, compare_and_exchange, exchange, AtomicOrder};
//!
//! let mut counter = 0u32;
//! unsafe {
//!     assert_eq!(add_and_fetch(5, &mut counter, AtomicOrder::SeqCst), 5);
//!     assert_eq!(exchange(9, &mut counter, AtomicOrder::AcqRel), 5);
//!     assert_eq!(compare_and_exchange(9, 1, &mut counter, AtomicOrder::Relaxed), 9);
//! }
//! assert_eq!(counter, 1);
//! ```
//!
//! ## Safety
//!
//! The operations take raw locations because they stand in for code a
//! generator emits at arbitrary call sites. Every location must be valid,
//! naturally aligned, and (for 1 and 2 byte operands) sit in a 4-byte word
//! that is only ever accessed through this crate. Misuse is undefined
//! behavior, never a returned error.
//!
//! ## Modules
//!
//! - [`order`]: memory ordering modes and their fence policy
//! - [`fence`]: full, acquire and release fences
//! - [`operand`]: operand widths and the sealed operand traits
//! - [`ops`]: add, exchange, compare-and-exchange, load, store
//! - [`wide`]: coherent 8-byte load and store

pub mod fence;
pub mod operand;
pub mod ops;
pub mod order;
pub mod wide;

mod platform;
mod subword;

pub use fence::{acquire_fence, full_fence, release_fence};
pub use operand::{AtomicOperand, WideOperand, Width};
pub use ops::{
    add_and_fetch, atomic_load, atomic_store, compare_and_exchange, exchange, fetch_and_add,
    sub_and_fetch,
};
pub use order::{AtomicOrder, FenceKind};
pub use wide::{atomic_load_8, atomic_store_8, Copy64, DefaultCopy64, StripedCopy64};

/// rvgc-atomic version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
