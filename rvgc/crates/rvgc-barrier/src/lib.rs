//! # rvgc-barrier - Collector Barrier Dispatch for RV32 Runtimes
//!
//! The hooks a code generator calls around every managed-memory access, so
//! collector bookkeeping stays consistent with collector threads running
//! at the same time as mutators.
//!
//! ## Overview
//!
//! - **Barrier Set**: one of a closed set of variants (minimal, card table,
//!   concurrent), chosen once at startup and shared read-only afterwards
//! - **Typed Access**: loads and stores of every basic type, atomic where the
//!   access decorators ask for a memory order
//! - **Array Copy Hooks**: pre/post hooks that batch bookkeeping for a whole
//!   destination range
//! - **Allocation Fast Path**: TLAB bump, then a CAS claim on the shared pool,
//!   then the caller's slow path
//! - **Compressed References**: 4-byte arena offsets, so the shared pool
//!   frontier and every reference slot fit the width-4 compare-and-exchange
//!
//! ## Quick Start
//!
//! ```rust
//! use rvgc_barrier::{
//!     AllocSize, BarrierConfig, BarrierKind, BasicType, DecoratorSet, ThreadLocalPool, Value,
//! };
//!
//! fn main() -> Result<(), rvgc_barrier::BarrierError> {
//!     let config = BarrierConfig {
//!         barrier: BarrierKind::CardTable,
//!         heap_size: 1 << 20,
//!         ..Default::default()
//!     };
//!     let barriers = rvgc_barrier::init(&config, None)?;
//!
//!     // Allocate two objects straight from the shared pool
//!     let mut tlab = ThreadLocalPool::empty();
//!     let holder = barriers.allocate(&mut tlab, AllocSize::Constant(16), |_| ()).claimed();
//!     let target = barriers.allocate(&mut tlab, AllocSize::Constant(16), |_| ()).claimed();
//!     let (holder, target) = (holder.unwrap(), target.unwrap());
//!
//!     // Store a reference into the holder's first field
//!     let field = barriers.heap().field_addr(holder, 0);
//!     unsafe {
//!         barriers.store(DecoratorSet::IN_HEAP, BasicType::Object, field, Value::Reference(target));
//!     }
//!
//!     let offset = barriers.heap().offset_of(field).unwrap();
//!     assert!(barriers.card_table().unwrap().is_dirty(offset));
//!     Ok(())
//! }
//! ```
//!
//! ## Barrier Variants
//!
//! | Variant    | Load                   | Store                         | Array copy           |
//! |------------|------------------------|-------------------------------|----------------------|
//! | Minimal    | raw                    | raw                           | none                 |
//! | CardTable  | raw                    | raw, fence, dirty card        | dirty range once     |
//! | Concurrent | resolve, heal slot     | SATB pre-value, raw, record   | snapshot, record     |
//!
//! ## Safety
//!
//! Barrier entry points take raw addresses because they stand in for code
//! emitted at arbitrary access sites. Callers must pass valid, naturally
//! aligned addresses, and must access reference slots only through barriers
//! or `rvgc-atomic`: a concurrent load barrier may heal any slot with a
//! compare-and-exchange.
//!
//! ## Modules
//!
//! - [`allocator`]: thread-local and shared bump pointer pools
//! - [`barrier`]: barrier set dispatch and the variants
//! - [`collector`]: collector collaborator traits and provided structures
//! - [`config`]: barrier configuration and validation
//! - [`decorators`]: access decorators, basic types and typed values
//! - [`error`]: error types
//! - [`heap`]: heap arena and compressed references
//! - [`logging`]: structured barrier events
//! - [`register`]: machine registers and clobber sets
//! - [`util`]: alignment helpers and constants

// Configuration and errors
pub mod config;
pub mod error;
pub mod logging;

// Memory
pub mod allocator;
pub mod heap;

// Barrier layer
pub mod barrier;
pub mod collector;
pub mod decorators;
pub mod register;

// Utilities
pub mod util;

pub use allocator::{
    AllocRequest, AllocSize, AllocState, Allocation, ClaimOutcome, SharedPool, ThreadLocalPool,
};
pub use barrier::{AccessKind, BarrierSet, ConcurrentCollaborators};
pub use collector::{
    CardTable, ForwardingTable, MarkingState, ReferenceResolver, SatbRememberedSet, WriteRecorder,
};
pub use config::{BarrierConfig, BarrierKind, ConfigError};
pub use decorators::{BasicType, DecoratorSet, Value};
pub use error::{BarrierError, Result};
pub use heap::{Heap, HeapRef};
pub use register::{RegSet, Register};

use std::sync::Arc;

/// rvgc-barrier version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Map a heap for `config` and build its barrier set
///
/// `collaborators` are required for [`BarrierKind::Concurrent`].
///
/// # Examples
///
/// ```rust
/// let barriers = rvgc_barrier::init(&rvgc_barrier::BarrierConfig::default(), None)?;
/// assert_eq!(barriers.kind(), rvgc_barrier::BarrierKind::CardTable);
/// # Ok::<(), rvgc_barrier::BarrierError>(())
/// ```
pub fn init(
    config: &BarrierConfig,
    collaborators: Option<ConcurrentCollaborators>,
) -> Result<BarrierSet> {
    let heap = Arc::new(Heap::from_config(config)?);
    BarrierSet::from_config(config, heap, collaborators)
}
