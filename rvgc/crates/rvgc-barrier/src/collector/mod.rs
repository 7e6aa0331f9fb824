//! Collector Collaborators
//!
//! The barrier layer decides when collector bookkeeping happens and in what
//! order relative to the access. What the bookkeeping records is the
//! collector's business, expressed through three traits:
//!
//! - [`ReferenceResolver`]: where does a possibly-relocated reference live now
//! - [`MarkingState`]: is concurrent marking running
//! - [`WriteRecorder`]: take note of overwritten values and written fields
//!
//! Implementations are called concurrently from every mutator thread and
//! carry their own synchronization.
//!
//! Concrete collaborators provided here:
//! - [`ForwardingTable`]: relocation map, resolver
//! - [`CardTable`]: byte-per-card dirty table for generational barriers
//! - [`SatbRememberedSet`]: marking flag plus lock-free pre-value and
//!   remembered-set queues

pub mod card_table;
pub mod forwarding;
pub mod satb;

pub use card_table::{CardTable, CLEAN_CARD, DIRTY_CARD};
pub use forwarding::ForwardingTable;
pub use satb::SatbRememberedSet;

use crate::heap::HeapRef;

/// Maps a reference to the current location of its object
pub trait ReferenceResolver: Send + Sync {
    /// Current location of `obj`; `obj` itself if it has not moved
    fn resolve(&self, obj: HeapRef) -> HeapRef;
}

/// Reports whether concurrent marking is in progress
pub trait MarkingState: Send + Sync {
    fn is_marking(&self) -> bool;
}

/// Receives barrier bookkeeping
///
/// Field positions are arena offsets.
pub trait WriteRecorder: Send + Sync {
    /// A reference about to be overwritten while marking
    fn record_pre_value(&self, previous: HeapRef);

    /// A reference field that was written
    fn record_field(&self, field: usize);

    /// `count` contiguous reference slots starting at `start` were written
    fn record_range(&self, start: usize, count: usize);
}
