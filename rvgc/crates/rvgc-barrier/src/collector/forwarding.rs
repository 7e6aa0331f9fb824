//! Forwarding Table - Relocation Map
//!
//! Maps the old location of a relocated object to its new location. The
//! relocating collector inserts entries; concurrent load barriers look them
//! up and heal the slot they loaded from.
//!
//! Usage:
//! 1. Insert an entry when an object is copied
//! 2. Load barriers resolve through the table
//! 3. Clear once every slot has been healed or remapped

use super::ReferenceResolver;
use crate::error::{BarrierError, Result};
use crate::heap::{Heap, HeapRef};
use indexmap::IndexMap;
use parking_lot::RwLock;

/// ForwardingTable - old reference to new reference
pub struct ForwardingTable {
    /// Forwarding entries: old -> new
    entries: RwLock<IndexMap<HeapRef, HeapRef>>,

    /// Arena size; both sides of an entry must lie below it
    limit: usize,

    /// Object alignment; both sides of an entry must be aligned
    alignment: usize,
}

impl ForwardingTable {
    /// Table for references into `heap`
    pub fn new(heap: &Heap) -> Self {
        Self::with_bounds(heap.size(), heap.alignment())
    }

    /// Table for references below `limit` aligned to `alignment`
    pub fn with_bounds(limit: usize, alignment: usize) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            limit,
            alignment,
        }
    }

    fn validate(&self, which: &str, obj: HeapRef) -> Result<()> {
        if obj.is_null() {
            log::error!("Forwarding entry rejected: {} reference is null", which);
            return Err(BarrierError::InvalidArgument(format!(
                "forwarding {} reference is null",
                which
            )));
        }

        let offset = obj.raw() as usize;
        if offset >= self.limit {
            log::error!(
                "Forwarding entry rejected: {} {:?} outside arena of {} bytes",
                which,
                obj,
                self.limit
            );
            return Err(BarrierError::InvalidArgument(format!(
                "forwarding {} reference {:#x} outside arena",
                which, offset
            )));
        }

        if offset % self.alignment != 0 {
            log::error!(
                "Forwarding entry rejected: {} {:?} not aligned to {}",
                which,
                obj,
                self.alignment
            );
            return Err(BarrierError::AlignmentError {
                address: offset,
                alignment: self.alignment,
            });
        }

        Ok(())
    }

    /// Add forwarding entry
    ///
    /// Thread-safe. A later entry for the same `from` replaces the earlier.
    ///
    /// # Validation
    /// - neither side may be null
    /// - both sides must be inside the arena and aligned
    /// - `from` and `to` must differ
    pub fn insert(&self, from: HeapRef, to: HeapRef) -> Result<()> {
        self.validate("old", from)?;
        self.validate("new", to)?;

        if from == to {
            log::error!("Forwarding entry rejected: {:?} forwards to itself", from);
            return Err(BarrierError::InvalidArgument(format!(
                "reference {:#x} forwards to itself",
                from.raw()
            )));
        }

        self.entries.write().insert(from, to);
        Ok(())
    }

    /// Direct forwarding of `from`, without following chains
    pub fn lookup(&self, from: HeapRef) -> Option<HeapRef> {
        self.entries.read().get(&from).copied()
    }

    /// Remove the entry for `from`
    pub fn remove(&self, from: HeapRef) -> Option<HeapRef> {
        self.entries.write().shift_remove(&from)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<(HeapRef, HeapRef)> {
        self.entries
            .read()
            .iter()
            .map(|(from, to)| (*from, *to))
            .collect()
    }
}

impl ReferenceResolver for ForwardingTable {
    /// Follows forwarding chains to the final location
    ///
    /// A cycle is broken after visiting every entry once.
    fn resolve(&self, obj: HeapRef) -> HeapRef {
        if obj.is_null() {
            return obj;
        }

        let entries = self.entries.read();
        let mut current = obj;
        for _ in 0..entries.len() {
            match entries.get(&current) {
                Some(&next) => current = next,
                None => break,
            }
        }
        current
    }
}
