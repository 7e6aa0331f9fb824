//! Heap Arena and Compressed References
//!
//! The managed heap is one anonymous, zero-filled mapping. Managed
//! references are 4-byte offsets from the arena base, so a reference has the
//! same width on the RV32 target and on a 64-bit host, and the shared pool
//! frontier fits the width-4 compare-and-exchange.
//!
//! Offset 0 is the null reference. The first alignment granule of the arena
//! is never handed out.

use crate::config::{BarrierConfig, MAX_HEAP_SIZE};
use crate::error::{BarrierError, Result};
use crate::util::Alignment;
use memmap2::{MmapMut, MmapOptions};
use std::fmt;

/// Compressed managed reference: arena offset, 0 = null
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HeapRef(u32);

impl HeapRef {
    pub const NULL: HeapRef = HeapRef(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        HeapRef(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("HeapRef(null)")
        } else {
            write!(f, "HeapRef({:#x})", self.0)
        }
    }
}

/// Managed heap arena
pub struct Heap {
    /// Keeps the mapping alive; all access goes through `base`
    _mapping: MmapMut,
    base: *mut u8,
    size: usize,
    alignment: usize,
}

// SAFETY: the arena is plain memory. Concurrent access to it is governed by
// the barrier layer's atomic and ordering contracts, not by this type.
unsafe impl Send for Heap {}
unsafe impl Sync for Heap {}

impl Heap {
    /// Map a zero-filled arena of at least `size` bytes
    ///
    /// # Returns
    /// * `Err(BarrierError::InvalidArgument)` - zero size, bad alignment, or
    ///   a page-rounded size a compressed reference cannot address
    /// * `Err(BarrierError::VirtualMemoryError)` - mapping failed
    pub fn new(size: usize, alignment: usize) -> Result<Self> {
        if size == 0 {
            return Err(BarrierError::InvalidArgument(
                "heap size must be > 0".to_string(),
            ));
        }

        if !alignment.is_power_of_two() {
            return Err(BarrierError::InvalidArgument(format!(
                "alignment ({}) must be a power of two",
                alignment
            )));
        }

        let size = Alignment::page_align(size);
        if size > MAX_HEAP_SIZE {
            return Err(BarrierError::InvalidArgument(format!(
                "heap size {:#x} exceeds compressed reference range",
                size
            )));
        }

        let mut mapping = MmapOptions::new().len(size).map_anon().map_err(|e| {
            BarrierError::VirtualMemoryError(format!("Failed to map heap arena: {}", e))
        })?;
        let base = mapping.as_mut_ptr();

        log::debug!("Mapped heap arena at {:p} ({} bytes)", base, size);

        Ok(Self {
            _mapping: mapping,
            base,
            size,
            alignment,
        })
    }

    /// Map the arena described by `config`
    pub fn from_config(config: &BarrierConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.heap_size, config.object_alignment)
    }

    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// Arena size in bytes, page-rounded
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// First offset that may be handed to an allocator
    #[inline]
    pub fn first_allocatable(&self) -> usize {
        self.alignment
    }

    /// True if `addr` lies inside the arena
    #[inline]
    pub fn contains(&self, addr: *const u8) -> bool {
        let addr = addr as usize;
        let base = self.base as usize;
        addr >= base && addr - base < self.size
    }

    /// Arena offset of an address inside the arena
    #[inline]
    pub fn offset_of(&self, addr: *const u8) -> Option<usize> {
        self.contains(addr)
            .then(|| addr as usize - self.base as usize)
    }

    /// Address of an arena offset
    ///
    /// The result is only dereferenceable if `offset < size()`.
    #[inline]
    pub fn address_at(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.size, "offset {:#x} past arena end", offset);
        self.base.wrapping_add(offset)
    }

    /// Compress an address; null stays null
    #[inline]
    pub fn encode(&self, addr: *const u8) -> HeapRef {
        if addr.is_null() {
            return HeapRef::NULL;
        }
        debug_assert!(self.contains(addr), "{:p} outside heap arena", addr);
        HeapRef((addr as usize - self.base as usize) as u32)
    }

    /// Expand a reference; null stays null
    #[inline]
    pub fn decode(&self, obj: HeapRef) -> *mut u8 {
        if obj.is_null() {
            return std::ptr::null_mut();
        }
        debug_assert!((obj.raw() as usize) < self.size, "{:?} outside heap arena", obj);
        self.base.wrapping_add(obj.raw() as usize)
    }

    /// Address of the field at `offset` bytes into `obj`
    #[inline]
    pub fn field_addr(&self, obj: HeapRef, offset: usize) -> *mut u8 {
        debug_assert!(!obj.is_null(), "field access through null reference");
        self.address_at(obj.raw() as usize + offset)
    }

    /// Address of element `index` of an array whose elements start at
    /// `base_offset` bytes into `array`
    #[inline]
    pub fn element_addr(
        &self,
        array: HeapRef,
        base_offset: usize,
        index: usize,
        element_size: usize,
    ) -> *mut u8 {
        self.field_addr(array, base_offset + index * element_size)
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .finish()
    }
}
