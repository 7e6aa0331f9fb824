//! Access-site metadata
//!
//! Every barrier entry point receives a [`DecoratorSet`] describing the
//! access and a [`BasicType`] naming the value's type. Barrier behavior is a
//! pure function of these, the operand width and the access kind.

use crate::heap::HeapRef;
use rvgc_atomic::AtomicOrder;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};

/// Bitmask of access-site flags
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DecoratorSet(u32);

impl DecoratorSet {
    pub const NONE: DecoratorSet = DecoratorSet(0);

    // Location
    pub const IN_HEAP: DecoratorSet = DecoratorSet(1 << 0);
    pub const IN_NATIVE: DecoratorSet = DecoratorSet(1 << 1);

    // Access shape
    pub const IS_ARRAY: DecoratorSet = DecoratorSet(1 << 2);
    pub const IS_DEST_UNINITIALIZED: DecoratorSet = DecoratorSet(1 << 3);
    pub const IS_NOT_NULL: DecoratorSet = DecoratorSet(1 << 4);

    // Reference strength
    pub const AS_NO_KEEPALIVE: DecoratorSet = DecoratorSet(1 << 5);
    pub const ON_STRONG_OOP_REF: DecoratorSet = DecoratorSet(1 << 6);
    pub const ON_WEAK_OOP_REF: DecoratorSet = DecoratorSet(1 << 7);

    // Memory ordering
    pub const MO_UNORDERED: DecoratorSet = DecoratorSet(1 << 8);
    pub const MO_RELAXED: DecoratorSet = DecoratorSet(1 << 9);
    pub const MO_ACQUIRE: DecoratorSet = DecoratorSet(1 << 10);
    pub const MO_RELEASE: DecoratorSet = DecoratorSet(1 << 11);
    pub const MO_SEQ_CST: DecoratorSet = DecoratorSet(1 << 12);

    // Array copy
    pub const ARRAYCOPY_CHECKCAST: DecoratorSet = DecoratorSet(1 << 13);
    pub const ARRAYCOPY_DISJOINT: DecoratorSet = DecoratorSet(1 << 14);

    const LOCATION_MASK: u32 = Self::IN_HEAP.0 | Self::IN_NATIVE.0;
    const STRENGTH_MASK: u32 = Self::ON_STRONG_OOP_REF.0 | Self::ON_WEAK_OOP_REF.0;
    const ORDER_MASK: u32 = Self::MO_UNORDERED.0
        | Self::MO_RELAXED.0
        | Self::MO_ACQUIRE.0
        | Self::MO_RELEASE.0
        | Self::MO_SEQ_CST.0;

    const NAMES: [(DecoratorSet, &'static str); 15] = [
        (Self::IN_HEAP, "IN_HEAP"),
        (Self::IN_NATIVE, "IN_NATIVE"),
        (Self::IS_ARRAY, "IS_ARRAY"),
        (Self::IS_DEST_UNINITIALIZED, "IS_DEST_UNINITIALIZED"),
        (Self::IS_NOT_NULL, "IS_NOT_NULL"),
        (Self::AS_NO_KEEPALIVE, "AS_NO_KEEPALIVE"),
        (Self::ON_STRONG_OOP_REF, "ON_STRONG_OOP_REF"),
        (Self::ON_WEAK_OOP_REF, "ON_WEAK_OOP_REF"),
        (Self::MO_UNORDERED, "MO_UNORDERED"),
        (Self::MO_RELAXED, "MO_RELAXED"),
        (Self::MO_ACQUIRE, "MO_ACQUIRE"),
        (Self::MO_RELEASE, "MO_RELEASE"),
        (Self::MO_SEQ_CST, "MO_SEQ_CST"),
        (Self::ARRAYCOPY_CHECKCAST, "ARRAYCOPY_CHECKCAST"),
        (Self::ARRAYCOPY_DISJOINT, "ARRAYCOPY_DISJOINT"),
    ];

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        DecoratorSet(bits)
    }

    #[inline]
    pub const fn union(self, other: DecoratorSet) -> DecoratorSet {
        DecoratorSet(self.0 | other.0)
    }

    /// True if every flag of `other` is set
    #[inline]
    pub const fn contains(self, other: DecoratorSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag of `other` is set
    #[inline]
    pub const fn intersects(self, other: DecoratorSet) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Fill in the location, strength and ordering a site left unspecified
    ///
    /// Unspecified location is the heap, strength is strong, ordering is
    /// unordered.
    pub const fn with_defaults(self) -> DecoratorSet {
        let mut bits = self.0;
        if bits & Self::LOCATION_MASK == 0 {
            bits |= Self::IN_HEAP.0;
        }
        if bits & Self::STRENGTH_MASK == 0 {
            bits |= Self::ON_STRONG_OOP_REF.0;
        }
        if bits & Self::ORDER_MASK == 0 {
            bits |= Self::MO_UNORDERED.0;
        }
        DecoratorSet(bits)
    }

    /// Atomic ordering this access needs, None for a plain access
    ///
    /// The strongest ordering flag wins.
    pub const fn memory_order(self) -> Option<AtomicOrder> {
        if self.0 & Self::MO_SEQ_CST.0 != 0 {
            Some(AtomicOrder::SeqCst)
        } else if self.0 & Self::MO_ACQUIRE.0 != 0 && self.0 & Self::MO_RELEASE.0 != 0 {
            Some(AtomicOrder::AcqRel)
        } else if self.0 & Self::MO_ACQUIRE.0 != 0 {
            Some(AtomicOrder::Acquire)
        } else if self.0 & Self::MO_RELEASE.0 != 0 {
            Some(AtomicOrder::Release)
        } else if self.0 & Self::MO_RELAXED.0 != 0 {
            Some(AtomicOrder::Relaxed)
        } else {
            None
        }
    }

    /// True if the access must be atomic
    #[inline]
    pub const fn is_volatile(self) -> bool {
        self.memory_order().is_some()
    }

    #[inline]
    pub const fn is_in_heap(self) -> bool {
        !self.intersects(Self::IN_NATIVE)
    }

    #[inline]
    pub const fn is_array(self) -> bool {
        self.intersects(Self::IS_ARRAY)
    }

    #[inline]
    pub const fn is_dest_uninitialized(self) -> bool {
        self.intersects(Self::IS_DEST_UNINITIALIZED)
    }

    #[inline]
    pub const fn is_not_null(self) -> bool {
        self.intersects(Self::IS_NOT_NULL)
    }

    /// True if the loaded referent must not be kept alive by the load
    #[inline]
    pub const fn is_weak(self) -> bool {
        self.intersects(Self::ON_WEAK_OOP_REF) || self.intersects(Self::AS_NO_KEEPALIVE)
    }
}

impl BitOr for DecoratorSet {
    type Output = DecoratorSet;

    fn bitor(self, rhs: DecoratorSet) -> DecoratorSet {
        self.union(rhs)
    }
}

impl BitOrAssign for DecoratorSet {
    fn bitor_assign(&mut self, rhs: DecoratorSet) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DecoratorSet {
    type Output = DecoratorSet;

    fn bitand(self, rhs: DecoratorSet) -> DecoratorSet {
        DecoratorSet(self.0 & rhs.0)
    }
}

impl Sub for DecoratorSet {
    type Output = DecoratorSet;

    fn sub(self, rhs: DecoratorSet) -> DecoratorSet {
        DecoratorSet(self.0 & !rhs.0)
    }
}

impl fmt::Debug for DecoratorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

/// Type of a value moved by a barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
    Object,
    Array,
    Address,
}

impl BasicType {
    /// Size of a slot of this type
    ///
    /// References are 4-byte compressed; addresses are pointer-sized.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            BasicType::Boolean | BasicType::Byte => 1,
            BasicType::Char | BasicType::Short => 2,
            BasicType::Int | BasicType::Float | BasicType::Object | BasicType::Array => 4,
            BasicType::Long | BasicType::Double => 8,
            BasicType::Address => std::mem::size_of::<usize>(),
        }
    }

    /// True for managed reference types
    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(self, BasicType::Object | BasicType::Array)
    }
}

/// Typed value loaded or stored by a barrier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Reference(HeapRef),
    Address(usize),
}

impl Value {
    /// Type of this value; references report `Object`
    pub const fn basic_type(&self) -> BasicType {
        match self {
            Value::Boolean(_) => BasicType::Boolean,
            Value::Byte(_) => BasicType::Byte,
            Value::Char(_) => BasicType::Char,
            Value::Short(_) => BasicType::Short,
            Value::Int(_) => BasicType::Int,
            Value::Float(_) => BasicType::Float,
            Value::Long(_) => BasicType::Long,
            Value::Double(_) => BasicType::Double,
            Value::Reference(_) => BasicType::Object,
            Value::Address(_) => BasicType::Address,
        }
    }

    /// True if this value can be stored into a slot of type `ty`
    pub fn fits(&self, ty: BasicType) -> bool {
        match self {
            Value::Reference(_) => ty.is_reference(),
            _ => self.basic_type() == ty,
        }
    }

    pub const fn as_reference(&self) -> Option<HeapRef> {
        match self {
            Value::Reference(obj) => Some(*obj),
            _ => None,
        }
    }
}

impl From<HeapRef> for Value {
    fn from(obj: HeapRef) -> Self {
        Value::Reference(obj)
    }
}
