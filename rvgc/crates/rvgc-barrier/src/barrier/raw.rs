//! Raw typed access
//!
//! The access every barrier variant performs before or after its own
//! bookkeeping. Ordered accesses (decorators carrying a memory order) go
//! through `rvgc-atomic`; plain accesses are volatile reads and writes,
//! except 4-byte slots, which are always accessed atomically because a
//! concurrent load barrier may heal them with a compare-and-exchange.

use crate::decorators::{BasicType, DecoratorSet, Value};
use crate::heap::HeapRef;
use rvgc_atomic::{atomic_load, atomic_load_8, atomic_store, atomic_store_8, AtomicOrder};

/// Bit pattern of a value, by width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bits {
    B1(u8),
    B2(u16),
    B4(u32),
    B8(u64),
}

fn to_bits(value: Value) -> Bits {
    match value {
        Value::Boolean(v) => Bits::B1(v as u8),
        Value::Byte(v) => Bits::B1(v as u8),
        Value::Char(v) => Bits::B2(v),
        Value::Short(v) => Bits::B2(v as u16),
        Value::Int(v) => Bits::B4(v as u32),
        Value::Float(v) => Bits::B4(v.to_bits()),
        Value::Long(v) => Bits::B8(v as u64),
        Value::Double(v) => Bits::B8(v.to_bits()),
        Value::Reference(obj) => Bits::B4(obj.raw()),
        Value::Address(v) if std::mem::size_of::<usize>() == 4 => Bits::B4(v as u32),
        Value::Address(v) => Bits::B8(v as u64),
    }
}

fn from_bits(ty: BasicType, bits: Bits) -> Value {
    match (ty, bits) {
        (BasicType::Boolean, Bits::B1(v)) => Value::Boolean(v & 1 != 0),
        (BasicType::Byte, Bits::B1(v)) => Value::Byte(v as i8),
        (BasicType::Char, Bits::B2(v)) => Value::Char(v),
        (BasicType::Short, Bits::B2(v)) => Value::Short(v as i16),
        (BasicType::Int, Bits::B4(v)) => Value::Int(v as i32),
        (BasicType::Float, Bits::B4(v)) => Value::Float(f32::from_bits(v)),
        (BasicType::Long, Bits::B8(v)) => Value::Long(v as i64),
        (BasicType::Double, Bits::B8(v)) => Value::Double(f64::from_bits(v)),
        (BasicType::Object | BasicType::Array, Bits::B4(v)) => Value::Reference(HeapRef::from_raw(v)),
        (BasicType::Address, Bits::B4(v)) => Value::Address(v as usize),
        (BasicType::Address, Bits::B8(v)) => Value::Address(v as usize),
        (ty, bits) => unreachable!("{:?} loaded as {:?}", ty, bits),
    }
}

/// Load a value of type `ty` from `src`
///
/// # Safety
/// `src` must be valid for reads of `ty.size_in_bytes()` bytes and
/// naturally aligned. A 1 or 2 byte ordered access additionally needs its
/// containing 4-byte word to be accessed only atomically.
pub unsafe fn load(decorators: DecoratorSet, ty: BasicType, src: *mut u8) -> Value {
    let order = decorators.memory_order();
    let bits = match (ty.size_in_bytes(), order) {
        (1, None) => Bits::B1(src.read_volatile()),
        (1, Some(order)) => Bits::B1(atomic_load(src, order)),
        (2, None) => Bits::B2(src.cast::<u16>().read_volatile()),
        (2, Some(order)) => Bits::B2(atomic_load(src.cast::<u16>(), order)),
        (4, order) => Bits::B4(atomic_load(src.cast::<u32>(), order.unwrap_or(AtomicOrder::Relaxed))),
        (_, None) => Bits::B8(src.cast::<u64>().read_volatile()),
        (_, Some(order)) => {
            order.leading_fence().emit();
            let value = atomic_load_8::<u64>(src.cast());
            order.trailing_fence().emit();
            Bits::B8(value)
        },
    };
    from_bits(ty, bits)
}

/// Store `value` to `dst`
///
/// # Safety
/// As for [`load`], for writes.
pub unsafe fn store(decorators: DecoratorSet, dst: *mut u8, value: Value) {
    let order = decorators.memory_order();
    match (to_bits(value), order) {
        (Bits::B1(v), None) => dst.write_volatile(v),
        (Bits::B1(v), Some(order)) => atomic_store(v, dst, order),
        (Bits::B2(v), None) => dst.cast::<u16>().write_volatile(v),
        (Bits::B2(v), Some(order)) => atomic_store(v, dst.cast::<u16>(), order),
        (Bits::B4(v), order) => {
            atomic_store(v, dst.cast::<u32>(), order.unwrap_or(AtomicOrder::Relaxed))
        },
        (Bits::B8(v), None) => dst.cast::<u64>().write_volatile(v),
        (Bits::B8(v), Some(order)) => {
            order.leading_fence().emit();
            atomic_store_8(v, dst.cast::<u64>());
            order.trailing_fence().emit();
        },
    }
}

/// Load a reference slot
///
/// # Safety
/// `src` must be a valid, 4-byte aligned reference slot.
#[inline]
pub unsafe fn load_reference(decorators: DecoratorSet, src: *mut u8) -> HeapRef {
    let order = decorators.memory_order().unwrap_or(AtomicOrder::Relaxed);
    HeapRef::from_raw(atomic_load(src.cast::<u32>(), order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(8))]
    struct Slots([u8; 16]);

    #[test]
    fn test_plain_round_trip_every_type() {
        let mut slots = Slots([0; 16]);
        let base = slots.0.as_mut_ptr();
        let cases = [
            (BasicType::Boolean, Value::Boolean(true)),
            (BasicType::Byte, Value::Byte(-3)),
            (BasicType::Char, Value::Char(0xbeef)),
            (BasicType::Short, Value::Short(-300)),
            (BasicType::Int, Value::Int(-70_000)),
            (BasicType::Float, Value::Float(1.5)),
            (BasicType::Long, Value::Long(-5_000_000_000)),
            (BasicType::Double, Value::Double(-2.25)),
            (BasicType::Object, Value::Reference(HeapRef::from_raw(0x40))),
            (BasicType::Address, Value::Address(0x1000)),
        ];
        for (ty, value) in cases {
            unsafe {
                store(DecoratorSet::NONE, base, value);
                assert_eq!(load(DecoratorSet::NONE, ty, base), value, "{:?}", ty);
            }
        }
    }

    #[test]
    fn test_ordered_round_trip() {
        let mut slots = Slots([0; 16]);
        let base = slots.0.as_mut_ptr();
        let ordered = DecoratorSet::MO_SEQ_CST;
        unsafe {
            store(ordered, base.wrapping_add(1), Value::Byte(7));
            store(ordered, base.wrapping_add(2), Value::Char(9));
            store(DecoratorSet::MO_RELEASE, base.wrapping_add(8), Value::Double(4.0));
            assert_eq!(load(ordered, BasicType::Byte, base.wrapping_add(1)), Value::Byte(7));
            assert_eq!(load(ordered, BasicType::Char, base.wrapping_add(2)), Value::Char(9));
            assert_eq!(
                load(DecoratorSet::MO_ACQUIRE, BasicType::Double, base.wrapping_add(8)),
                Value::Double(4.0)
            );
        }
        assert_eq!(slots.0[0], 0);
        assert_eq!(slots.0[3], 0);
    }

    #[test]
    fn test_seq_cst_wide_round_trip() {
        let mut slots = Slots([0; 16]);
        let wide = slots.0.as_mut_ptr().wrapping_add(8);
        unsafe {
            store(DecoratorSet::MO_SEQ_CST, wide, Value::Long(-1));
            assert_eq!(load(DecoratorSet::MO_SEQ_CST, BasicType::Long, wide), Value::Long(-1));
            store(DecoratorSet::MO_SEQ_CST, wide, Value::Double(0.25));
            assert_eq!(load(DecoratorSet::MO_SEQ_CST, BasicType::Double, wide), Value::Double(0.25));
        }
        assert_eq!(&slots.0[..8], &[0; 8]);
    }

    #[test]
    fn test_boolean_normalized() {
        let mut slots = Slots([0; 16]);
        slots.0[0] = 0x03;
        let value = unsafe { load(DecoratorSet::NONE, BasicType::Boolean, slots.0.as_mut_ptr()) };
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn test_load_reference() {
        let mut slots = Slots([0; 16]);
        unsafe {
            store(DecoratorSet::NONE, slots.0.as_mut_ptr().wrapping_add(4), Value::Reference(HeapRef::from_raw(24)));
            assert_eq!(
                load_reference(DecoratorSet::MO_ACQUIRE, slots.0.as_mut_ptr().wrapping_add(4)),
                HeapRef::from_raw(24)
            );
        }
    }
}
