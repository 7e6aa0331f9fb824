//! Operand Widths
//!
//! Atomic operations are indexed by operand width. The width of a call site
//! is fixed by the operand type, so asking for an unsupported operation
//! (8-byte add, exchange or compare-and-exchange on RV32) fails to compile
//! instead of failing at run time.
//!
//! - [`AtomicOperand`]: 1, 2 and 4 byte types, full read-modify-write support
//! - [`WideOperand`]: 8 byte types, coherent load/store only

use static_assertions::const_assert_eq;
use std::fmt;

/// Operand width in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl Width {
    /// Width in bytes
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// True if the CPU can reserve an operand of this width directly
    #[inline]
    pub const fn is_native(self) -> bool {
        matches!(self, Width::Four)
    }

    /// Lane mask for a sub-word operand, right-aligned
    #[inline]
    pub const fn lane_mask(self) -> u32 {
        match self {
            Width::One => 0xff,
            Width::Two => 0xffff,
            Width::Four | Width::Eight => u32::MAX,
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Operand type with add/exchange/compare-and-exchange support
///
/// Implemented for every integer type of width 1, 2 or 4. The value is moved
/// in and out of the layer as the zero-extended low bits of a `u32`.
pub trait AtomicOperand:
    Copy + PartialEq + Send + Sync + fmt::Debug + sealed::Sealed + 'static
{
    /// Width of the operand
    const WIDTH: Width;

    /// Zero-extended bit pattern
    fn into_bits(self) -> u32;

    /// Value from the low `WIDTH` bytes of `bits`
    fn from_bits(bits: u32) -> Self;

    /// Two's complement addition
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Two's complement subtraction
    fn wrapping_sub(self, rhs: Self) -> Self;
}

macro_rules! impl_atomic_operand {
    ($($ty:ty => $bits:ty, $width:ident;)*) => {
        $(
            const_assert_eq!(core::mem::size_of::<$ty>(), Width::$width as usize);

            impl sealed::Sealed for $ty {}

            impl AtomicOperand for $ty {
                const WIDTH: Width = Width::$width;

                #[inline(always)]
                fn into_bits(self) -> u32 {
                    self as $bits as u32
                }

                #[inline(always)]
                fn from_bits(bits: u32) -> Self {
                    bits as $bits as $ty
                }

                #[inline(always)]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$ty>::wrapping_add(self, rhs)
                }

                #[inline(always)]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$ty>::wrapping_sub(self, rhs)
                }
            }
        )*
    };
}

impl_atomic_operand! {
    u8 => u8, One;
    i8 => u8, One;
    u16 => u16, Two;
    i16 => u16, Two;
    u32 => u32, Four;
    i32 => u32, Four;
}

#[cfg(target_pointer_width = "32")]
impl_atomic_operand! {
    usize => u32, Four;
    isize => u32, Four;
}

/// 8-byte operand, limited to coherent load and store
pub trait WideOperand: Copy + Send + Sync + fmt::Debug + sealed::Sealed + 'static {
    /// Raw 64-bit pattern
    fn into_bits64(self) -> u64;

    /// Value from a raw 64-bit pattern
    fn from_bits64(bits: u64) -> Self;
}

macro_rules! impl_wide_operand {
    ($($ty:ty),*) => {
        $(
            const_assert_eq!(core::mem::size_of::<$ty>(), Width::Eight as usize);

            impl sealed::Sealed for $ty {}
        )*
    };
}

impl_wide_operand!(u64, i64, f64);

impl WideOperand for u64 {
    #[inline(always)]
    fn into_bits64(self) -> u64 {
        self
    }

    #[inline(always)]
    fn from_bits64(bits: u64) -> Self {
        bits
    }
}

impl WideOperand for i64 {
    #[inline(always)]
    fn into_bits64(self) -> u64 {
        self as u64
    }

    #[inline(always)]
    fn from_bits64(bits: u64) -> Self {
        bits as i64
    }
}

impl WideOperand for f64 {
    #[inline(always)]
    fn into_bits64(self) -> u64 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_bits64(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_bytes() {
        assert_eq!(Width::One.bytes(), 1);
        assert_eq!(Width::Two.bytes(), 2);
        assert_eq!(Width::Four.bytes(), 4);
        assert_eq!(Width::Eight.bytes(), 8);
        assert!(Width::Four.is_native());
        assert!(!Width::Two.is_native());
    }

    #[test]
    fn test_signed_bits_are_zero_extended() {
        assert_eq!((-1i8).into_bits(), 0xff);
        assert_eq!((-2i16).into_bits(), 0xfffe);
        assert_eq!(i8::from_bits(0xff), -1);
        assert_eq!(i16::from_bits(0x1_8000), i16::MIN);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(AtomicOperand::wrapping_add(u8::MAX, 1), 0);
        assert_eq!(AtomicOperand::wrapping_sub(0u16, 1), u16::MAX);
        assert_eq!(AtomicOperand::wrapping_add(i32::MAX, 1), i32::MIN);
    }

    #[test]
    fn test_wide_bits() {
        assert_eq!(i64::from_bits64((-5i64).into_bits64()), -5);
        assert_eq!(f64::from_bits64(1.5f64.into_bits64()), 1.5);
    }
}
