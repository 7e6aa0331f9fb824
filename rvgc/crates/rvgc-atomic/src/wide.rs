//! 8-byte coherent load and store
//!
//! No RV32 instruction moves 8 bytes atomically. 8-byte loads and stores are
//! delegated to a [`Copy64`] primitive that guarantees a concurrent reader
//! sees either the whole old value or the whole new value, never a mix.
//!
//! This is weaker than a real 8-byte atomic: there is no 8-byte add,
//! exchange or compare-and-exchange, and [`WideOperand`] does not give
//! access to any. Callers that need those must restructure around 4-byte
//! operations or use a lock.

use crate::operand::WideOperand;
use parking_lot::{const_mutex, Mutex};

/// Copy 8 bytes so that any concurrent reader observes either the fully old
/// or the fully new value
pub trait Copy64: Sync {
    /// Copy `*src` to `*dst`
    ///
    /// # Safety
    /// Both pointers must be valid and 8-byte aligned. Every concurrent
    /// access to the shared side must go through the same copier.
    unsafe fn copy64(&self, src: *const u64, dst: *mut u64);
}

/// Copier backed by the target's native 64-bit atomic
#[cfg(target_has_atomic = "64")]
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCopy64;

#[cfg(target_has_atomic = "64")]
impl Copy64 for NativeCopy64 {
    #[inline(always)]
    unsafe fn copy64(&self, src: *const u64, dst: *mut u64) {
        use std::sync::atomic::{AtomicU64, Ordering};

        let value = AtomicU64::from_ptr(src as *mut u64).load(Ordering::Relaxed);
        AtomicU64::from_ptr(dst).store(value, Ordering::Relaxed);
    }
}

const STRIPES: usize = 64;
const STRIPE_SHIFT: u32 = 3;

/// Copier for targets without a 64-bit atomic
///
/// Each 8-byte location hashes to one of a fixed set of stripes. A copy
/// holds the stripes of both sides, taken in index order.
pub struct StripedCopy64 {
    stripes: [Mutex<()>; STRIPES],
}

impl StripedCopy64 {
    /// Create a copier with all stripes unlocked
    pub const fn new() -> Self {
        const UNLOCKED: Mutex<()> = const_mutex(());
        Self {
            stripes: [UNLOCKED; STRIPES],
        }
    }

    #[inline]
    fn stripe_of(addr: usize) -> usize {
        (addr >> STRIPE_SHIFT) % STRIPES
    }
}

impl Default for StripedCopy64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Copy64 for StripedCopy64 {
    unsafe fn copy64(&self, src: *const u64, dst: *mut u64) {
        let a = Self::stripe_of(src as usize);
        let b = Self::stripe_of(dst as usize);
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let _first = self.stripes[first].lock();
        let _second = (first != second).then(|| self.stripes[second].lock());
        dst.write_volatile(src.read_volatile());
    }
}

/// Copier used by [`atomic_load_8`] and [`atomic_store_8`]
#[cfg(target_has_atomic = "64")]
pub type DefaultCopy64 = NativeCopy64;

/// Copier used by [`atomic_load_8`] and [`atomic_store_8`]
#[cfg(not(target_has_atomic = "64"))]
pub type DefaultCopy64 = StripedCopy64;

#[cfg(target_has_atomic = "64")]
static DEFAULT_COPIER: DefaultCopy64 = NativeCopy64;

#[cfg(not(target_has_atomic = "64"))]
static DEFAULT_COPIER: DefaultCopy64 = StripedCopy64::new();

/// The process-wide default copier
pub fn default_copier() -> &'static DefaultCopy64 {
    &DEFAULT_COPIER
}

/// Coherent 8-byte load through `copier`
///
/// # Safety
/// `src` must be valid and 8-byte aligned; see [`Copy64::copy64`].
#[inline]
pub unsafe fn atomic_load_8_with<T: WideOperand, C: Copy64 + ?Sized>(copier: &C, src: *const T) -> T {
    debug_assert!((src as usize) % 8 == 0, "misaligned 8-byte load at {:#x}", src as usize);
    let mut bits = 0u64;
    copier.copy64(src.cast(), &mut bits);
    T::from_bits64(bits)
}

/// Coherent 8-byte store through `copier`
///
/// # Safety
/// `dest` must be valid and 8-byte aligned; see [`Copy64::copy64`].
#[inline]
pub unsafe fn atomic_store_8_with<T: WideOperand, C: Copy64 + ?Sized>(copier: &C, value: T, dest: *mut T) {
    debug_assert!((dest as usize) % 8 == 0, "misaligned 8-byte store at {:#x}", dest as usize);
    let mut bits = value.into_bits64();
    copier.copy64(std::ptr::addr_of_mut!(bits), dest.cast());
}

/// Coherent 8-byte load through the default copier
///
/// # Safety
/// `src` must be valid and 8-byte aligned.
#[inline]
pub unsafe fn atomic_load_8<T: WideOperand>(src: *const T) -> T {
    atomic_load_8_with(default_copier(), src)
}

/// Coherent 8-byte store through the default copier
///
/// # Safety
/// `dest` must be valid and 8-byte aligned.
#[inline]
pub unsafe fn atomic_store_8<T: WideOperand>(value: T, dest: *mut T) {
    atomic_store_8_with(default_copier(), value, dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let mut cell = 0u64;
        unsafe {
            atomic_store_8(0x0123_4567_89ab_cdefu64, &mut cell);
            assert_eq!(atomic_load_8::<u64>(&mut cell), 0x0123_4567_89ab_cdef);
        }
    }

    #[test]
    fn test_striped_copier_signed_and_float() {
        let copier = StripedCopy64::new();
        let mut signed = 0i64;
        let mut float = 0f64;
        unsafe {
            atomic_store_8_with(&copier, -42i64, &mut signed);
            atomic_store_8_with(&copier, 2.5f64, &mut float);
            assert_eq!(atomic_load_8_with::<i64, _>(&copier, &mut signed), -42);
            assert_eq!(atomic_load_8_with::<f64, _>(&copier, &mut float), 2.5);
        }
    }

    #[test]
    fn test_stripe_of_same_word_is_stable() {
        assert_eq!(StripedCopy64::stripe_of(0x1000), StripedCopy64::stripe_of(0x1004));
        assert_ne!(StripedCopy64::stripe_of(0x1000), StripedCopy64::stripe_of(0x1008));
    }
}
