//! Width-polymorphic read-modify-write operations
//!
//! Every function here works on a raw location shared between threads.
//! Callers must supply a location that is:
//!
//! 1. valid for reads and writes for the duration of the call
//! 2. naturally aligned for `T`
//! 3. for 1 and 2 byte operands, inside a 4-byte aligned word that is
//!    itself valid and only ever accessed through this crate
//!
//! Violating any of these is undefined behavior. Alignment is checked with
//! `debug_assert!`; everything else is the caller's contract.

use crate::operand::{AtomicOperand, Width};
use crate::order::AtomicOrder;
use crate::platform;
use crate::subword::Lane;
use std::sync::atomic::Ordering;

#[inline(always)]
fn debug_assert_aligned<T: AtomicOperand>(ptr: *const T) {
    debug_assert!(
        (ptr as usize) % T::WIDTH.bytes() == 0,
        "misaligned {}-byte atomic access at {:#x}",
        T::WIDTH.bytes(),
        ptr as usize
    );
}

/// Atomically add `delta` and return the new value
///
/// # Safety
/// See the module documentation.
///
/// # Examples
/// ```
/// use rvgc_atomic::{add_and_fetch, AtomicOrder};
///
/// let mut counter = 41u32;
/// let updated = unsafe { add_and_fetch(1, &mut counter, AtomicOrder::SeqCst) };
/// assert_eq!(updated, 42);
/// ```
#[inline]
pub unsafe fn add_and_fetch<T: AtomicOperand>(delta: T, dest: *mut T, order: AtomicOrder) -> T {
    fetch_and_add(delta, dest, order).wrapping_add(delta)
}

/// Atomically add `delta` and return the previous value
///
/// # Safety
/// See the module documentation.
#[inline]
pub unsafe fn fetch_and_add<T: AtomicOperand>(delta: T, dest: *mut T, order: AtomicOrder) -> T {
    debug_assert_aligned(dest);
    order.leading_fence().emit();
    let previous = match T::WIDTH {
        Width::Four => platform::fetch_add_word(dest.cast(), delta.into_bits(), Ordering::Relaxed),
        _ => Lane::of(dest).fetch_update(|current| {
            T::from_bits(current).wrapping_add(delta).into_bits()
        }),
    };
    order.trailing_fence().emit();
    T::from_bits(previous)
}

/// Atomically subtract `delta` and return the new value
///
/// # Safety
/// See the module documentation.
#[inline]
pub unsafe fn sub_and_fetch<T: AtomicOperand>(delta: T, dest: *mut T, order: AtomicOrder) -> T {
    debug_assert_aligned(dest);
    order.leading_fence().emit();
    let previous = match T::WIDTH {
        Width::Four => platform::fetch_add_word(
            dest.cast(),
            0u32.wrapping_sub(delta.into_bits()),
            Ordering::Relaxed,
        ),
        _ => Lane::of(dest).fetch_update(|current| {
            T::from_bits(current).wrapping_sub(delta).into_bits()
        }),
    };
    order.trailing_fence().emit();
    T::from_bits(previous).wrapping_sub(delta)
}

/// Atomically store `new_value` and return the value it replaced
///
/// # Safety
/// See the module documentation.
#[inline]
pub unsafe fn exchange<T: AtomicOperand>(new_value: T, dest: *mut T, order: AtomicOrder) -> T {
    debug_assert_aligned(dest);
    order.leading_fence().emit();
    let previous = match T::WIDTH {
        Width::Four => platform::swap_word(dest.cast(), new_value.into_bits(), Ordering::Relaxed),
        _ => Lane::of(dest).fetch_update(|_| new_value.into_bits()),
    };
    order.trailing_fence().emit();
    T::from_bits(previous)
}

/// Strong compare-and-exchange
///
/// If the location holds `expected`, stores `desired` and returns
/// `expected`. Otherwise leaves memory untouched and returns the value
/// observed. Never fails spuriously: lost reservations are retried
/// internally.
///
/// # Safety
/// See the module documentation.
///
/// # Examples
/// ```
/// use rvgc_atomic::{compare_and_exchange, AtomicOrder};
///
/// let mut cell = 10i32;
/// unsafe {
///     assert_eq!(compare_and_exchange(10, 20, &mut cell, AtomicOrder::SeqCst), 10);
///     assert_eq!(compare_and_exchange(10, 30, &mut cell, AtomicOrder::SeqCst), 20);
/// }
/// assert_eq!(cell, 20);
/// ```
#[inline]
pub unsafe fn compare_and_exchange<T: AtomicOperand>(
    expected: T,
    desired: T,
    dest: *mut T,
    order: AtomicOrder,
) -> T {
    debug_assert_aligned(dest);
    let fence = order.cmpxchg_fence();
    fence.emit();
    let observed = match T::WIDTH {
        Width::Four => platform::cmpxchg_word(dest.cast(), expected.into_bits(), desired.into_bits()),
        _ => Lane::of(dest).compare_and_exchange(expected.into_bits(), desired.into_bits()),
    };
    fence.emit();
    T::from_bits(observed)
}

/// Atomic load
///
/// # Safety
/// See the module documentation.
#[inline]
pub unsafe fn atomic_load<T: AtomicOperand>(src: *mut T, order: AtomicOrder) -> T {
    debug_assert_aligned(src);
    let bits = match T::WIDTH {
        Width::Four => platform::load_word(src.cast(), order.load_ordering()),
        _ => Lane::of(src).load(order.load_ordering()),
    };
    T::from_bits(bits)
}

/// Atomic store
///
/// A sub-word store is a lane exchange so the neighbouring lanes of the
/// containing word are never rewritten with stale values.
///
/// # Safety
/// See the module documentation.
#[inline]
pub unsafe fn atomic_store<T: AtomicOperand>(value: T, dest: *mut T, order: AtomicOrder) {
    debug_assert_aligned(dest);
    match T::WIDTH {
        Width::Four => platform::store_word(dest.cast(), value.into_bits(), order.store_ordering()),
        _ => {
            exchange(value, dest, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct Bytes([u8; 4]);

    #[repr(C, align(4))]
    struct Halves([i16; 2]);

    #[test]
    fn test_cas_scenario_width_4() {
        let mut loc = 10u32;
        unsafe {
            assert_eq!(compare_and_exchange(10, 20, &mut loc, AtomicOrder::SeqCst), 10);
            assert_eq!(loc, 20);
            assert_eq!(compare_and_exchange(10, 30, &mut loc, AtomicOrder::SeqCst), 20);
        }
        assert_eq!(loc, 20);
    }

    #[test]
    fn test_cas_relaxed_width_1() {
        let mut bytes = Bytes([10, 0xee, 0xee, 0xee]);
        let loc = bytes.0.as_mut_ptr();
        unsafe {
            assert_eq!(compare_and_exchange(10u8, 20, loc, AtomicOrder::Relaxed), 10);
            assert_eq!(compare_and_exchange(10u8, 30, loc, AtomicOrder::Relaxed), 20);
        }
        assert_eq!(bytes.0, [20, 0xee, 0xee, 0xee]);
    }

    #[test]
    fn test_add_and_fetch_wraps() {
        let mut bytes = Bytes([0xff, 1, 2, 3]);
        let updated = unsafe { add_and_fetch(1u8, bytes.0.as_mut_ptr(), AtomicOrder::AcqRel) };
        assert_eq!(updated, 0);
        assert_eq!(bytes.0, [0, 1, 2, 3]);
    }

    #[test]
    fn test_signed_half_word_arithmetic() {
        let mut halves = Halves([5, -7]);
        let loc = halves.0.as_mut_ptr().wrapping_add(1);
        unsafe {
            assert_eq!(add_and_fetch(3i16, loc, AtomicOrder::SeqCst), -4);
            assert_eq!(sub_and_fetch(6i16, loc, AtomicOrder::Release), -10);
            assert_eq!(fetch_and_add(10i16, loc, AtomicOrder::Acquire), -10);
        }
        assert_eq!(halves.0, [5, 0]);
    }

    #[test]
    fn test_exchange_returns_previous() {
        let mut word = -1i32;
        unsafe {
            assert_eq!(exchange(5, &mut word, AtomicOrder::SeqCst), -1);
            assert_eq!(exchange(6, &mut word, AtomicOrder::Relaxed), 5);
        }
        assert_eq!(word, 6);
    }

    #[test]
    fn test_sub_and_fetch_width_4() {
        let mut word = 3u32;
        let updated = unsafe { sub_and_fetch(5, &mut word, AtomicOrder::SeqCst) };
        assert_eq!(updated, u32::MAX - 1);
    }

    #[test]
    fn test_load_store_all_widths() {
        let mut bytes = Bytes([0; 4]);
        let mut halves = Halves([0; 2]);
        let mut word = 0u32;
        unsafe {
            atomic_store(9u8, bytes.0.as_mut_ptr().wrapping_add(3), AtomicOrder::Release);
            atomic_store(-2i16, halves.0.as_mut_ptr(), AtomicOrder::SeqCst);
            atomic_store(77u32, &mut word, AtomicOrder::Relaxed);

            assert_eq!(atomic_load(bytes.0.as_mut_ptr().wrapping_add(3), AtomicOrder::Acquire), 9u8);
            assert_eq!(atomic_load(halves.0.as_mut_ptr(), AtomicOrder::SeqCst), -2i16);
            assert_eq!(atomic_load(&mut word, AtomicOrder::Relaxed), 77u32);
        }
        assert_eq!(bytes.0, [0, 0, 0, 9]);
        assert_eq!(halves.0, [-2, 0]);
    }
}
