//! RV32A LR/SC loops

use core::arch::asm;

/// Strong 4-byte compare-and-exchange
///
/// Returns the value observed under the reservation. The loop only exits
/// when the comparison fails or the conditional store succeeds, so a lost
/// reservation never surfaces as a spurious failure.
///
/// # Safety
/// `dest` must be valid and 4-byte aligned.
#[inline(always)]
pub(crate) unsafe fn cmpxchg_word(dest: *mut u32, expected: u32, desired: u32) -> u32 {
    let observed: u32;
    asm!(
        "2:",
        "lr.w.aq {observed}, ({dest})",
        "bne {observed}, {expected}, 3f",
        "sc.w.rl {failed}, {desired}, ({dest})",
        "bnez {failed}, 2b",
        "3:",
        observed = out(reg) observed,
        failed = out(reg) _,
        dest = in(reg) dest,
        expected = in(reg) expected,
        desired = in(reg) desired,
        options(nostack),
    );
    observed
}

/// Strong compare-and-exchange of a lane inside a reserved word
///
/// `mask`, `expected` and `desired` are already shifted into lane position.
/// Returns the observed lane, shifted back down.
///
/// # Safety
/// `word` must be valid and 4-byte aligned.
#[inline(always)]
pub(crate) unsafe fn cmpxchg_lane(
    word: *mut u32,
    shift: u32,
    mask: u32,
    expected: u32,
    desired: u32,
) -> u32 {
    let observed: u32;
    asm!(
        "2:",
        "lr.w.aq {observed}, ({word})",
        "and {scratch}, {observed}, {mask}",
        "bne {scratch}, {expected}, 3f",
        "xor {scratch}, {observed}, {scratch}",
        "or {scratch}, {scratch}, {desired}",
        "sc.w.rl {scratch}, {scratch}, ({word})",
        "bnez {scratch}, 2b",
        "3:",
        observed = out(reg) observed,
        scratch = out(reg) _,
        word = in(reg) word,
        mask = in(reg) mask,
        expected = in(reg) expected,
        desired = in(reg) desired,
        options(nostack),
    );
    (observed & mask) >> shift
}
