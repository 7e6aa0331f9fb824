//! Alignment Utilities
//!
//! Helper functions for memory alignment. Every `alignment` argument must be
//! a power of two.

/// Alignment - utility for alignment operations
pub struct Alignment;

impl Alignment {
    /// Align value up to boundary
    ///
    /// # Examples
    /// ```
    /// use rvgc_barrier::util::Alignment;
    ///
    /// assert_eq!(Alignment::align_up(100, 8), 104);
    /// assert_eq!(Alignment::align_up(64, 8), 64);
    /// ```
    #[inline]
    pub fn align_up(value: usize, alignment: usize) -> usize {
        (value + alignment - 1) & !(alignment - 1)
    }

    /// Align value up, or None if that overflows
    #[inline]
    pub fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
        value
            .checked_add(alignment - 1)
            .map(|v| v & !(alignment - 1))
    }

    /// Align value down to boundary
    #[inline]
    pub fn align_down(value: usize, alignment: usize) -> usize {
        value & !(alignment - 1)
    }

    /// Check if value is aligned
    #[inline]
    pub fn is_aligned(value: usize, alignment: usize) -> bool {
        value & (alignment - 1) == 0
    }

    /// Round a size up to the system page size
    pub fn page_align(value: usize) -> usize {
        Self::align_up(value, Self::page_size())
    }

    /// System page size, 4KB if the platform does not report one
    pub fn page_size() -> usize {
        match page_size::get() {
            0 => Self::PAGE,
            size => size,
        }
    }

    /// Default object alignment (8 bytes)
    pub const DEFAULT: usize = 8;

    /// Fallback page alignment (4KB)
    pub const PAGE: usize = 4096;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_down() {
        assert_eq!(Alignment::align_up(0, 8), 0);
        assert_eq!(Alignment::align_up(9, 8), 16);
        assert_eq!(Alignment::align_down(15, 8), 8);
        assert!(Alignment::is_aligned(4096, Alignment::PAGE));
        assert!(!Alignment::is_aligned(4100, 8));
    }

    #[test]
    fn test_checked_align_up_overflow() {
        assert_eq!(Alignment::checked_align_up(usize::MAX, 8), None);
        assert_eq!(Alignment::checked_align_up(17, 16), Some(32));
    }

    #[test]
    fn test_page_align() {
        let page = Alignment::page_size();
        assert!(page.is_power_of_two());
        assert_eq!(Alignment::page_align(1), page);
        assert_eq!(Alignment::page_align(page), page);
    }
}
