//! Util Module - Shared Utilities

pub mod alignment;

pub use alignment::Alignment;

/// Size constants
pub mod constants {
    /// 1 Kilobyte
    pub const KB: usize = 1024;
    /// 1 Megabyte
    pub const MB: usize = 1024 * 1024;
    /// Size of a compressed heap reference
    pub const HEAP_REF_SIZE: usize = 4;
}
