//! Configuration Module - Barrier Set Parameters
//!
//! Selects the collector strategy and sizes the pools the allocation fast
//! path draws from. A configuration is consumed once, when the
//! [`BarrierSet`](crate::BarrierSet) is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collector strategy a barrier set is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    /// No collector bookkeeping
    Minimal,
    /// Generational card marking
    #[default]
    CardTable,
    /// Concurrent marking and relocation
    Concurrent,
}

impl BarrierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarrierKind::Minimal => "minimal",
            BarrierKind::CardTable => "card_table",
            BarrierKind::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarrierKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "none" => Ok(BarrierKind::Minimal),
            "card_table" | "cardtable" | "generational" => Ok(BarrierKind::CardTable),
            "concurrent" => Ok(BarrierKind::Concurrent),
            other => Err(ConfigError::UnknownBarrier(other.to_string())),
        }
    }
}

/// Barrier set configuration
///
/// # Examples
///
/// ```rust
/// use rvgc_barrier::{BarrierConfig, BarrierKind};
///
/// let config = BarrierConfig {
///     barrier: BarrierKind::Concurrent,
///     heap_size: 4 * 1024 * 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    /// Collector strategy
    ///
    /// Default: CardTable
    pub barrier: BarrierKind,

    /// Heap arena size in bytes
    ///
    /// Rounded up to the page size when the arena is mapped. Every offset in
    /// the arena must fit a 4-byte compressed reference.
    ///
    /// Default: 16MB
    pub heap_size: usize,

    /// Default TLAB size in bytes
    ///
    /// Default: 32KB
    pub tlab_size: usize,

    /// Minimum TLAB size
    ///
    /// Default: 2KB
    pub tlab_min_size: usize,

    /// Maximum TLAB size
    ///
    /// Default: 1MB
    pub tlab_max_size: usize,

    /// Allow the fast path to fall back to the shared pool
    ///
    /// When false, a TLAB overflow goes straight to the slow path.
    ///
    /// Default: true
    pub shared_pool_enabled: bool,

    /// Shared pool size in bytes
    ///
    /// None means the whole arena.
    ///
    /// Default: None
    pub shared_pool_size: Option<usize>,

    /// Object alignment in bytes
    ///
    /// Power of two between 4 and 1024.
    ///
    /// Default: 8
    pub object_alignment: usize,

    /// log2 of the card size
    ///
    /// Default: 9 (512-byte cards)
    pub card_shift: u32,

    /// Shared pool CAS attempts before the fast path gives up
    ///
    /// Default: 16 per CPU, between 16 and 256
    pub shared_cas_retries: u32,

    /// Log barrier set configuration and slow-path events
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        let retries = (num_cpus::get() as u32).saturating_mul(16).clamp(16, 256);

        BarrierConfig {
            barrier: BarrierKind::default(),

            // Arena
            heap_size: 16 * MB,

            // TLAB
            tlab_size: 32 * KB,
            tlab_min_size: 2 * KB,
            tlab_max_size: MB,

            // Shared pool
            shared_pool_enabled: true,
            shared_pool_size: None,
            shared_cas_retries: retries,

            // Layout
            object_alignment: 8,
            card_shift: 9,

            // Debug
            verbose: false,
        }
    }
}

impl BarrierConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rvgc_barrier::BarrierConfig;
    ///
    /// let config = BarrierConfig {
    ///     object_alignment: 12,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Arena
        if self.heap_size == 0 {
            return Err(ConfigError::InvalidHeapSize(
                "heap_size must be > 0".to_string(),
            ));
        }

        if self.heap_size > MAX_HEAP_SIZE {
            return Err(ConfigError::InvalidHeapSize(format!(
                "heap_size {} exceeds the {} bytes a compressed reference can address",
                self.heap_size, MAX_HEAP_SIZE
            )));
        }

        // Alignment
        if !self.object_alignment.is_power_of_two()
            || self.object_alignment < MIN_OBJECT_ALIGNMENT
            || self.object_alignment > MAX_OBJECT_ALIGNMENT
        {
            return Err(ConfigError::InvalidAlignment(format!(
                "object_alignment must be a power of two between {} and {}, got {}",
                MIN_OBJECT_ALIGNMENT, MAX_OBJECT_ALIGNMENT, self.object_alignment
            )));
        }

        // TLAB
        if self.tlab_min_size == 0 {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_min_size must be > 0".to_string(),
            ));
        }

        if self.tlab_min_size > self.tlab_max_size {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_min_size cannot exceed tlab_max_size".to_string(),
            ));
        }

        if self.tlab_size < self.tlab_min_size || self.tlab_size > self.tlab_max_size {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_size must be between tlab_min_size and tlab_max_size".to_string(),
            ));
        }

        if self.tlab_min_size % self.object_alignment != 0 {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_min_size must be a multiple of object_alignment".to_string(),
            ));
        }

        // Shared pool
        if let Some(size) = self.shared_pool_size {
            if size == 0 || size > self.heap_size {
                return Err(ConfigError::InvalidSharedPool(
                    "shared_pool_size must be between 1 and heap_size".to_string(),
                ));
            }
        }

        if self.shared_cas_retries == 0 {
            return Err(ConfigError::InvalidRetries(
                "shared_cas_retries must be > 0".to_string(),
            ));
        }

        // Cards
        if !(MIN_CARD_SHIFT..=MAX_CARD_SHIFT).contains(&self.card_shift) {
            return Err(ConfigError::InvalidCardShift(format!(
                "card_shift must be between {} and {}, got {}",
                MIN_CARD_SHIFT, MAX_CARD_SHIFT, self.card_shift
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - RVGC_BARRIER (`minimal`, `card_table`, `concurrent`)
    /// - RVGC_HEAP_SIZE
    /// - RVGC_TLAB_SIZE
    /// - RVGC_CAS_RETRIES
    /// - RVGC_VERBOSE
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RVGC_BARRIER") {
            if let Ok(kind) = val.parse::<BarrierKind>() {
                config.barrier = kind;
            }
        }

        if let Ok(val) = std::env::var("RVGC_HEAP_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.heap_size = size;
            }
        }

        if let Ok(val) = std::env::var("RVGC_TLAB_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.tlab_size = size;
            }
        }

        if let Ok(val) = std::env::var("RVGC_CAS_RETRIES") {
            if let Ok(retries) = val.parse::<u32>() {
                config.shared_cas_retries = retries;
            }
        }

        if let Ok(val) = std::env::var("RVGC_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Card size in bytes
    pub fn card_size(&self) -> usize {
        1 << self.card_shift
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid heap size: {0}")]
    InvalidHeapSize(String),

    #[error("Invalid TLAB size: {0}")]
    InvalidTlabSize(String),

    #[error("Invalid object alignment: {0}")]
    InvalidAlignment(String),

    #[error("Invalid shared pool: {0}")]
    InvalidSharedPool(String),

    #[error("Invalid CAS retries: {0}")]
    InvalidRetries(String),

    #[error("Invalid card shift: {0}")]
    InvalidCardShift(String),

    #[error("Unknown barrier kind: {0}")]
    UnknownBarrier(String),
}

// ============================================================================
// CONSTANTS
// ============================================================================

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

/// Largest arena a 4-byte compressed reference can address
pub const MAX_HEAP_SIZE: usize = 1 << 31;

pub const MIN_OBJECT_ALIGNMENT: usize = 4;
pub const MAX_OBJECT_ALIGNMENT: usize = 1024;

pub const MIN_CARD_SHIFT: u32 = 7;
pub const MAX_CARD_SHIFT: u32 = 12;
