//! Error Module - Barrier Layer Error Types
//!
//! Only setup can fail. Once a [`BarrierSet`](crate::BarrierSet) is built,
//! the access entry points never return errors: pool exhaustion is a call
//! into the caller's slow path, and misuse is a precondition violation.
//!
//! # Error Categories
//!
//! ## Setup Errors
//! - `Configuration` - Invalid configuration
//! - `VirtualMemoryError` - Arena mapping failed
//!
//! ## Argument Errors
//! - `InvalidArgument` - Invalid function argument
//! - `AlignmentError` - Misaligned address or size
//!
//! ## Collector Errors
//! - `OutOfMemory` - Slow-path helper could not carve a new buffer
//! - `InvalidState` - Collaborator in the wrong state

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for barrier layer setup and slow-path helpers
///
/// # Examples
///
/// ```rust
/// use rvgc_barrier::BarrierError;
///
/// fn handle_error(err: BarrierError) {
///     match err {
///         BarrierError::OutOfMemory { requested, available } => {
///             eprintln!("OOM: requested {}, available {}", requested, available);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum BarrierError {
    /// Configuration error
    ///
    /// **When returned:** `BarrierConfig::validate` rejected a field
    ///
    /// **Recovery strategy:** Use the default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Invalid argument
    ///
    /// **When returned:** Function argument fails validation
    ///
    /// **Example scenarios:**
    /// - Zero-sized arena
    /// - Forwarding entry mapping a reference to itself
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Alignment error
    ///
    /// **When returned:** Address or size not aligned to the object alignment
    #[error("Alignment error: address {address:#x} is not aligned to {alignment} bytes")]
    AlignmentError { address: usize, alignment: usize },

    /// Virtual memory error
    ///
    /// **When returned:** The anonymous arena mapping failed
    ///
    /// **Recovery strategy:** Cannot recover - terminate gracefully
    #[error("Virtual memory error: {0}")]
    VirtualMemoryError(String),

    /// Out of memory
    ///
    /// **When returned:** A slow-path helper asked the shared pool for more
    /// than it has left
    ///
    /// **Recovery strategy:** Collect, then retry the slow path
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    /// Invalid state
    ///
    /// **When returned:** A collaborator was used in the wrong state
    ///
    /// **Recovery strategy:** Cannot recover - indicates bug
    ///
    /// **Example scenario:** Concurrent barrier set built without a resolver
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl BarrierError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BarrierError::OutOfMemory { .. })
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            BarrierError::InvalidState { .. } | BarrierError::AlignmentError { .. }
        )
    }
}

/// Result type alias for barrier layer operations
pub type Result<T> = std::result::Result<T, BarrierError>;
