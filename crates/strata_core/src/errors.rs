//! Error Types
//!
//! Per-frame accessors never return errors: a stale handle is logged and
//! answered with a safe default. [`StrataError`] covers the few boundary
//! operations where the caller must decide what to do, namely configuration
//! validation and parsing of serialized transforms.
//!
//! ```rust,ignore
//! use strata_core::errors::{Result, StrataError};
//!
//! fn load(text: &str) -> Result<Handle> {
//!     store.from_string(text)
//! }
//! ```

use thiserror::Error;

/// The error type for Strata's fallible operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrataError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// `initial_slot_count` was zero.
    #[error("initial slot count must be non-zero")]
    ZeroSlotCount,

    /// `initial_slot_count` was not a multiple of the growth alignment.
    #[error("initial slot count {count} is not a multiple of {alignment}")]
    UnalignedSlotCount {
        /// The rejected value
        count: u32,
        /// Required alignment
        alignment: u32,
    },

    // ========================================================================
    // Parsing Errors
    // ========================================================================
    /// Wrong number of whitespace-separated fields.
    #[error("expected {expected} fields in transform string, found {found}")]
    ComponentCount {
        /// Fields required by the format
        expected: usize,
        /// Fields present in the input
        found: usize,
    },

    /// A field could not be parsed as a float.
    #[error("cannot parse transform field {index} ({input:?}): {reason}")]
    Parse {
        /// Zero-based field position
        index: usize,
        /// The offending token
        input: String,
        /// Parser message
        reason: String,
    },
}

/// Alias for `std::result::Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;
