//! Store Configuration
//!
//! ```rust,ignore
//! use strata_core::config::StoreConfig;
//!
//! let config = StoreConfig::default().with_initial_slot_count(1024);
//! let store = TransformStore::with_config(config)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StrataError};

/// Slot counts are kept at multiples of this value so that every array grows
/// in SIMD-friendly steps.
pub const SLOT_ALIGNMENT: u32 = 8;

/// Initial capacity used by [`StoreConfig::default`].
pub const DEFAULT_INITIAL_SLOT_COUNT: u32 = 64;

/// Construction parameters for a transform store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of slots allocated up front. Must be non-zero and a multiple of
    /// [`SLOT_ALIGNMENT`]. Capacity doubles from here whenever the store runs
    /// out of free slots.
    pub initial_slot_count: u32,
}

impl StoreConfig {
    #[must_use]
    pub fn with_initial_slot_count(mut self, count: u32) -> Self {
        self.initial_slot_count = count;
        self
    }

    /// Checks the invariants on `initial_slot_count`.
    pub fn validate(&self) -> Result<()> {
        let count = self.initial_slot_count;
        if count == 0 {
            return Err(StrataError::ZeroSlotCount);
        }
        if count % SLOT_ALIGNMENT != 0 {
            return Err(StrataError::UnalignedSlotCount {
                count,
                alignment: SLOT_ALIGNMENT,
            });
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_slot_count: DEFAULT_INITIAL_SLOT_COUNT,
        }
    }
}
