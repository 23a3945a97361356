//! Dirty list for stale local matrices.
//!
//! Setters on the transform store push the touched slot here; the next update
//! pass drains the list and recomputes exactly those local matrices. Per-frame
//! dirty counts are small next to the number of live transforms, so duplicates
//! are rejected with a linear scan rather than a side table.

/// A deduplicated, unordered list of slot indices.
#[derive(Debug, Clone, Default)]
pub struct DirtyList {
    slots: Vec<u32>,
}

impl DirtyList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `slot` unless it is already listed. Returns whether it was added.
    pub fn push(&mut self, slot: u32) -> bool {
        if self.slots.contains(&slot) {
            return false;
        }
        self.slots.push(slot);
        true
    }

    /// Removes `slot` if present. Order is not preserved.
    pub fn remove(&mut self, slot: u32) -> bool {
        if let Some(pos) = self.slots.iter().position(|&s| s == slot) {
            self.slots.swap_remove(pos);
            true
        } else {
            false
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, slot: u32) -> bool {
        self.slots.contains(&slot)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Empties the list, yielding every listed slot. Keeps the allocation.
    pub fn drain(&mut self) -> std::vec::Drain<'_, u32> {
        self.slots.drain(..)
    }

    /// Empties the list without visiting the listed slots.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
