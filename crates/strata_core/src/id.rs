//! Identifier and handle types.
//!
//! A [`Handle`] pairs a slot index with an [`Identifier`]. Tables store the
//! identifier of the lineage that currently owns each slot, so a handle whose
//! identifier no longer matches has outlived its slot (a *stale* handle) and is
//! rejected instead of aliasing whatever was allocated there afterwards.
//!
//! Identifiers come from an explicit [`IdentifierSource`] rather than a
//! process-wide global. Clones of a source share one counter, which is how the
//! transform store and the hierarchy graph avoid ever handing out equal
//! identifiers when they are built from the same source. Independently created
//! sources start their counters at random points of the 63-bit range, so their
//! identifiers do not meet either and a handle is rejected by every table but
//! the one that issued it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel slot index carried by the invalid handle.
pub const INVALID_INDEX: u32 = u32::MAX;

/// A 64-bit liveness tag, regenerated every time a slot is claimed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(u64);

impl Identifier {
    /// The null identifier. Free slots store this value.
    pub const INVALID: Self = Self(0);

    /// Returns the raw value (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Identifier(INVALID)")
        } else {
            write!(f, "Identifier({})", self.raw())
        }
    }
}

/// Generator of fresh [`Identifier`]s.
///
/// The counter is monotonic and starts above [`Identifier::INVALID`], so every
/// value it returns is distinct from every value returned before by this
/// source or any of its clones.
#[derive(Debug, Clone)]
pub struct IdentifierSource {
    next: Arc<AtomicU64>,
    start: u64,
}

impl IdentifierSource {
    /// Creates an independent source starting at a random point below `2^63`.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at((rand::random::<u64>() >> 1).max(1))
    }

    /// Creates a source whose first identifier is `start`.
    ///
    /// For reproducible identifiers in tools and tests. Two sources built
    /// from nearby starts will hand out equal identifiers.
    #[must_use]
    pub fn starting_at(start: u64) -> Self {
        debug_assert!(start != Identifier::INVALID.raw(), "identifier source cannot start at 0");
        let start = start.max(1);
        Self {
            next: Arc::new(AtomicU64::new(start)),
            start,
        }
    }

    /// Returns a fresh identifier.
    #[inline]
    pub fn create(&self) -> Identifier {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        debug_assert!(value != 0, "identifier counter wrapped");
        Identifier(value)
    }

    /// Pairs a fresh identifier with `slot_index`.
    #[inline]
    pub fn handle(&self, slot_index: u32) -> Handle {
        Handle::new(slot_index, self.create())
    }

    /// Number of identifiers handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - self.start
    }
}

impl Default for IdentifierSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A copyable, validatable reference to a slot in a table.
///
/// Handles carry no lifetime and no pointer; they stay meaningful while the
/// table grows and relocates its arrays. Validity is always checked against
/// the table that issued them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) slot_index: u32,
    pub(crate) identifier: Identifier,
}

impl Handle {
    /// The canonical null handle. Never valid against any table.
    pub const INVALID: Self = Self {
        slot_index: INVALID_INDEX,
        identifier: Identifier::INVALID,
    };

    #[inline]
    #[must_use]
    pub const fn new(slot_index: u32, identifier: Identifier) -> Self {
        Self {
            slot_index,
            identifier,
        }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn slot_index(self) -> u32 {
        self.slot_index
    }

    /// Returns the identifier.
    #[inline]
    #[must_use]
    pub const fn identifier(self) -> Identifier {
        self.identifier
    }

    /// True if either field holds its sentinel value.
    ///
    /// A handle that is not invalid may still be stale; only the issuing table
    /// can tell.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.slot_index == INVALID_INDEX || self.identifier.is_invalid()
    }

    /// Resets this handle to [`Handle::INVALID`]. Does not touch any table.
    #[inline]
    pub fn invalidate(&mut self) {
        *self = Self::INVALID;
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Handle(INVALID)")
        } else {
            write!(f, "Handle({}#{})", self.slot_index, self.identifier.raw())
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
