use smallvec::SmallVec;
use strata_core::{Handle, Identifier};

/// Parent index of a root node.
pub const ROOT: u32 = u32::MAX;

/// Inline capacity of a node's child list. Most scene nodes have few children.
pub const INLINE_CHILDREN: usize = 4;

/// Child slot indices of one node, in sibling order.
pub type ChildList = SmallVec<[u32; INLINE_CHILDREN]>;

/// One slot of the hierarchy graph.
///
/// # Design Principles
///
/// - Only keeps data traversed every frame (links, level, dirty flag)
/// - Spatial data lives in the transform store, reached through `xform`
/// - Links are raw slot indices; the owning graph validates the handles that
///   lead here before following them
///
/// A free slot has an invalid `identifier`; its other fields are left over
/// from the previous owner and must not be read.
#[derive(Debug, Clone)]
pub struct NodeSlot {
    // === Liveness ===
    pub(crate) identifier: Identifier,

    // === Spatial Link ===
    /// Transform driven by this node.
    pub(crate) xform: Handle,

    // === Core Hierarchy ===
    /// Parent slot index, or [`ROOT`].
    pub(crate) parent: u32,
    /// Child slot indices in sibling order.
    pub(crate) children: ChildList,
    /// Distance from the root. Roots are level 0.
    pub(crate) level: u8,

    // === Core State ===
    /// Set when the local matrix (or an ancestor's) changed since the last
    /// update.
    pub(crate) dirty: bool,
    /// Insertion counter, breaks ties between nodes of the same level.
    pub(crate) sequence: u64,
}

impl NodeSlot {
    pub(crate) fn vacant() -> Self {
        Self {
            identifier: Identifier::INVALID,
            xform: Handle::INVALID,
            parent: ROOT,
            children: ChildList::new(),
            level: 0,
            dirty: false,
            sequence: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.identifier.is_invalid()
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent == ROOT
    }

    #[inline]
    #[must_use]
    pub fn xform(&self) -> Handle {
        self.xform
    }

    #[inline]
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    /// Removes `child` from the child list, returning its sibling position.
    pub(crate) fn remove_child(&mut self, child: u32) -> Option<usize> {
        let pos = self.children.iter().position(|&c| c == child)?;
        self.children.remove(pos);
        Some(pos)
    }
}

impl Default for NodeSlot {
    fn default() -> Self {
        Self::vacant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacant_slot_is_not_live() {
        let slot = NodeSlot::vacant();
        assert!(!slot.is_live());
        assert!(slot.is_root());
        assert!(slot.xform().is_invalid());
    }

    #[test]
    fn remove_child_reports_position() {
        let mut slot = NodeSlot::vacant();
        slot.children.extend([3, 5, 7]);
        assert_eq!(slot.remove_child(5), Some(1));
        assert_eq!(slot.children(), &[3, 7]);
        assert_eq!(slot.remove_child(5), None);
    }
}
