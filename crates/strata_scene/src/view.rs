//! Flattened hierarchy view
//!
//! The update pass walks the graph as one flat array instead of recursing.
//! Nodes are ordered by `(level, sequence)`, so:
//!
//! - every parent precedes all of its descendants, and one forward pass
//!   composes world matrices at any depth
//! - nodes of the same level are contiguous (a *level batch*) and never depend
//!   on each other, so a batch can be split across worker threads
//!
//! ```ignore
//! for batch in view.batches() {
//!     // nodes inside one batch are independent
//!     for &node in batch { /* compose */ }
//! }
//! ```
//!
//! The view is rebuilt only after topology changes (add, remove, reparent).

use crate::node::NodeSlot;

/// Level-ordered node slots plus per-level offsets.
#[derive(Debug, Default, Clone)]
pub struct HierarchyView {
    /// Live node slot indices sorted by `(level, sequence)`.
    order: Vec<u32>,
    /// `order[level_starts[l]..level_starts[l + 1]]` holds level `l`. One
    /// extra trailing entry equals `order.len()`.
    level_starts: Vec<usize>,
}

impl HierarchyView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the view from every live slot in `nodes`. Reuses allocations.
    pub(crate) fn rebuild(&mut self, nodes: &[NodeSlot]) {
        self.order.clear();
        self.level_starts.clear();

        self.order.extend(
            nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.is_live())
                .map(|(i, _)| i as u32),
        );
        self.order
            .sort_unstable_by_key(|&i| (nodes[i as usize].level, nodes[i as usize].sequence));

        let mut current = None;
        for (pos, &i) in self.order.iter().enumerate() {
            let level = nodes[i as usize].level;
            if current != Some(level) {
                debug_assert!(
                    current.map_or(level == 0, |c: u8| level == c + 1),
                    "level gap in hierarchy view"
                );
                self.level_starts.push(pos);
                current = Some(level);
            }
        }
        self.level_starts.push(self.order.len());
    }

    /// Node slots in walk order.
    #[inline]
    #[must_use]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Number of levels (0 for an empty graph).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.level_starts.len().saturating_sub(1)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node slots of one level, or an empty slice past the deepest level.
    #[must_use]
    pub fn batch(&self, level: usize) -> &[u32] {
        match (self.level_starts.get(level), self.level_starts.get(level + 1)) {
            (Some(&start), Some(&end)) => &self.order[start..end],
            _ => &[],
        }
    }

    /// Iterates over level batches, roots first.
    pub fn batches(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.level_starts
            .windows(2)
            .map(|w| &self.order[w[0]..w[1]])
    }
}
