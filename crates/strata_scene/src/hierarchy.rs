//! Hierarchy Graph
//!
//! A tree of nodes layered over a [`TransformStore`]. Each node drives one
//! transform: after [`HierarchyGraph::update`] the transform's world matrix is
//! its parent's world matrix times its own local matrix.
//!
//! The graph never owns the store. Every operation that touches transforms
//! borrows it explicitly, so callers can keep the two side by side without
//! fighting the borrow checker.
//!
//! # Update pass
//!
//! 1. Recompute every dirty local matrix in the store; mark the nodes that
//!    own those transforms dirty
//! 2. Rebuild the flattened [`HierarchyView`] if topology changed
//! 3. Walk the view once, roots first. A node is recomputed when its own flag
//!    is set or its parent was recomputed earlier in the same walk
//!
//! Parents always precede their descendants in the view, so one pass
//! propagates a change through any depth.
//!
//! # Removal
//!
//! Removing a node promotes its children: they take the removed node's place
//! in its parent's child list (or among the roots), and every level below
//! them is recomputed.

use glam::{Mat4, Quat, Vec3};
use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use strata_core::{Handle, IdentifierSource};

use crate::node::{NodeSlot, ROOT};
use crate::view::HierarchyView;
use crate::xform::TransformStore;

/// Counters reported by [`HierarchyGraph::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Local matrices recomputed from the store's dirty list.
    pub recomputed_locals: usize,
    /// World matrices composed by the walk.
    pub recomputed_worlds: usize,
    /// Whether the flattened view had to be rebuilt.
    pub view_rebuilt: bool,
}

/// Parent/child relationships between transforms.
#[derive(Debug)]
pub struct HierarchyGraph {
    nodes: Vec<NodeSlot>,
    free_list: Vec<u32>,
    /// Root slots in insertion order.
    roots: Vec<u32>,
    /// Transform slot -> node slot.
    owners: FxHashMap<u32, u32>,
    ids: IdentifierSource,
    next_sequence: u64,
    live: u32,

    view: HierarchyView,
    topology_dirty: bool,
    /// Per node slot: composed during the current walk.
    recomputed: Vec<bool>,
    last_frame: u64,
}

impl Default for HierarchyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyGraph {
    /// Creates an empty graph with its own identifier source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_identifiers(IdentifierSource::new())
    }

    /// Creates an empty graph drawing node identifiers from `ids`.
    #[must_use]
    pub fn with_identifiers(ids: IdentifierSource) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            owners: FxHashMap::default(),
            ids,
            next_sequence: 0,
            live: 0,
            view: HierarchyView::new(),
            topology_dirty: false,
            recomputed: Vec::new(),
            last_frame: 0,
        }
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Adds a root node driving a fresh identity transform.
    pub fn root_add(&mut self, store: &mut TransformStore) -> Handle {
        let xform = store.create();
        self.insert(store, xform, ROOT, 0)
    }

    /// Adds a root node driving `xform`.
    ///
    /// `xform` must be valid and not already driven by a node.
    pub fn root_add_with_xform(&mut self, store: &mut TransformStore, xform: Handle) -> Handle {
        if !Self::check_xform(store, xform, "root_add_with_xform") {
            return Handle::INVALID;
        }
        self.insert(store, xform, ROOT, 0)
    }

    /// Adds a child of `parent` driving a fresh identity transform.
    pub fn child_add(&mut self, store: &mut TransformStore, parent: Handle) -> Handle {
        let Some(level) = self.child_level(parent, "child_add") else {
            return Handle::INVALID;
        };
        let xform = store.create();
        self.insert(store, xform, parent.slot_index(), level)
    }

    /// Adds a child of `parent` driving `xform`.
    pub fn child_add_with_xform(
        &mut self,
        store: &mut TransformStore,
        parent: Handle,
        xform: Handle,
    ) -> Handle {
        let Some(level) = self.child_level(parent, "child_add_with_xform") else {
            return Handle::INVALID;
        };
        if !Self::check_xform(store, xform, "child_add_with_xform") {
            return Handle::INVALID;
        }
        self.insert(store, xform, parent.slot_index(), level)
    }

    /// Removes `node`, promoting its children into its place, and invalidates
    /// the caller's handle.
    ///
    /// With `release_xform` the node's transform is destroyed; otherwise it is
    /// handed back to the caller as an unparented transform.
    pub fn node_remove(&mut self, store: &mut TransformStore, node: &mut Handle, release_xform: bool) {
        let Some(slot) = self.resolve_or_warn(*node, "node_remove") else {
            return;
        };
        let i = slot as usize;
        let parent = self.nodes[i].parent;
        let children = std::mem::take(&mut self.nodes[i].children);
        let position = self.unlink(slot);

        // Promote children into the vacated sibling position.
        let child_level = if parent == ROOT {
            for (offset, &child) in children.iter().enumerate() {
                self.roots.insert(position + offset, child);
            }
            0
        } else {
            let siblings = &mut self.nodes[parent as usize].children;
            siblings.insert_many(position, children.iter().copied());
            self.nodes[parent as usize].level + 1
        };
        for &child in &children {
            self.nodes[child as usize].parent = parent;
            relevel(&mut self.nodes, child, child_level);
        }

        let mut xform = self.nodes[i].xform;
        let xform_slot = xform.slot_index();
        if self.owners.get(&xform_slot) == Some(&slot) {
            self.owners.remove(&xform_slot);
        }
        if store.is_valid(xform) {
            if release_xform {
                store.destroy(&mut xform);
            } else {
                store.set_attached(xform_slot, false);
            }
        }

        self.nodes[i] = NodeSlot::vacant();
        self.free_list.push(slot);
        self.live -= 1;
        self.topology_dirty = true;
        node.invalidate();
    }

    // ========================================================================
    // Reparenting
    // ========================================================================

    /// Moves `child` (with its subtree) under `new_parent`, appending it to
    /// the end of the new parent's children.
    ///
    /// Refused when either handle is invalid, when `new_parent` lies inside
    /// the subtree of `child`, or when the subtree would sink below level
    /// `u8::MAX`.
    pub fn node_attach(&mut self, child: Handle, new_parent: Handle) -> bool {
        let Some(c) = self.resolve_or_warn(child, "node_attach") else {
            return false;
        };
        let Some(p) = self.resolve_or_warn(new_parent, "node_attach") else {
            return false;
        };
        if self.is_ancestor_or_self(c, p) {
            warn!("HierarchyGraph::node_attach: {new_parent} lies under {child}, refusing cycle");
            return false;
        }

        let new_level = u32::from(self.nodes[p as usize].level) + 1;
        let span = u32::from(subtree_depth(&self.nodes, c) - self.nodes[c as usize].level);
        if new_level + span > u32::from(u8::MAX) {
            warn!("HierarchyGraph::node_attach: moving {child} under {new_parent} exceeds the depth limit");
            return false;
        }

        if self.nodes[c as usize].parent == p {
            return true;
        }
        self.unlink(c);
        self.nodes[p as usize].children.push(c);
        self.nodes[c as usize].parent = p;
        relevel(&mut self.nodes, c, new_level as u8);
        self.topology_dirty = true;
        true
    }

    /// Turns `child` into a root, keeping its subtree.
    pub fn node_detach(&mut self, child: Handle) -> bool {
        let Some(c) = self.resolve_or_warn(child, "node_detach") else {
            return false;
        };
        if self.nodes[c as usize].is_root() {
            return true;
        }
        self.unlink(c);
        self.roots.push(c);
        self.nodes[c as usize].parent = ROOT;
        relevel(&mut self.nodes, c, 0);
        self.topology_dirty = true;
        true
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Brings every world matrix driven by this graph up to date.
    pub fn update(&mut self, store: &mut TransformStore, frame: u64) -> UpdateSummary {
        let recomputed_locals = store.calculate_dirty();
        for xform_slot in store.drain_moved() {
            if let Some(&n) = self.owners.get(&xform_slot) {
                self.nodes[n as usize].dirty = true;
            }
        }

        let view_rebuilt = self.topology_dirty;
        if view_rebuilt {
            self.view.rebuild(&self.nodes);
            self.topology_dirty = false;
            debug!(
                "HierarchyGraph view rebuilt: {} nodes in {} levels",
                self.view.len(),
                self.view.depth()
            );
        }

        self.recomputed.clear();
        self.recomputed.resize(self.nodes.len(), false);

        let mut recomputed_worlds = 0;
        for &slot in self.view.order() {
            let i = slot as usize;
            let node = &self.nodes[i];
            let parent_recomputed = !node.is_root() && self.recomputed[node.parent as usize];
            if !node.dirty && !parent_recomputed {
                continue;
            }

            let xform = node.xform;
            if store.is_valid(xform) {
                let local = store.local_at(xform.slot_index());
                let world = if node.is_root() {
                    local
                } else {
                    parent_world(&self.nodes, store, node.parent) * local
                };
                store.world_write(xform.slot_index(), world);
            } else {
                warn!(
                    "HierarchyGraph::update: node {} drives destroyed transform {xform}",
                    Handle::new(slot, node.identifier)
                );
            }

            self.recomputed[i] = true;
            self.nodes[i].dirty = false;
            recomputed_worlds += 1;
        }

        self.last_frame = frame;
        let summary = UpdateSummary {
            recomputed_locals,
            recomputed_worlds,
            view_rebuilt,
        };
        trace!("HierarchyGraph frame {frame}: {summary:?}");
        summary
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_valid(&self, node: Handle) -> bool {
        self.resolve(node).is_some()
    }

    /// Transform driven by `node`.
    #[must_use]
    pub fn xform_handle_get(&self, node: Handle) -> Handle {
        self.resolve_or_warn(node, "xform_handle_get")
            .map_or(Handle::INVALID, |i| self.nodes[i as usize].xform)
    }

    /// Parent of `node`; invalid for roots.
    #[must_use]
    pub fn parent_handle_get(&self, node: Handle) -> Handle {
        let Some(i) = self.resolve_or_warn(node, "parent_handle_get") else {
            return Handle::INVALID;
        };
        let parent = self.nodes[i as usize].parent;
        if parent == ROOT {
            Handle::INVALID
        } else {
            self.handle_at(parent)
        }
    }

    /// Transform driven by the parent of `node`; invalid for roots.
    #[must_use]
    pub fn parent_xform_handle_get(&self, node: Handle) -> Handle {
        let Some(i) = self.resolve_or_warn(node, "parent_xform_handle_get") else {
            return Handle::INVALID;
        };
        let parent = self.nodes[i as usize].parent;
        if parent == ROOT {
            Handle::INVALID
        } else {
            self.nodes[parent as usize].xform
        }
    }

    /// World-space rotation of `node` as of the last update.
    #[must_use]
    pub fn world_rotation_get(&self, store: &TransformStore, node: Handle) -> Quat {
        self.world_decomposed(store, node, "world_rotation_get")
            .map_or(Quat::IDENTITY, |(_, r, _)| r)
    }

    /// World-space scale of `node` as of the last update.
    #[must_use]
    pub fn world_scale_get(&self, store: &TransformStore, node: Handle) -> Vec3 {
        self.world_decomposed(store, node, "world_scale_get")
            .map_or(Vec3::ONE, |(s, _, _)| s)
    }

    /// World-space position of `node` as of the last update.
    #[must_use]
    pub fn world_position_get(&self, store: &TransformStore, node: Handle) -> Vec3 {
        self.resolve_or_warn(node, "world_position_get")
            .map_or(Vec3::ZERO, |i| {
                store.world_get(self.nodes[i as usize].xform).w_axis.truncate()
            })
    }

    /// Depth of `node` below its root, or `None` for an invalid handle.
    #[must_use]
    pub fn level_get(&self, node: Handle) -> Option<u8> {
        self.resolve(node).map(|i| self.nodes[i as usize].level)
    }

    /// Whether `node` will be recomputed by the next update regardless of
    /// its parent.
    #[must_use]
    pub fn is_dirty(&self, node: Handle) -> bool {
        self.resolve(node)
            .is_some_and(|i| self.nodes[i as usize].dirty)
    }

    /// Direct children of `node` in sibling order. Empty for invalid handles.
    pub fn children(&self, node: Handle) -> Children<'_> {
        let slots: &[u32] = match self.resolve_or_warn(node, "children") {
            Some(i) => &self.nodes[i as usize].children,
            None => &[],
        };
        Children {
            graph: self,
            slots: slots.iter(),
        }
    }

    /// Root nodes in insertion order (promotions take the removed root's
    /// place).
    pub fn roots(&self) -> impl Iterator<Item = Handle> + '_ {
        self.roots.iter().map(|&slot| self.handle_at(slot))
    }

    /// Number of live nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The flattened view used by the last update.
    ///
    /// Stale between a topology change and the next update.
    #[inline]
    #[must_use]
    pub fn view(&self) -> &HierarchyView {
        &self.view
    }

    /// Frame number passed to the most recent update.
    #[inline]
    #[must_use]
    pub fn last_frame(&self) -> u64 {
        self.last_frame
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn resolve(&self, node: Handle) -> Option<u32> {
        let slot = node.slot_index();
        let entry = self.nodes.get(slot as usize)?;
        (!node.identifier().is_invalid() && entry.identifier == node.identifier()).then_some(slot)
    }

    fn resolve_or_warn(&self, node: Handle, op: &str) -> Option<u32> {
        let resolved = self.resolve(node);
        if resolved.is_none() {
            warn!("HierarchyGraph::{op}: invalid or stale node {node}");
        }
        resolved
    }

    #[inline]
    fn handle_at(&self, slot: u32) -> Handle {
        Handle::new(slot, self.nodes[slot as usize].identifier)
    }

    fn check_xform(store: &TransformStore, xform: Handle, op: &str) -> bool {
        if !store.is_valid(xform) {
            warn!("HierarchyGraph::{op}: invalid or stale transform {xform}");
            return false;
        }
        if store.is_attached(xform) {
            warn!("HierarchyGraph::{op}: transform {xform} already belongs to a node");
            return false;
        }
        true
    }

    /// Level a new child of `parent` would get.
    fn child_level(&self, parent: Handle, op: &str) -> Option<u8> {
        let p = self.resolve_or_warn(parent, op)?;
        let level = self.nodes[p as usize].level.checked_add(1);
        if level.is_none() {
            warn!("HierarchyGraph::{op}: {parent} is at the maximum depth");
        }
        level
    }

    fn insert(&mut self, store: &mut TransformStore, xform: Handle, parent: u32, level: u8) -> Handle {
        let slot = if let Some(slot) = self.free_list.pop() {
            slot
        } else {
            let slot = u32::try_from(self.nodes.len()).unwrap_or(ROOT);
            assert!(slot != ROOT, "hierarchy graph node count overflow");
            self.nodes.push(NodeSlot::vacant());
            slot
        };

        let identifier = self.ids.create();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.nodes[slot as usize] = NodeSlot {
            identifier,
            xform,
            parent,
            children: Default::default(),
            level,
            dirty: true,
            sequence,
        };

        if parent == ROOT {
            self.roots.push(slot);
        } else {
            self.nodes[parent as usize].children.push(slot);
        }
        self.owners.insert(xform.slot_index(), slot);
        store.set_attached(xform.slot_index(), true);

        self.live += 1;
        self.topology_dirty = true;
        Handle::new(slot, identifier)
    }

    /// Removes `slot` from its parent's child list (or the roots) and returns
    /// the position it occupied.
    fn unlink(&mut self, slot: u32) -> usize {
        let parent = self.nodes[slot as usize].parent;
        let position = if parent == ROOT {
            self.roots.iter().position(|&r| r == slot).map(|pos| {
                self.roots.remove(pos);
                pos
            })
        } else {
            self.nodes[parent as usize].remove_child(slot)
        };
        debug_assert!(position.is_some(), "node {slot} missing from its parent's children");
        position.unwrap_or(0)
    }

    /// True if `ancestor` is `node` or lies on the path from `node` to its
    /// root.
    fn is_ancestor_or_self(&self, ancestor: u32, mut node: u32) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            node = self.nodes[node as usize].parent;
            if node == ROOT {
                return false;
            }
        }
    }

    fn world_decomposed(
        &self,
        store: &TransformStore,
        node: Handle,
        op: &str,
    ) -> Option<(Vec3, Quat, Vec3)> {
        let i = self.resolve_or_warn(node, op)?;
        Some(
            store
                .world_get(self.nodes[i as usize].xform)
                .to_scale_rotation_translation(),
        )
    }
}

/// World matrix of the transform driven by node slot `parent`, identity if
/// that transform is gone.
fn parent_world(nodes: &[NodeSlot], store: &TransformStore, parent: u32) -> Mat4 {
    let xform = nodes[parent as usize].xform;
    if store.is_valid(xform) {
        store.world_at(xform.slot_index())
    } else {
        Mat4::IDENTITY
    }
}

/// Assigns `level` to `start` and consistent levels to its whole subtree,
/// marking every visited node dirty.
fn relevel(nodes: &mut [NodeSlot], start: u32, level: u8) {
    let mut stack: Vec<(u32, u8)> = Vec::with_capacity(16);
    stack.push((start, level));
    while let Some((slot, level)) = stack.pop() {
        let node = &mut nodes[slot as usize];
        node.level = level;
        node.dirty = true;
        // Callers check the depth limit before releveling downwards.
        let child_level = level.saturating_add(1);
        stack.extend(node.children.iter().map(|&c| (c, child_level)));
    }
}

/// Deepest level found in the subtree rooted at `start`.
fn subtree_depth(nodes: &[NodeSlot], start: u32) -> u8 {
    let mut deepest = 0;
    let mut stack = vec![start];
    while let Some(slot) = stack.pop() {
        let node = &nodes[slot as usize];
        deepest = deepest.max(node.level);
        stack.extend_from_slice(&node.children);
    }
    deepest
}

/// An iterator over the direct children of a node.
///
/// Created by [`HierarchyGraph::children`].
#[derive(Debug)]
pub struct Children<'a> {
    graph: &'a HierarchyGraph,
    slots: std::slice::Iter<'a, u32>,
}

impl Iterator for Children<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        self.slots.next().map(|&slot| self.graph.handle_at(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn setup() -> (TransformStore, HierarchyGraph) {
        init_logger();
        let ids = IdentifierSource::new();
        let store = TransformStore::with_identifiers(Default::default(), ids.clone()).unwrap();
        (store, HierarchyGraph::with_identifiers(ids))
    }

    /// Every live node's level is one more than its parent's.
    fn assert_levels(graph: &HierarchyGraph) {
        for node in graph.nodes.iter().filter(|n| n.is_live()) {
            if node.is_root() {
                assert_eq!(node.level, 0);
            } else {
                assert_eq!(node.level, graph.nodes[node.parent as usize].level + 1);
            }
            for &c in &node.children {
                assert!(graph.nodes[c as usize].is_live());
            }
        }
    }

    #[test]
    fn root_and_child_levels() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let child = graph.child_add(&mut store, root);
        let grandchild = graph.child_add(&mut store, child);

        assert_eq!(graph.level_get(root), Some(0));
        assert_eq!(graph.level_get(child), Some(1));
        assert_eq!(graph.level_get(grandchild), Some(2));
        assert_eq!(graph.parent_handle_get(grandchild), child);
        assert!(graph.parent_handle_get(root).is_invalid());
        assert_eq!(graph.len(), 3);
        assert_eq!(store.len(), 3);
        assert_levels(&graph);
    }

    #[test]
    fn node_and_transform_identifiers_never_collide() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let xform = graph.xform_handle_get(root);
        assert_ne!(root.identifier(), xform.identifier());
        assert!(!graph.is_valid(xform));
        assert!(!store.is_valid(root));
    }

    #[test]
    fn supplied_xform_is_attached_once() {
        let (mut store, mut graph) = setup();
        let xform = store.from_position(Vec3::X);
        let root = graph.root_add_with_xform(&mut store, xform);
        assert!(!root.is_invalid());
        assert!(store.is_attached(xform));

        // A transform can drive at most one node.
        assert!(graph.root_add_with_xform(&mut store, xform).is_invalid());
        assert!(graph.child_add_with_xform(&mut store, root, xform).is_invalid());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn invalid_inputs_yield_invalid_handles() {
        let (mut store, mut graph) = setup();
        assert!(graph.child_add(&mut store, Handle::INVALID).is_invalid());
        assert!(graph
            .root_add_with_xform(&mut store, Handle::INVALID)
            .is_invalid());
        assert!(graph.xform_handle_get(Handle::INVALID).is_invalid());
        assert!(graph.parent_xform_handle_get(Handle::INVALID).is_invalid());
        assert_eq!(graph.level_get(Handle::INVALID), None);
        assert_eq!(graph.children(Handle::INVALID).count(), 0);
        assert!(store.is_empty(), "failed child_add must not leak a transform");
    }

    #[test]
    fn depth_limit() {
        let (mut store, mut graph) = setup();
        let mut node = graph.root_add(&mut store);
        for _ in 0..u8::MAX {
            node = graph.child_add(&mut store, node);
            assert!(!node.is_invalid());
        }
        assert_eq!(graph.level_get(node), Some(u8::MAX));
        assert!(graph.child_add(&mut store, node).is_invalid());
    }

    #[test]
    fn update_composes_parent_then_child() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let child = graph.child_add(&mut store, root);
        let root_x = graph.xform_handle_get(root);
        let child_x = graph.xform_handle_get(child);

        store.position_set(root_x, Vec3::new(0.0, 2.0, 0.0));
        store.scale_set(root_x, Vec3::splat(2.0));
        store.position_set(child_x, Vec3::new(1.0, 0.0, 0.0));

        let summary = graph.update(&mut store, 1);
        assert_eq!(summary.recomputed_locals, 2);
        assert_eq!(summary.recomputed_worlds, 2);
        assert!(summary.view_rebuilt);

        let expected = store.world_get(root_x) * store.local_get(child_x);
        assert!(store.world_get(child_x).abs_diff_eq(expected, EPSILON));
        let p = graph.world_position_get(&store, child);
        assert!((p - Vec3::new(2.0, 2.0, 0.0)).length() < EPSILON, "got {p}");
        assert!((graph.world_scale_get(&store, child) - Vec3::splat(2.0)).length() < EPSILON);
        assert_eq!(graph.last_frame(), 1);
    }

    #[test]
    fn clean_graph_does_no_work() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        graph.child_add(&mut store, root);
        graph.update(&mut store, 1);

        let summary = graph.update(&mut store, 2);
        assert_eq!(summary, UpdateSummary::default());
    }

    #[test]
    fn dirty_parent_propagates_to_clean_descendants() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let a = graph.child_add(&mut store, root);
        let b = graph.child_add(&mut store, a);
        let other = graph.root_add(&mut store);
        graph.update(&mut store, 1);

        store.translate(graph.xform_handle_get(root), Vec3::Z);
        let summary = graph.update(&mut store, 2);
        assert_eq!(summary.recomputed_locals, 1);
        assert_eq!(summary.recomputed_worlds, 3, "root, a and b; not the other root");
        assert!(!summary.view_rebuilt);
        for node in [root, a, b, other] {
            assert!(!graph.is_dirty(node));
        }
        assert!((graph.world_position_get(&store, b) - Vec3::Z).length() < EPSILON);
    }

    #[test]
    fn calculate_local_before_update_still_reaches_world() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        graph.update(&mut store, 1);

        let xform = graph.xform_handle_get(root);
        store.position_set(xform, Vec3::Y);
        store.calculate_local(xform);
        graph.update(&mut store, 2);
        assert!((graph.world_position_get(&store, root) - Vec3::Y).length() < EPSILON);
    }

    #[test]
    fn remove_promotes_children_in_place() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let first = graph.child_add(&mut store, root);
        let mut middle = graph.child_add(&mut store, root);
        let last = graph.child_add(&mut store, root);
        let g1 = graph.child_add(&mut store, middle);
        let g2 = graph.child_add(&mut store, middle);
        let gg = graph.child_add(&mut store, g1);

        graph.node_remove(&mut store, &mut middle, true);
        assert!(middle.is_invalid());

        let children: Vec<Handle> = graph.children(root).collect();
        assert_eq!(children, vec![first, g1, g2, last]);
        assert_eq!(graph.parent_handle_get(g1), root);
        assert_eq!(graph.level_get(g1), Some(1));
        assert_eq!(graph.level_get(gg), Some(2));
        assert!(graph.is_dirty(gg));
        assert_levels(&graph);
    }

    #[test]
    fn removing_a_root_promotes_to_roots() {
        let (mut store, mut graph) = setup();
        let a = graph.root_add(&mut store);
        let mut b = graph.root_add(&mut store);
        let c = graph.root_add(&mut store);
        let b1 = graph.child_add(&mut store, b);
        let b2 = graph.child_add(&mut store, b);

        graph.node_remove(&mut store, &mut b, false);
        let roots: Vec<Handle> = graph.roots().collect();
        assert_eq!(roots, vec![a, b1, b2, c]);
        assert_eq!(graph.level_get(b1), Some(0));
        assert!(graph.parent_handle_get(b1).is_invalid());
        assert_levels(&graph);
    }

    #[test]
    fn remove_without_release_hands_back_transform() {
        let (mut store, mut graph) = setup();
        let mut node = graph.root_add(&mut store);
        let xform = graph.xform_handle_get(node);
        graph.node_remove(&mut store, &mut node, false);
        assert!(store.is_valid(xform));
        assert!(!store.is_attached(xform));

        let m = Mat4::from_translation(Vec3::ONE);
        store.world_set(xform, m);
        assert_eq!(store.world_get(xform), m);
    }

    #[test]
    fn removed_slot_is_reused_with_new_identity() {
        let (mut store, mut graph) = setup();
        let mut a = graph.root_add(&mut store);
        let stale = a;
        graph.node_remove(&mut store, &mut a, true);
        let b = graph.root_add(&mut store);
        assert_eq!(b.slot_index(), stale.slot_index());
        assert!(!graph.is_valid(stale));
        assert!(graph.xform_handle_get(stale).is_invalid());

        // Removing through the stale handle must not touch the new node.
        let mut stale = stale;
        graph.node_remove(&mut store, &mut stale, true);
        assert!(graph.is_valid(b));
    }

    #[test]
    fn attach_and_detach() {
        let (mut store, mut graph) = setup();
        let a = graph.root_add(&mut store);
        let b = graph.root_add(&mut store);
        let b1 = graph.child_add(&mut store, b);

        assert!(graph.node_attach(b, a));
        assert_eq!(graph.level_get(b), Some(1));
        assert_eq!(graph.level_get(b1), Some(2));
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![a]);

        // Cycles are refused.
        assert!(!graph.node_attach(a, b1));
        assert!(!graph.node_attach(a, a));

        assert!(graph.node_detach(b));
        assert_eq!(graph.level_get(b1), Some(1));
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![a, b]);
        assert!(graph.node_detach(b), "detaching a root is a no-op");
        assert_levels(&graph);
    }

    #[test]
    fn attach_respects_depth_limit() {
        let (mut store, mut graph) = setup();
        let mut deep = graph.root_add(&mut store);
        for _ in 0..u8::MAX {
            deep = graph.child_add(&mut store, deep);
        }
        let other = graph.root_add(&mut store);
        graph.child_add(&mut store, other);
        assert!(!graph.node_attach(other, deep));
        assert_eq!(graph.level_get(other), Some(0));
    }

    #[test]
    fn view_batches_follow_levels() {
        let (mut store, mut graph) = setup();
        let r1 = graph.root_add(&mut store);
        let r2 = graph.root_add(&mut store);
        let c = graph.child_add(&mut store, r2);
        graph.update(&mut store, 1);

        let view = graph.view();
        assert_eq!(view.depth(), 2);
        assert_eq!(view.batch(0), &[r1.slot_index(), r2.slot_index()]);
        assert_eq!(view.batch(1), &[c.slot_index()]);
    }

    #[test]
    fn destroyed_transform_does_not_break_update() {
        let (mut store, mut graph) = setup();
        let root = graph.root_add(&mut store);
        let child = graph.child_add(&mut store, root);
        let mut root_x = graph.xform_handle_get(root);
        store.destroy(&mut root_x);

        store.position_set(graph.xform_handle_get(child), Vec3::X);
        graph.update(&mut store, 1);
        assert!((graph.world_position_get(&store, child) - Vec3::X).length() < EPSILON);
    }
}
