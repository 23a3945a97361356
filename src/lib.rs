//! # Strata
//!
//! Handle-indirected transforms and scene hierarchy for real-time engines.
//!
//! Subsystems hold copyable [`Handle`]s instead of pointers into resizable
//! arrays. A handle kept past the destruction of its object is detected and
//! rejected, even after the slot has been reused.
//!
//! - [`TransformStore`]: position, rotation and scale plus cached local and
//!   world matrices, in struct-of-arrays layout
//! - [`HierarchyGraph`]: parent/child links over transforms, composing world
//!   matrices once per frame
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! let ids = IdentifierSource::new();
//! let mut store = TransformStore::with_identifiers(StoreConfig::default(), ids.clone())?;
//! let mut graph = HierarchyGraph::with_identifiers(ids);
//!
//! let root = graph.root_add(&mut store);
//! let child = graph.child_add(&mut store, root);
//! store.position_set(graph.xform_handle_get(child), Vec3::new(1.0, 0.0, 0.0));
//! store.position_set(graph.xform_handle_get(root), Vec3::new(5.0, 0.0, 0.0));
//!
//! graph.update(&mut store, 0);
//! assert_eq!(graph.world_position_get(&store, child), Vec3::new(6.0, 0.0, 0.0));
//! ```
//!
//! The libraries log through the `log` facade and never install a logger.

pub use strata_core::math;
pub use strata_core::{
    Handle, INVALID_INDEX, Identifier, IdentifierSource, Result, StoreConfig, StrataError,
};
pub use strata_scene::{HierarchyGraph, HierarchyView, TransformStore, UpdateSummary};

/// Everything needed to drive a store and a graph.
pub mod prelude {
    pub use crate::math::{Mat4, Quat, Vec3};
    pub use crate::{
        Handle, HierarchyGraph, IdentifierSource, StoreConfig, StrataError, TransformStore,
        UpdateSummary,
    };
}
