//! Transform store and hierarchy graph.
//!
//! - [`xform`]: [`TransformStore`], struct-of-arrays transforms addressed by
//!   handle
//! - [`dirty`]: the store's deduplicated dirty list
//! - [`hierarchy`]: [`HierarchyGraph`], parent/child links and the per-frame
//!   world-matrix update
//! - [`node`] and [`view`]: the graph's node slots and its flattened,
//!   level-ordered walk
//!
//! ```rust,ignore
//! let ids = IdentifierSource::new();
//! let mut store = TransformStore::with_identifiers(StoreConfig::default(), ids.clone())?;
//! let mut graph = HierarchyGraph::with_identifiers(ids);
//!
//! let root = graph.root_add(&mut store);
//! let child = graph.child_add(&mut store, root);
//! store.position_set(graph.xform_handle_get(child), Vec3::X);
//!
//! graph.update(&mut store, frame);
//! let world = store.world_get(graph.xform_handle_get(child));
//! ```

pub mod dirty;
pub mod hierarchy;
pub mod node;
pub mod view;
pub mod xform;

pub use dirty::DirtyList;
pub use hierarchy::{Children, HierarchyGraph, UpdateSummary};
pub use node::{NodeSlot, ROOT};
pub use view::HierarchyView;
pub use xform::{TRANSFORM_STRING_FIELDS, TransformStore, compose_local};
