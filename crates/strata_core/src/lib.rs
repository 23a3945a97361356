//! Foundational types shared by the Strata crates.
//!
//! - [`id`]: identifiers, handles and the identifier source
//! - [`errors`]: [`StrataError`] and the crate-wide [`Result`] alias
//! - [`config`]: [`StoreConfig`]
//! - [`math`]: the `glam` types used throughout

pub mod config;
pub mod errors;
pub mod id;

/// Math types used by the transform store and hierarchy graph.
pub mod math {
    pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec3, Vec4};
}

pub use config::StoreConfig;
pub use errors::{Result, StrataError};
pub use id::{Handle, INVALID_INDEX, Identifier, IdentifierSource};
