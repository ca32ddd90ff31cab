//! lumen core - scene assets consumed by the renderer.
//!
//! This crate provides:
//!
//! - **Textures**: [`Texture`] images with bilinear lookup and a [`TextureCache`]
//! - **Materials**: [`Material`] texture slots and the [`MaterialLibrary`]
//!   that hands out stable [`MaterialId`] handles
//! - **Meshes**: indexed triangle [`Mesh`] data with normals, UVs and tangents

pub mod material;
pub mod mesh;
pub mod texture;

// Re-export commonly used types
pub use material::{Material, MaterialError, MaterialId, MaterialLibrary, TextureSlot};
pub use mesh::{Mesh, MeshError};
pub use texture::{ColorSpace, Texture, TextureCache, TextureError, TextureResult};
