//! Math primitives for lumen.
//!
//! Re-exports glam and adds the ray tracing value types shared by every
//! other crate: [`Interval`], [`Aabb`], [`Ray`], plus transform helpers.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{Mat4Ext, Transform};
