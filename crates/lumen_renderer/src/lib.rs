//! lumen renderer - CPU path tracing
//!
//! A progressive Monte Carlo path tracer:
//!
//! - **Geometry**: [`Sphere`], [`Triangle`], [`Cuboid`] and mesh [`Polygon`]
//!   primitives behind the closed [`Primitive`] type
//! - **Acceleration**: SAH [`Bvh`] over primitives, [`Blas`] instances
//!   sharing a BVH, and a [`Tlas`] over instances
//! - **Shading**: GGX + Lambert [`Bxdf`] with next-event estimation toward
//!   area [`Light`]s
//! - **Output**: a multithreaded [`Renderer`] with frame accumulation

mod bands;
mod blas;
mod bvh;
mod bxdf;
mod camera;
mod cuboid;
mod hittable;
mod integrator;
mod light;
mod model;
mod polygon;
mod primitive;
mod renderer;
mod scene;
mod settings;
mod sphere;
mod tlas;
mod tree;
mod triangle;

pub mod sampling;

pub use bands::{generate_bands, lines_per_band, Band};
pub use blas::Blas;
pub use bvh::Bvh;
pub use bxdf::{Bxdf, MIN_ROUGHNESS, PDF_EPSILON};
pub use camera::Camera;
pub use cuboid::Cuboid;
pub use hittable::{HitPayload, Hittable, Shape};
pub use integrator::{MissShader, PathTracer, RAY_OFFSET};
pub use light::{Light, ShadowRay};
pub use model::{Model, ModelError, ModelResult};
pub use polygon::Polygon;
pub use primitive::Primitive;
pub use renderer::{pack_rgba, ImageView, RenderError, RenderResult, Renderer};
pub use scene::{instance_bounds, Scene, SceneView};
pub use settings::{available_threads, RenderSettings, SettingsError, SettingsResult};
pub use sphere::Sphere;
pub use tlas::Tlas;
pub use tree::SplitMethod;
pub use triangle::Triangle;

/// Re-export common math types from lumen_math
pub use lumen_math::{Aabb, Interval, Ray, Transform, Vec2, Vec3};
