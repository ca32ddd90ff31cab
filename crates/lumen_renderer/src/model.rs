//! Mesh models: one shared BVH handed out as BLAS instances.

use std::sync::Arc;
use std::time::Instant;

use lumen_core::{MaterialError, MaterialLibrary, Mesh, MeshError};
use lumen_math::Transform;
use thiserror::Error;

use crate::blas::Blas;
use crate::bvh::Bvh;
use crate::polygon::Polygon;
use crate::primitive::Primitive;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid mesh {index}: {source}")]
    Mesh {
        index: usize,
        #[source]
        source: MeshError,
    },

    #[error(transparent)]
    Material(#[from] MaterialError),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// A set of meshes built into a single BVH of polygons.
///
/// The BVH is reference counted, so every instance shares the geometry and
/// differs only in its transform.
#[derive(Debug, Clone)]
pub struct Model {
    meshes: Vec<Arc<Mesh>>,
    bvh: Arc<Bvh>,
    /// Faces whose material emitted when the model was built
    emissive: usize,
}

impl Model {
    /// Build a model. Meshes get smooth normals if they have none, and
    /// tangents when a face uses a normal map.
    pub fn new(meshes: Vec<Mesh>, materials: &MaterialLibrary) -> ModelResult<Self> {
        let start = Instant::now();
        let mut shared = Vec::with_capacity(meshes.len());
        let mut primitives = Vec::new();
        let mut emissive = 0;

        for (index, mut mesh) in meshes.into_iter().enumerate() {
            mesh.validate()
                .map_err(|source| ModelError::Mesh { index, source })?;
            mesh.ensure_normals();

            let mut face_bumps = Vec::with_capacity(mesh.triangle_count());
            for face in 0..mesh.triangle_count() {
                let id = mesh.face_material(face);
                let material = materials.get(id).ok_or(MaterialError::Unknown(id))?;
                face_bumps.push(material.bump.clone());
            }
            if mesh.tangents.is_none() && face_bumps.iter().any(Option::is_some) {
                mesh.compute_tangents();
            }

            let mesh = Arc::new(mesh);
            for (face, bump) in face_bumps.into_iter().enumerate() {
                let polygon: Primitive = Polygon::new(Arc::clone(&mesh), face, bump).into();
                if materials
                    .get(polygon.material())
                    .is_some_and(|material| material.is_emissive())
                {
                    emissive += 1;
                }
                primitives.push(polygon);
            }
            shared.push(mesh);
        }

        let bvh = Arc::new(Bvh::new(primitives));
        log::info!(
            "Model built: {} meshes, {} polygons, {} emissive, {:.2?}",
            shared.len(),
            bvh.len(),
            emissive,
            start.elapsed()
        );

        Ok(Self {
            meshes: shared,
            bvh,
            emissive,
        })
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    pub fn bvh(&self) -> &Arc<Bvh> {
        &self.bvh
    }

    pub fn triangle_count(&self) -> usize {
        self.bvh.len()
    }

    pub fn emissive_count(&self) -> usize {
        self.emissive
    }

    /// A new instance sharing this model's BVH.
    pub fn instantiate(&self, transform: &Transform) -> Blas {
        Blas::new(Arc::clone(&self.bvh)).with_transform(transform.to_matrix())
    }
}
