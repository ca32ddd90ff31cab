//! Indexed triangle meshes.
//!
//! Meshes arrive from an external loader as flat arrays. Faces are wound
//! counter-clockwise when seen from the side the normal points to.

use lumen_math::{Aabb, Vec2, Vec3};
use thiserror::Error;

use crate::material::MaterialId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MeshError {
    #[error("Index count {0} is not a multiple of 3")]
    RaggedIndices(usize),

    #[error("Face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{attribute} has {found} entries, expected {expected}")]
    AttributeCount {
        attribute: &'static str,
        found: usize,
        expected: usize,
    },
}

/// A mesh consisting of vertex positions, optional vertex attributes,
/// triangle indices and one material per face.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, see `compute_normals`)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional, one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Tangents aligned with +U (optional, see `compute_tangents`)
    pub tangents: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Material of each triangle
    pub face_materials: Vec<MaterialId>,

    pub bounds: Aabb,
}

impl Mesh {
    /// Create a mesh where every face uses `material`.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, material: MaterialId) -> Self {
        let bounds = Aabb::from_point_cloud(positions.iter().copied());
        let face_materials = vec![material; indices.len() / 3];
        Self {
            positions,
            normals: None,
            uvs: None,
            tangents: None,
            indices,
            face_materials,
            bounds,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_face_materials(mut self, face_materials: Vec<MaterialId>) -> Self {
        self.face_materials = face_materials;
        self
    }

    /// Check that indices and attribute arrays are consistent.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(self.indices.len()));
        }

        let vertex_count = self.positions.len();
        for (i, &index) in self.indices.iter().enumerate() {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    face: i / 3,
                    index,
                    vertex_count,
                });
            }
        }

        let check = |attribute, found, expected| {
            if found == expected {
                Ok(())
            } else {
                Err(MeshError::AttributeCount {
                    attribute,
                    found,
                    expected,
                })
            }
        };
        check("face_materials", self.face_materials.len(), self.triangle_count())?;
        if let Some(normals) = &self.normals {
            check("normals", normals.len(), vertex_count)?;
        }
        if let Some(uvs) = &self.uvs {
            check("uvs", uvs.len(), vertex_count)?;
        }
        if let Some(tangents) = &self.tangents {
            check("tangents", tangents.len(), vertex_count)?;
        }
        Ok(())
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for face in 0..self.triangle_count() {
            let [i0, i1, i2] = self.face(face);
            let [p0, p1, p2] = self.triangle(face);

            // Counter-clockwise winding, length is twice the area
            let face_normal = (p1 - p0).cross(p2 - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            // Default up normal for degenerate cases
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has per-vertex normals, computing them if necessary.
    /// Also recomputes if existing normals don't match vertex count.
    pub fn ensure_normals(&mut self) {
        let should_compute = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };

        if should_compute {
            if let Some(normals) = &self.normals {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Compute per-vertex tangents from UVs for normal mapping.
    ///
    /// Tangents follow +U and are orthogonalized against the vertex normal.
    /// Does nothing without UVs. Computes normals first if missing.
    pub fn compute_tangents(&mut self) {
        let Some(uvs) = self.uvs.as_ref() else {
            return;
        };
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];

        for face in 0..self.triangle_count() {
            let [i0, i1, i2] = self.face(face);
            let [p0, p1, p2] = self.triangle(face);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let d1 = uvs[i1] - uvs[i0];
            let d2 = uvs[i2] - uvs[i0];

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let tangent = (e1 * d2.y - e2 * d1.y) / det;

            accumulated[i0] += tangent;
            accumulated[i1] += tangent;
            accumulated[i2] += tangent;
        }

        self.ensure_normals();
        let normals = self.normals.as_deref().unwrap_or_default();

        let tangents = accumulated
            .iter()
            .zip(normals)
            .map(|(&t, &n)| {
                // Gram-Schmidt
                let t = t - n * n.dot(t);
                t.try_normalize().unwrap_or_else(|| fallback_tangent(n))
            })
            .collect();

        self.tangents = Some(tangents);
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Vertex indices of a triangle.
    #[inline]
    pub fn face(&self, face: usize) -> [usize; 3] {
        let base = face * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Vertex positions of a triangle.
    #[inline]
    pub fn triangle(&self, face: usize) -> [Vec3; 3] {
        self.face(face).map(|i| self.positions[i])
    }

    pub fn face_material(&self, face: usize) -> MaterialId {
        self.face_materials[face]
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Any unit vector perpendicular to `n`.
fn fallback_tangent(n: Vec3) -> Vec3 {
    let axis = if n.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
    n.cross(axis).normalize()
}
