//! Mesh face primitive with smooth shading and normal mapping.

use std::sync::Arc;

use lumen_core::{MaterialId, Mesh, Texture};
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

use crate::hittable::{HitPayload, Hittable, Shape};
use crate::triangle::{moller_trumbore, sample_triangle};

/// One triangle of a shared [`Mesh`].
///
/// Vertex attributes stay in the mesh and are looked up on hit.
#[derive(Debug, Clone)]
pub struct Polygon {
    mesh: Arc<Mesh>,
    face: usize,
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
    material: MaterialId,
    /// Tangent-space normal map of the face's material
    bump: Option<Arc<Texture>>,
    bbox: Aabb,
}

impl Polygon {
    /// The mesh must have passed [`Mesh::validate`].
    pub fn new(mesh: Arc<Mesh>, face: usize, bump: Option<Arc<Texture>>) -> Self {
        let [v0, v1, v2] = mesh.triangle(face);
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        Self {
            face,
            v0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
            material: mesh.face_material(face),
            bump,
            bbox: Aabb::from_point_cloud([v0, v1, v2]),
            mesh,
        }
    }

    pub fn face(&self) -> usize {
        self.face
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Interpolated shading normal and texcoord at barycentrics `(u, v)`.
    fn shade(&self, u: f32, v: f32) -> (Vec3, Vec2) {
        let w = 1.0 - u - v;
        let [i0, i1, i2] = self.mesh.face(self.face);

        let texcoord = match &self.mesh.uvs {
            Some(uvs) => uvs[i0] * w + uvs[i1] * u + uvs[i2] * v,
            None => Vec2::new(u, v),
        };

        let normal = match &self.mesh.normals {
            Some(normals) => (normals[i0] * w + normals[i1] * u + normals[i2] * v)
                .try_normalize()
                .unwrap_or(self.normal),
            None => self.normal,
        };

        let normal = match (&self.bump, &self.mesh.tangents) {
            (Some(bump), Some(tangents)) => {
                let tangent = tangents[i0] * w + tangents[i1] * u + tangents[i2] * v;
                perturb_normal(normal, tangent, bump.sample(texcoord))
            }
            _ => normal,
        };

        (normal, texcoord)
    }
}

/// Apply a tangent-space normal map texel (`[0, 1]` encoded) to `normal`.
fn perturb_normal(normal: Vec3, tangent: Vec3, texel: Vec3) -> Vec3 {
    let Some(tangent) = (tangent - normal * normal.dot(tangent)).try_normalize() else {
        return normal;
    };
    let bitangent = normal.cross(tangent);
    let local = texel * 2.0 - Vec3::ONE;

    (tangent * local.x + bitangent * local.y + normal * local.z)
        .try_normalize()
        .unwrap_or(normal)
}

impl Hittable for Polygon {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let Some((t, u, v)) = moller_trumbore(ray, self.v0, self.edge1, self.edge2) else {
            return false;
        };
        if !payload.accepts(ray_t, t) {
            return false;
        }

        let (normal, texcoord) = self.shade(u, v);
        payload.record(t, normal, self.material, texcoord);
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Polygon {
    fn centroid(&self) -> Vec3 {
        self.v0 + (self.edge1 + self.edge2) / 3.0
    }

    fn sample_uniform(&self, u: f32, v: f32) -> Vec3 {
        sample_triangle(self.v0, self.edge1, self.edge2, u, v)
    }

    fn surface_area(&self) -> f32 {
        0.5 * self.edge1.cross(self.edge2).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAT: MaterialId = MaterialId(4);

    /// Unit quad in XY facing +Z, with UVs and tangents.
    fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let uvs = positions.iter().map(|p| Vec2::new(p.x, p.y)).collect();
        let mut mesh = Mesh::new(positions, vec![0, 1, 2, 0, 2, 3], MAT).with_uvs(uvs);
        mesh.compute_tangents();
        mesh
    }

    fn cast(polygon: &Polygon, x: f32, y: f32) -> Option<HitPayload> {
        let ray = Ray::new(Vec3::new(x, y, 2.0), Vec3::NEG_Z);
        let mut payload = HitPayload::new();
        polygon
            .hit(&ray, Interval::new(0.001, f32::INFINITY), &mut payload)
            .then_some(payload)
    }

    #[test]
    fn test_polygon_hit_uses_mesh_attributes() {
        let mesh = Arc::new(quad());
        let polygon = Polygon::new(mesh, 0, None);

        let payload = cast(&polygon, 0.75, 0.25).unwrap();
        assert!((payload.t - 2.0).abs() < 0.001);
        assert_eq!(payload.material, Some(MAT));
        assert!((payload.texcoord - Vec2::new(0.75, 0.25)).length() < 0.001);
        assert!((payload.normal - Vec3::Z).length() < 0.001);

        // Point in the other triangle of the quad
        assert!(cast(&polygon, 0.25, 0.75).is_none());
    }

    #[test]
    fn test_smooth_normals_are_interpolated() {
        let mut mesh = quad();
        let tilted = Vec3::new(1.0, 0.0, 1.0).normalize();
        mesh.normals = Some(vec![Vec3::Z, tilted, tilted, Vec3::Z]);
        let polygon = Polygon::new(Arc::new(mesh), 0, None);

        let near_v0 = cast(&polygon, 0.01, 0.005).unwrap();
        let near_v1 = cast(&polygon, 0.99, 0.005).unwrap();
        assert!(near_v0.normal.x < 0.05);
        assert!(near_v1.normal.x > 0.65);
        assert!((near_v1.normal.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_flat_normal_map_keeps_normal() {
        let flat = Texture::solid_color(Vec3::new(0.5, 0.5, 1.0));
        let polygon = Polygon::new(Arc::new(quad()), 0, Some(Arc::new(flat)));

        let payload = cast(&polygon, 0.6, 0.2).unwrap();
        assert!((payload.normal - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_normal_map_tilts_toward_tangent() {
        // Texel (1, 0.5, 0.5) decodes to +tangent, which is +X here
        let tilt = Texture::solid_color(Vec3::new(1.0, 0.5, 0.5));
        let polygon = Polygon::new(Arc::new(quad()), 0, Some(Arc::new(tilt)));

        let payload = cast(&polygon, 0.6, 0.2).unwrap();
        assert!((payload.normal - Vec3::X).length() < 0.001, "normal {:?}", payload.normal);
    }

    #[test]
    fn test_area_and_centroid() {
        let polygon = Polygon::new(Arc::new(quad()), 1, None);
        assert!((polygon.surface_area() - 0.5).abs() < 0.001);
        assert!((polygon.centroid() - Vec3::new(1.0 / 3.0, 2.0 / 3.0, 0.0)).length() < 0.001);
    }
}
