//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumen_core::MaterialId;
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

use crate::hittable::{HitPayload, Hittable, Shape};

/// Möller-Trumbore intersection against a triangle given as `v0` plus edges.
///
/// Returns `(t, u, v)` with barycentrics `u` and `v` for any `t` in the line,
/// or `None` when the ray misses or is parallel to the triangle plane.
/// Callers apply the `ray_t` window.
#[inline]
pub(crate) fn moller_trumbore(ray: &Ray, v0: Vec3, edge1: Vec3, edge2: Vec3) -> Option<(f32, f32, f32)> {
    let h = ray.direction().cross(edge2);
    let det = edge1.dot(h);

    // Ray is parallel to triangle
    if det.abs() < f32::EPSILON {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction().dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    Some((f * edge2.dot(q), u, v))
}

/// Maps `(u, v)` in `[0, 1]^2` to a uniform point on a triangle.
#[inline]
pub(crate) fn sample_triangle(v0: Vec3, edge1: Vec3, edge2: Vec3, u: f32, v: f32) -> Vec3 {
    let su = u.sqrt();
    v0 + edge1 * (su * (1.0 - v)) + edge2 * (su * v)
}

/// A triangle primitive.
#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Face normal (unit length), counter-clockwise winding
    normal: Vec3,
    material: MaterialId,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let normal = edge1.cross(edge2).normalize_or_zero();

        Self {
            v0,
            edge1,
            edge2,
            normal,
            material,
            bbox: Aabb::from_point_cloud([v0, v1, v2]),
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v0 + self.edge1, self.v0 + self.edge2]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let Some((t, u, v)) = moller_trumbore(ray, self.v0, self.edge1, self.edge2) else {
            return false;
        };
        if !payload.accepts(ray_t, t) {
            return false;
        }

        payload.record(t, self.normal, self.material, Vec2::new(u, v));
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Triangle {
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
