//! Hittable traits and the HitPayload carried along a ray.

use lumen_core::MaterialId;
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// Closest intersection found so far along a ray.
///
/// `t` starts at infinity. Intersection routines only write the payload when
/// their candidate lies strictly inside the `ray_t` window and is closer than
/// the current `t`, so a payload can be threaded through any number of
/// primitives and keeps the nearest one.
#[derive(Debug, Clone, Copy)]
pub struct HitPayload {
    pub t: f32,
    /// Geometric or shading normal, not flipped toward the ray
    pub normal: Vec3,
    pub material: Option<MaterialId>,
    pub texcoord: Vec2,
    /// Object-space ray, set when the hit came through an instance
    pub local_ray: Option<Ray>,
}

impl Default for HitPayload {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            normal: Vec3::ZERO,
            material: None,
            texcoord: Vec2::ZERO,
            local_ray: None,
        }
    }
}

impl HitPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hit(&self) -> bool {
        self.t < f32::INFINITY
    }

    /// Returns true when `t` may replace the current hit.
    #[inline]
    pub fn accepts(&self, ray_t: Interval, t: f32) -> bool {
        ray_t.surrounds(t) && t < self.t
    }

    /// Overwrite the payload with a new closest hit.
    #[inline]
    pub fn record(&mut self, t: f32, normal: Vec3, material: MaterialId, texcoord: Vec2) {
        self.t = t;
        self.normal = normal;
        self.material = Some(material);
        self.texcoord = texcoord;
        self.local_ray = None;
    }
}

/// Trait for anything a ray can be traced against.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within the given interval.
    ///
    /// Returns true if the payload was updated with a closer hit.
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// Capabilities of a single geometric primitive.
pub trait Shape: Hittable {
    /// Point used to sort primitives during BVH construction.
    fn centroid(&self) -> Vec3;

    /// Map `(u, v)` in `[0, 1]^2` to a point uniformly distributed on the surface.
    fn sample_uniform(&self, u: f32, v: f32) -> Vec3;

    fn surface_area(&self) -> f32;
}

/// Brute-force closest hit over a list of objects.
impl<T: Hittable> Hittable for [T] {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let mut hit_anything = false;
        let mut window = ray_t.shrink_to(payload.t);

        for object in self {
            if object.hit(ray, window, payload) {
                hit_anything = true;
                window = window.shrink_to(payload.t);
            }
        }

        hit_anything
    }

    fn bounding_box(&self) -> Aabb {
        self.iter()
            .fold(Aabb::EMPTY, |bbox, object| Aabb::surrounding(&bbox, &object.bounding_box()))
    }
}

impl<T: Hittable> Hittable for Vec<T> {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        self.as_slice().hit(ray, ray_t, payload)
    }

    fn bounding_box(&self) -> Aabb {
        self.as_slice().bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_starts_as_miss() {
        let payload = HitPayload::new();
        assert!(!payload.is_hit());
        assert_eq!(payload.t, f32::INFINITY);
        assert!(payload.material.is_none());
    }

    #[test]
    fn test_payload_accepts_only_closer_hits_inside_window() {
        let mut payload = HitPayload::new();
        let window = Interval::new(0.001, 100.0);

        assert!(payload.accepts(window, 5.0));
        payload.record(5.0, Vec3::Z, MaterialId(0), Vec2::ZERO);

        assert!(payload.accepts(window, 4.0));
        assert!(!payload.accepts(window, 6.0));
        assert!(!payload.accepts(window, 0.0005));
        assert!(!payload.accepts(Interval::new(0.001, 3.0), 4.0));
    }
}
