//! Sphere primitive for ray tracing.

use lumen_core::MaterialId;
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

use crate::hittable::{HitPayload, Hittable, Shape};

/// Smallest radius a sphere is built with. Hit normals divide by the radius.
const MIN_RADIUS: f32 = 0.0001;

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: MaterialId,
    bbox: Aabb,
}

impl Sphere {
    /// Radii below [`MIN_RADIUS`] (and NaN) are raised to it.
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        let radius = radius.max(MIN_RADIUS);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let oc = self.center - ray.origin;
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();
        let window = ray_t.shrink_to(payload.t);

        // Nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !window.surrounds(root) {
            root = (h + sqrtd) / a;
            if !window.surrounds(root) {
                return false;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        payload.record(root, outward_normal, self.material, Self::sphere_uv(outward_normal));
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Sphere {
    fn centroid(&self) -> Vec3 {
        self.center
    }

    fn sample_uniform(&self, u: f32, v: f32) -> Vec3 {
        let z = 1.0 - 2.0 * u;
        let r = (1.0 - z * z).max(0.0).sqrt();
        let phi = 2.0 * PI * v;
        self.center + self.radius * Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    fn surface_area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }
}
