//! Closed set of geometric primitives.

use lumen_core::MaterialId;
use lumen_math::{Aabb, Interval, Ray, Vec3};

use crate::cuboid::Cuboid;
use crate::hittable::{HitPayload, Hittable, Shape};
use crate::polygon::Polygon;
use crate::sphere::Sphere;
use crate::triangle::Triangle;

/// Any primitive the acceleration structures can hold.
///
/// Dispatch is a `match`, which keeps the traversal loop free of virtual calls.
#[derive(Debug, Clone)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
    Cuboid(Cuboid),
    Polygon(Polygon),
}

macro_rules! dispatch {
    ($self:ident, $shape:ident => $body:expr) => {
        match $self {
            Primitive::Sphere($shape) => $body,
            Primitive::Triangle($shape) => $body,
            Primitive::Cuboid($shape) => $body,
            Primitive::Polygon($shape) => $body,
        }
    };
}

impl Primitive {
    /// Material of the primitive. Cuboids report the material of their faces.
    pub fn material(&self) -> MaterialId {
        match self {
            Primitive::Sphere(s) => s.material(),
            Primitive::Triangle(t) => t.material(),
            Primitive::Cuboid(c) => c.triangles()[0].material(),
            Primitive::Polygon(p) => p.material(),
        }
    }
}

impl Hittable for Primitive {
    #[inline]
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        dispatch!(self, shape => shape.hit(ray, ray_t, payload))
    }

    fn bounding_box(&self) -> Aabb {
        dispatch!(self, shape => shape.bounding_box())
    }
}

impl Shape for Primitive {
    fn centroid(&self) -> Vec3 {
        dispatch!(self, shape => shape.centroid())
    }

    fn sample_uniform(&self, u: f32, v: f32) -> Vec3 {
        dispatch!(self, shape => shape.sample_uniform(u, v))
    }

    fn surface_area(&self) -> f32 {
        dispatch!(self, shape => shape.surface_area())
    }
}

impl From<Sphere> for Primitive {
    fn from(sphere: Sphere) -> Self {
        Primitive::Sphere(sphere)
    }
}

impl From<Triangle> for Primitive {
    fn from(triangle: Triangle) -> Self {
        Primitive::Triangle(triangle)
    }
}

impl From<Cuboid> for Primitive {
    fn from(cuboid: Cuboid) -> Self {
        Primitive::Cuboid(cuboid)
    }
}

impl From<Polygon> for Primitive {
    fn from(polygon: Polygon) -> Self {
        Primitive::Polygon(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_shape() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, MaterialId(5));
        let primitive = Primitive::from(sphere.clone());

        assert_eq!(primitive.material(), MaterialId(5));
        assert_eq!(primitive.centroid(), sphere.centroid());
        assert_eq!(primitive.surface_area(), sphere.surface_area());
        assert_eq!(primitive.bounding_box(), sphere.bounding_box());

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut payload = HitPayload::new();
        assert!(primitive.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut payload));
        assert!((payload.t - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_list_keeps_closest_primitive() {
        let primitives: Vec<Primitive> = vec![
            Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, MaterialId(0)).into(),
            Cuboid::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -4.0), MaterialId(1)).into(),
            Triangle::new(
                Vec3::new(-1.0, -1.0, -8.0),
                Vec3::new(1.0, -1.0, -8.0),
                Vec3::new(0.0, 1.0, -8.0),
                MaterialId(2),
            )
            .into(),
        ];

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut payload = HitPayload::new();
        assert!(primitives.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut payload));
        assert!((payload.t - 4.0).abs() < 0.001);
        assert_eq!(payload.material, Some(MaterialId(1)));
    }
}
