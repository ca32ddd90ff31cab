//! Bottom-level acceleration structure: one shared BVH plus a transform.
//!
//! Instead of duplicating geometry per instance, every [`Blas`] points at the
//! same immutable [`Bvh`] in object space and moves rays into that space.
//! Cloning a BLAS is cheap and yields an independent instance.

use std::sync::Arc;

use lumen_core::MaterialLibrary;
use lumen_math::{Aabb, Interval, Mat4, Mat4Ext, Ray};

use crate::bvh::Bvh;
use crate::hittable::{HitPayload, Hittable};
use crate::light::Light;

/// An instance of a shared BVH placed in the world by a transform.
#[derive(Debug, Clone)]
pub struct Blas {
    bvh: Arc<Bvh>,

    /// Object-to-world
    transform: Mat4,

    /// World-to-object, for ray transformation
    inverse_transform: Mat4,

    /// Inverse transpose of `transform`, for normals
    normal_matrix: Mat4,

    /// World-space box around the transformed BVH bounds
    bbox: Aabb,
}

impl Blas {
    /// Create an instance with the identity transform.
    pub fn new(bvh: Arc<Bvh>) -> Self {
        let bbox = bvh.bounding_box();
        Self {
            bvh,
            transform: Mat4::IDENTITY,
            inverse_transform: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            bbox,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.set_transform(transform);
        self
    }

    /// Place the instance. Recomputes the inverse and the world bounds.
    ///
    /// The world box is the hull of the eight transformed corners of the
    /// object-space box, which is conservative under rotation.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.inverse_transform = transform.inverse();
        self.normal_matrix = self.inverse_transform.transpose();
        self.bbox = transform.transform_aabb(&self.bvh.bounding_box());
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn inverse_transform(&self) -> Mat4 {
        self.inverse_transform
    }

    pub fn bvh(&self) -> &Arc<Bvh> {
        &self.bvh
    }

    /// Lights for the emissive faces of this instance, placed by its transform.
    pub fn lights(&self, materials: &MaterialLibrary) -> Vec<Light> {
        Light::collect(self.bvh.primitives(), materials)
            .into_iter()
            .map(|light| light.with_transform(self.transform))
            .collect()
    }

    /// True when both instances reference the same BVH.
    pub fn shares_geometry(&self, other: &Blas) -> bool {
        Arc::ptr_eq(&self.bvh, &other.bvh)
    }
}

impl Hittable for Blas {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let window = ray_t.shrink_to(payload.t);
        if self.bbox.intersect(ray, window) == f32::INFINITY {
            return false;
        }

        // Unnormalized direction keeps object-space t equal to world t
        let local_ray = self.inverse_transform.transform_ray(ray);
        if !self.bvh.hit(&local_ray, window, payload) {
            return false;
        }

        payload.normal = self
            .normal_matrix
            .transform_vector3(payload.normal)
            .normalize_or_zero();
        payload.local_ray = Some(local_ray);
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::tests::{random_scene, ray_fixtures};
    use crate::sphere::Sphere;
    use lumen_core::MaterialId;
    use lumen_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sphere_bvh() -> Arc<Bvh> {
        Arc::new(Bvh::new(vec![Sphere::new(Vec3::ZERO, 1.0, MaterialId(0)).into()]))
    }

    #[test]
    fn test_identity_instance_matches_bvh() {
        let blas = Blas::new(sphere_bvh());
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let mut payload = HitPayload::new();

        assert!(blas.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut payload));
        assert!((payload.t - 4.0).abs() < 0.001);
        assert!((payload.normal - Vec3::Z).length() < 0.001);
        assert!(payload.local_ray.is_some());
    }

    #[test]
    fn test_translated_instance() {
        let blas = Blas::new(sphere_bvh()).with_transform(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        let window = Interval::new(0.001, f32::INFINITY);

        // The original location is empty now
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let mut payload = HitPayload::new();
        assert!(!blas.hit(&ray, window, &mut payload));

        let ray = Ray::new(Vec3::new(10.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(blas.hit(&ray, window, &mut payload));
        assert!((payload.t - 4.0).abs() < 0.001);

        let local = payload.local_ray.unwrap();
        assert!((local.origin - Vec3::new(0.0, 0.0, 5.0)).length() < 0.001);
        assert!((blas.bounding_box().centroid() - Vec3::new(10.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_rigid_instance_matches_inverse_transformed_ray() {
        let mut rng = StdRng::seed_from_u64(42);
        let bvh = Arc::new(Bvh::new(random_scene(&mut rng, 60)));
        let transform = Mat4::from_translation(Vec3::new(3.0, -2.0, 7.5))
            * Mat4::from_rotation_y(0.8)
            * Mat4::from_rotation_x(-0.3);
        let blas = Blas::new(bvh.clone()).with_transform(transform);
        let inverse = transform.inverse();
        let window = Interval::new(0.001, f32::INFINITY);

        let mut hits = 0;
        for ray in ray_fixtures(&mut rng) {
            let mut expected = HitPayload::new();
            let local_ray = inverse.transform_ray(&ray);
            let direct = bvh.hit(&local_ray, window, &mut expected);

            let mut actual = HitPayload::new();
            let instanced = blas.hit(&ray, window, &mut actual);

            assert_eq!(direct, instanced, "ray {:?}", ray);
            if direct {
                hits += 1;
                assert!((expected.t - actual.t).abs() < 1e-3, "t {} vs {}", expected.t, actual.t);
                assert_eq!(expected.material, actual.material);

                // Normal rotated into world space
                let world_normal = transform.transform_vector3(expected.normal).normalize();
                assert!((world_normal - actual.normal).length() < 1e-3);
            }
        }
        assert!(hits > 50);
    }

    #[test]
    fn test_clones_share_geometry_with_independent_transforms() {
        let original = Blas::new(sphere_bvh());
        let mut copy = original.clone();
        copy.set_transform(Mat4::from_translation(Vec3::Y * 4.0));

        assert!(copy.shares_geometry(&original));
        assert_eq!(original.transform(), Mat4::IDENTITY);
        assert_ne!(copy.bounding_box(), original.bounding_box());
        assert_eq!(Arc::strong_count(original.bvh()), 2);
    }
}
