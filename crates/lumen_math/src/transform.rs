// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and
// inverse(); these helpers add the box and ray forms used by instancing.

use glam::{EulerRot, Mat4, Vec3};

use crate::{Aabb, Ray};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a ray: origin as a point, direction as a vector.
    ///
    /// The direction is not renormalized, so a parameter `t` along the
    /// result names the same point as `t` along the input.
    fn transform_ray(&self, ray: &Ray) -> Ray;

    /// Matrix for transforming normals (inverse transpose).
    fn normal_matrix(&self) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        Aabb::from_point_cloud(aabb.corners().map(|corner| self.transform_point3(corner)))
    }

    fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point3(ray.origin),
            self.transform_vector3(ray.direction()),
        )
    }

    fn normal_matrix(&self) -> Mat4 {
        self.inverse().transpose()
    }
}

/// Placement of an object instance: translation plus XYZ Euler rotation.
///
/// The matrix applies the rotation first, then the translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Rotation angles in degrees around X, Y and Z.
    pub rotation_degrees: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation_degrees: Vec3::ZERO,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation_degrees(mut self, degrees: Vec3) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn to_matrix(&self) -> Mat4 {
        let r = self.rotation_degrees;
        let rotation = Mat4::from_euler(
            EulerRot::XYZ,
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        );
        Mat4::from_translation(self.translation) * rotation
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_translation_times_inverse_is_identity() {
        let mat = Mat4::from_translation(Vec3::new(3.0, -7.5, 12.25));
        let product = mat * mat.inverse();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_transform_vector3_rotation() {
        // 90 degree rotation around Z axis
        let mat = Mat4::from_rotation_z(PI / 2.0);
        let transformed = mat.transform_vector3(Vec3::X);

        assert!((transformed - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min() - Vec3::splat(5.0)).length() < 0.001);
        assert!((transformed.max() - Vec3::splat(6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation_is_conservative() {
        let mat = Mat4::from_rotation_y(PI / 4.0);
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let transformed = mat.transform_aabb(&aabb);

        // Corners of the rotated cube reach sqrt(2) along x and z
        let r = 2.0f32.sqrt();
        assert!((transformed.x.max - r).abs() < 0.001);
        assert!((transformed.z.min + r).abs() < 0.001);
        assert!((transformed.y.max - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_transform_ray_keeps_parameterization() {
        let mat = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_rotation_x(0.7);
        let ray = Ray::new(Vec3::new(0.5, 0.0, -2.0), Vec3::new(0.0, 0.6, 0.8));
        let moved = mat.transform_ray(&ray);

        for t in [0.0, 1.0, 3.5] {
            let expected = mat.transform_point3(ray.at(t));
            assert!((moved.at(t) - expected).length() < 0.001);
        }
    }

    #[test]
    fn test_transform_matrix_rotates_then_translates() {
        let transform = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation_degrees(Vec3::new(0.0, 0.0, 90.0));
        let p = transform.to_matrix().transform_point3(Vec3::X);

        assert!((p - Vec3::new(10.0, 1.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let mat = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        // Plane x + y = 0 has normal (1, 1, 0); the tangent (1, -1, 0) lies in it
        let tangent = mat.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        let normal = mat.normal_matrix().transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!(tangent.dot(normal).abs() < 0.001);
    }
}
