use crate::Vec3;

/// A ray in 3D space.
///
/// `direction` is unit length by convention for world-space rays. The
/// reciprocal of the direction is cached for the slab test and must be kept
/// in sync, so the direction is only changed through [`Ray::set_direction`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is used as given (not normalized).
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Reciprocal of the direction, `1 / d` per component.
    ///
    /// Zero components map to signed infinity, which the slab test handles.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
        self.inv_direction = direction.recip();
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_inverse_direction_tracks_direction() {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, -4.0, 0.5));
        assert_eq!(ray.inv_direction(), Vec3::new(0.5, -0.25, 2.0));

        ray.set_direction(Vec3::new(0.0, 1.0, -1.0));
        assert_eq!(ray.inv_direction().y, 1.0);
        assert_eq!(ray.inv_direction().z, -1.0);
        assert!(ray.inv_direction().x.is_infinite());
    }
}
