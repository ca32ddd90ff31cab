//! Pinhole camera producing one primary ray direction per pixel.

use lumen_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::renderer::{RenderError, RenderResult};
use crate::sampling::mix_seed;

/// Camera for generating primary rays.
///
/// Directions are cached per pixel in row-major order, row 0 at the top of
/// the image. Call [`Camera::compute_ray_directions`] with a new seed every
/// frame to re-jitter them for anti-aliasing.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,
    width: u32,
    height: u32,
    /// Random sub-pixel offsets instead of pixel centers
    jitter: bool,
    ray_directions: Vec<Vec3>,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            vfov: 45.0,
            width,
            height,
            jitter: true,
            ray_directions: Vec::new(),
        };
        camera.compute_ray_directions(0);
        camera
    }

    /// Use directions computed elsewhere, one per pixel in row-major order.
    pub fn from_ray_directions(
        position: Vec3,
        width: u32,
        height: u32,
        ray_directions: Vec<Vec3>,
    ) -> RenderResult<Self> {
        let expected = width as usize * height as usize;
        if ray_directions.len() != expected {
            return Err(RenderError::DirectionCount {
                expected,
                found: ray_directions.len(),
            });
        }

        Ok(Self {
            position,
            target: position + ray_directions.first().copied().unwrap_or(Vec3::NEG_Z),
            up: Vec3::Y,
            vfov: 45.0,
            width,
            height,
            jitter: false,
            ray_directions,
        })
    }

    pub fn with_vfov(mut self, degrees: f32) -> Self {
        self.vfov = degrees.clamp(1.0, 179.0);
        self.compute_ray_directions(0);
        self
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self.compute_ray_directions(0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self.compute_ray_directions(0);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn ray_directions(&self) -> &[Vec3] {
        &self.ray_directions
    }

    /// Primary ray through pixel `(x, y)`.
    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let index = y as usize * self.width as usize + x as usize;
        Ray::new(self.position, self.ray_directions[index])
    }

    /// Move the camera and recompute directions.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
        self.compute_ray_directions(0);
    }

    /// Resize the viewport. Returns false if the size did not change.
    pub fn on_resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.compute_ray_directions(0);
        true
    }

    /// Regenerate every pixel's direction. Rows are processed in parallel,
    /// each with its own generator seeded from `seed` and the row index.
    pub fn compute_ray_directions(&mut self, seed: u64) {
        let width = self.width as usize;
        let height = self.height as usize;
        self.ray_directions.resize(width * height, Vec3::NEG_Z);
        if width == 0 || height == 0 {
            return;
        }

        let forward = (self.target - self.position).normalize_or_zero();
        let forward = if forward == Vec3::ZERO { Vec3::NEG_Z } else { forward };
        let right = forward.cross(self.up).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);

        let half_height = (self.vfov.to_radians() * 0.5).tan();
        let half_width = half_height * width as f32 / height as f32;
        let jitter = self.jitter;

        self.ray_directions
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let mut rng = StdRng::seed_from_u64(mix_seed(&[seed, y as u64]));
                for (x, direction) in row.iter_mut().enumerate() {
                    let (jx, jy) = if jitter {
                        (rng.gen::<f32>(), rng.gen::<f32>())
                    } else {
                        (0.5, 0.5)
                    };
                    let ndc_x = (x as f32 + jx) / width as f32 * 2.0 - 1.0;
                    let ndc_y = 1.0 - (y as f32 + jy) / height as f32 * 2.0;

                    *direction = (forward + right * (ndc_x * half_width) + up * (ndc_y * half_height))
                        .normalize();
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_pixel_looks_at_target() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 101, 101).with_jitter(false);
        let center = camera.ray(50, 50);
        assert!((center.direction() - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(camera.ray_directions().len(), 101 * 101);
    }

    #[test]
    fn test_row_zero_is_top_of_image() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 8, 8).with_jitter(false);
        assert!(camera.ray(4, 0).direction().y > 0.0);
        assert!(camera.ray(4, 7).direction().y < 0.0);
        assert!(camera.ray(0, 4).direction().x < 0.0);
        assert!(camera.ray(7, 4).direction().x > 0.0);
    }

    #[test]
    fn test_directions_are_unit_length() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 16, 9);
        camera.compute_ray_directions(7);
        for d in camera.ray_directions() {
            assert!((d.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_jitter_is_seeded() {
        let mut a = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 16, 16);
        let mut b = a.clone();
        a.compute_ray_directions(5);
        b.compute_ray_directions(5);
        assert_eq!(a.ray_directions(), b.ray_directions());

        b.compute_ray_directions(6);
        assert_ne!(a.ray_directions(), b.ray_directions());
    }

    #[test]
    fn test_vfov_widens_spread() {
        let narrow = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 9, 9).with_jitter(false).with_vfov(20.0);
        let wide = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 9, 9).with_jitter(false).with_vfov(90.0);
        assert!(wide.ray(0, 4).direction().x < narrow.ray(0, 4).direction().x);
    }

    #[test]
    fn test_from_ray_directions_validates_count() {
        let dirs = vec![Vec3::NEG_Z; 6];
        assert!(Camera::from_ray_directions(Vec3::ZERO, 3, 2, dirs.clone()).is_ok());
        let err = Camera::from_ray_directions(Vec3::ZERO, 4, 2, dirs).unwrap_err();
        assert!(matches!(err, RenderError::DirectionCount { expected: 8, found: 6 }));
    }

    #[test]
    fn test_on_resize() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 4, 4);
        assert!(!camera.on_resize(4, 4));
        assert!(camera.on_resize(8, 2));
        assert_eq!(camera.ray_directions().len(), 16);
    }
}
