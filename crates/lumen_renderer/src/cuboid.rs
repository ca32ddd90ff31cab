//! Axis-aligned box built from 12 triangles.

use lumen_core::MaterialId;
use lumen_math::{Aabb, Interval, Ray, Vec3};

use crate::hittable::{HitPayload, Hittable, Shape};
use crate::triangle::Triangle;

/// Corner indices of the 12 faces, into [`Aabb::corners`] order.
///
/// Each triangle winds counter-clockwise seen from outside, so normals face out.
const FACES: [[usize; 3]; 12] = [
    [0, 4, 6], [0, 6, 2], // -X
    [1, 3, 7], [1, 7, 5], // +X
    [0, 1, 5], [0, 5, 4], // -Y
    [2, 6, 7], [2, 7, 3], // +Y
    [0, 2, 3], [0, 3, 1], // -Z
    [4, 5, 7], [4, 7, 6], // +Z
];

/// A box primitive, tested by brute force over its triangles.
#[derive(Debug, Clone)]
pub struct Cuboid {
    triangles: [Triangle; 12],
    /// Running sum of triangle areas, for area-weighted sampling
    cumulative_area: [f32; 12],
    bbox: Aabb,
}

impl Cuboid {
    /// Create a box spanning two opposite corners.
    pub fn new(a: Vec3, b: Vec3, material: MaterialId) -> Self {
        let (min, max) = (a.min(b), a.max(b));
        let corners = Aabb {
            x: Interval::new(min.x, max.x),
            y: Interval::new(min.y, max.y),
            z: Interval::new(min.z, max.z),
        }
        .corners();

        let triangles = FACES.map(|[i, j, k]| Triangle::new(corners[i], corners[j], corners[k], material));

        let mut cumulative_area = [0.0; 12];
        let mut total = 0.0;
        for (sum, triangle) in cumulative_area.iter_mut().zip(&triangles) {
            total += triangle.surface_area();
            *sum = total;
        }

        Self {
            triangles,
            cumulative_area,
            bbox: Aabb::from_points(min, max),
        }
    }

    pub fn triangles(&self) -> &[Triangle; 12] {
        &self.triangles
    }
}

impl Hittable for Cuboid {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        self.triangles.as_slice().hit(ray, ray_t, payload)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Cuboid {
    fn centroid(&self) -> Vec3 {
        self.bbox.centroid()
    }

    fn sample_uniform(&self, u: f32, v: f32) -> Vec3 {
        let total = self.surface_area();
        if total <= 0.0 {
            return self.centroid();
        }

        // Pick a triangle by area, then reuse the remainder of `u` inside it
        let target = u * total;
        let index = self
            .cumulative_area
            .iter()
            .position(|&sum| target < sum)
            .unwrap_or(11);
        let start = if index == 0 { 0.0 } else { self.cumulative_area[index - 1] };
        let span = self.cumulative_area[index] - start;
        let local_u = if span > 0.0 { ((target - start) / span).clamp(0.0, 1.0) } else { 0.0 };

        self.triangles[index].sample_uniform(local_u, v)
    }

    fn surface_area(&self) -> f32 {
        self.cumulative_area[11]
    }
}
