use crate::{Interval, Ray, Vec3};

/// Minimum thickness of a box built from points, so flat geometry stays hittable.
const MIN_EXTENT: f32 = 0.0001;

/// Axis-Aligned Bounding Box for the acceleration structures.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// [`Aabb::EMPTY`] is the identity for [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };

    /// Create an AABB from two corner points, padded to a minimum thickness.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Tight box around any number of points. Returns [`Aabb::EMPTY`] for none.
    pub fn from_point_cloud<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::EMPTY;
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Self::from_points(min, max)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn is_empty(&self) -> bool {
        self.x.max < self.x.min || self.y.max < self.y.min || self.z.max < self.z.min
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Total area of the six faces, `2(ab + bc + ca)`. Zero for the empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.max() - self.min();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Slab test returning the entry distance.
    ///
    /// Returns `f32::INFINITY` when the ray misses the box inside `ray_t`.
    /// The returned `t` is clamped to `ray_t.min`, so a ray starting inside
    /// the box reports the window start. It is a traversal priority key only.
    #[inline]
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> f32 {
        let inv = ray.inv_direction();
        let t0 = (self.min() - ray.origin) * inv;
        let t1 = (self.max() - ray.origin) * inv;

        // A zero direction component with the origin on that slab's plane
        // gives 0 * inf = NaN. The ray then lies in the closed slab.
        let in_plane = t0.is_nan_mask() | t1.is_nan_mask();

        // Swap per axis for negative directions
        let entry = Vec3::select(in_plane, Vec3::NEG_INFINITY, t0.min(t1));
        let exit = Vec3::select(in_plane, Vec3::INFINITY, t0.max(t1));

        let t_min = ray_t.min.max(entry.max_element());
        let t_max = ray_t.max.min(exit.min_element());
        if t_max <= t_min {
            f32::INFINITY
        } else {
            t_min
        }
    }

    /// Boolean form of [`Aabb::intersect`].
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.intersect(ray, ray_t) < f32::INFINITY
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// The eight corners, min corner first and max corner last.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        if self.x.size() < MIN_EXTENT {
            self.x = self.x.expand(MIN_EXTENT);
        }
        if self.y.size() < MIN_EXTENT {
            self.y = self.y.expand(MIN_EXTENT);
        }
        if self.z.size() < MIN_EXTENT {
            self.z = self.z.expand(MIN_EXTENT);
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
