//! Bounding Volume Hierarchy over primitives.
//!
//! Built once with the surface area heuristic and stored as a flat node
//! array (see [`crate::tree`]). Leaves hold exactly one primitive.

use std::time::Instant;

use lumen_math::{Aabb, Interval, Ray};

use crate::hittable::{HitPayload, Hittable, Shape};
use crate::primitive::Primitive;
use crate::tree::{FlatTree, SplitMethod};

/// Single-level acceleration structure over a primitive list.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    tree: FlatTree,
    primitives: Vec<Primitive>,
}

impl Bvh {
    /// Create a BVH from a list of primitives.
    pub fn new(primitives: Vec<Primitive>) -> Self {
        let start = Instant::now();
        let bounds: Vec<Aabb> = primitives.iter().map(Hittable::bounding_box).collect();
        let centroids: Vec<_> = primitives.iter().map(Shape::centroid).collect();
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);

        log::info!(
            "Built BVH: {} primitives, {} nodes, depth {} ({:.2?})",
            primitives.len(),
            tree.node_count(),
            tree.depth(),
            start.elapsed()
        );

        Self { tree, primitives }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }
}

impl Hittable for Bvh {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let window = ray_t.shrink_to(payload.t);
        self.tree.traverse(ray, window, |index, window| {
            self.primitives[index]
                .hit(ray, window, payload)
                .then_some(payload.t)
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.tree.bounding_box()
    }
}
