//! Top-level acceleration structure over BLAS instances.
//!
//! Uses the same flat tree and near/far traversal as [`crate::bvh::Bvh`],
//! with instance bounds in place of primitive bounds. Rebuild whenever
//! instances are added, removed or moved.

use std::time::Instant;

use lumen_math::{Aabb, Interval, Ray};

use crate::blas::Blas;
use crate::hittable::{HitPayload, Hittable};
use crate::tree::{FlatTree, SplitMethod};

#[derive(Debug, Clone, Default)]
pub struct Tlas {
    tree: FlatTree,
    instances: Vec<Blas>,
    split_method: SplitMethod,
}

impl Tlas {
    /// Build a TLAS with the surface area heuristic.
    pub fn new(instances: Vec<Blas>) -> Self {
        Self::with_split_method(instances, SplitMethod::Sah)
    }

    pub fn with_split_method(instances: Vec<Blas>, split_method: SplitMethod) -> Self {
        let mut tlas = Self {
            tree: FlatTree::default(),
            instances,
            split_method,
        };
        tlas.rebuild();
        tlas
    }

    /// Rebuild the tree after instances changed.
    pub fn rebuild(&mut self) {
        let start = Instant::now();
        let bounds: Vec<Aabb> = self.instances.iter().map(Hittable::bounding_box).collect();
        let centroids: Vec<_> = bounds.iter().map(Aabb::centroid).collect();
        self.tree = FlatTree::build(&bounds, &centroids, self.split_method);

        log::info!(
            "Built TLAS: {} instances, {} nodes, depth {} ({:.2?})",
            self.instances.len(),
            self.tree.node_count(),
            self.tree.depth(),
            start.elapsed()
        );
    }

    pub fn push(&mut self, instance: Blas) {
        self.instances.push(instance);
        self.rebuild();
    }

    pub fn remove(&mut self, index: usize) -> Option<Blas> {
        if index >= self.instances.len() {
            return None;
        }
        let removed = self.instances.remove(index);
        self.rebuild();
        Some(removed)
    }

    /// Mutable access to the instances. The tree is rebuilt afterwards.
    pub fn edit_instances<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Vec<Blas>),
    {
        edit(&mut self.instances);
        self.rebuild();
    }

    pub fn instances(&self) -> &[Blas] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }
}

impl Hittable for Tlas {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        let window = ray_t.shrink_to(payload.t);
        self.tree.traverse(ray, window, |index, window| {
            self.instances[index]
                .hit(ray, window, payload)
                .then_some(payload.t)
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.tree.bounding_box()
    }
}
