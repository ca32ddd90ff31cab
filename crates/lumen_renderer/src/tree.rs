//! Flat binary tree shared by the BVH and the TLAS.
//!
//! Nodes live in one array with the root at index 0. The two children of an
//! internal node are always allocated as an adjacent pair, so a node only
//! stores the index of its first child. A tree over `n` items has exactly
//! `2n - 1` nodes.
//!
//! The tree knows nothing about what it indexes: construction takes item
//! bounds and centroids, and traversal calls back with item indices.

use lumen_math::{Aabb, Interval, Ray, Vec3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use smallvec::SmallVec;

/// Traversal stack slots kept inline before spilling to the heap.
const INLINE_STACK: usize = 64;

/// How the builder partitions items at each internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMethod {
    /// Surface area heuristic over all three axes.
    #[default]
    Sah,
    /// Seeded shuffle, then split every range at its median.
    Random { seed: u64 },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub bbox: Aabb,
    /// Item index for leaves, first child index for branches
    index: u32,
    leaf: bool,
}

impl Node {
    const PLACEHOLDER: Node = Node {
        bbox: Aabb::EMPTY,
        index: 0,
        leaf: true,
    };

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FlatTree {
    nodes: Vec<Node>,
}

impl FlatTree {
    /// Build a tree over items described by their bounds and centroids.
    pub fn build(bounds: &[Aabb], centroids: &[Vec3], method: SplitMethod) -> Self {
        debug_assert_eq!(bounds.len(), centroids.len());
        let count = bounds.len();
        if count == 0 {
            return Self::default();
        }

        let mut items: Vec<u32> = (0..count as u32).collect();
        if let SplitMethod::Random { seed } = method {
            items.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        let mut builder = Builder {
            bounds,
            centroids,
            method,
            nodes: Vec::with_capacity(2 * count - 1),
        };
        builder.nodes.push(Node::PLACEHOLDER);
        builder.build_node(0, &mut items);

        Self {
            nodes: builder.nodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn bounding_box(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |root| root.bbox)
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut deepest = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                deepest = deepest.max(depth);
            } else {
                let first = node.index as usize;
                stack.push((first, depth + 1));
                stack.push((first + 1, depth + 1));
            }
        }
        deepest
    }

    /// Closest-hit traversal, visiting nearer children first.
    ///
    /// `hit_item` tests one item inside the current window and returns the
    /// new closest `t` on a hit. The window shrinks to that `t`, pruning any
    /// subtree that starts farther away.
    pub fn traverse<F>(&self, ray: &Ray, mut ray_t: Interval, mut hit_item: F) -> bool
    where
        F: FnMut(usize, Interval) -> Option<f32>,
    {
        let Some(root) = self.nodes.first() else {
            return false;
        };
        if root.bbox.intersect(ray, ray_t) == f32::INFINITY {
            return false;
        }

        // Deferred far children with their entry distance
        let mut stack: SmallVec<[(u32, f32); INLINE_STACK]> = SmallVec::new();
        let mut current = 0u32;
        let mut hit_anything = false;

        loop {
            let node = &self.nodes[current as usize];

            if node.is_leaf() {
                if let Some(t) = hit_item(node.index as usize, ray_t) {
                    hit_anything = true;
                    ray_t = ray_t.shrink_to(t);
                }
            } else {
                let mut near = node.index;
                let mut far = near + 1;
                let mut t_near = self.nodes[near as usize].bbox.intersect(ray, ray_t);
                let mut t_far = self.nodes[far as usize].bbox.intersect(ray, ray_t);

                if t_near > t_far {
                    std::mem::swap(&mut near, &mut far);
                    std::mem::swap(&mut t_near, &mut t_far);
                }

                if t_near < f32::INFINITY {
                    if t_far < f32::INFINITY {
                        stack.push((far, t_far));
                    }
                    current = near;
                    continue;
                }
            }

            // Skip subtrees that start beyond the closest hit found since the push
            match stack.iter().rposition(|&(_, t)| t < ray_t.max) {
                Some(position) => {
                    current = stack[position].0;
                    stack.truncate(position);
                }
                None => break,
            }
        }

        hit_anything
    }
}

struct Builder<'a> {
    bounds: &'a [Aabb],
    centroids: &'a [Vec3],
    method: SplitMethod,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn build_node(&mut self, node: usize, items: &mut [u32]) {
        let bbox = items.iter().fold(Aabb::EMPTY, |acc, &i| {
            Aabb::surrounding(&acc, &self.bounds[i as usize])
        });

        if let [item] = items {
            self.nodes[node] = Node {
                bbox,
                index: *item,
                leaf: true,
            };
            return;
        }

        let mid = match self.method {
            SplitMethod::Sah => self.sah_split(items),
            SplitMethod::Random { .. } => items.len() / 2,
        };

        let first = self.nodes.len();
        self.nodes.push(Node::PLACEHOLDER);
        self.nodes.push(Node::PLACEHOLDER);
        self.nodes[node] = Node {
            bbox,
            index: first as u32,
            leaf: false,
        };

        let (left, right) = items.split_at_mut(mid);
        self.build_node(first, left);
        self.build_node(first + 1, right);
    }

    /// Sort `items` along the cheapest axis and return the split position.
    fn sah_split(&self, items: &mut [u32]) -> usize {
        let n = items.len();
        let (lo, hi) = items.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &i| {
                let c = self.centroids[i as usize];
                (lo.min(c), hi.max(c))
            },
        );
        // Coincident centroids: every split costs the same
        if (hi - lo).max_element() <= 0.0 {
            return n / 2;
        }

        let mut prefix = vec![Aabb::EMPTY; n];
        let mut suffix = vec![Aabb::EMPTY; n];
        let mut best_cost = f32::INFINITY;
        let mut best_axis = 0;
        let mut best_split = n / 2;

        for axis in 0..3 {
            self.sort_by_axis(items, axis);

            let mut acc = Aabb::EMPTY;
            for (k, &i) in items.iter().enumerate() {
                acc = Aabb::surrounding(&acc, &self.bounds[i as usize]);
                prefix[k] = acc;
            }
            let mut acc = Aabb::EMPTY;
            for (k, &i) in items.iter().enumerate().rev() {
                acc = Aabb::surrounding(&acc, &self.bounds[i as usize]);
                suffix[k] = acc;
            }

            for i in 0..n - 1 {
                let left = (i + 1) as f32;
                let right = (n - i - 1) as f32;
                let cost = prefix[i].surface_area() * left + suffix[i + 1].surface_area() * right;
                if cost < best_cost {
                    best_cost = cost;
                    best_axis = axis;
                    best_split = i + 1;
                }
            }
        }

        if best_axis != 2 {
            self.sort_by_axis(items, best_axis);
        }
        best_split
    }

    fn sort_by_axis(&self, items: &mut [u32], axis: usize) {
        items.sort_by(|&a, &b| {
            let ca = self.centroids[a as usize][axis];
            let cb = self.centroids[b as usize][axis];
            ca.total_cmp(&cb)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes_along_x(count: usize) -> (Vec<Aabb>, Vec<Vec3>) {
        let bounds: Vec<Aabb> = (0..count)
            .map(|i| {
                let x = i as f32 * 3.0;
                Aabb::from_points(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
            })
            .collect();
        let centroids = bounds.iter().map(Aabb::centroid).collect();
        (bounds, centroids)
    }

    /// Every item reachable exactly once, children adjacent, `2n - 1` nodes.
    fn check_structure(tree: &FlatTree, count: usize) {
        assert_eq!(tree.node_count(), 2 * count - 1);

        let mut seen = vec![false; count];
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &tree.nodes()[index];
            if node.is_leaf() {
                let item = node.index as usize;
                assert!(!seen[item], "item {} reached twice", item);
                seen[item] = true;
            } else {
                let first = node.index as usize;
                for child in [first, first + 1] {
                    let inner = tree.nodes()[child].bbox;
                    assert_eq!(Aabb::surrounding(&node.bbox, &inner), node.bbox);
                    stack.push(child);
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_empty_tree() {
        let tree = FlatTree::build(&[], &[], SplitMethod::Sah);
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(tree.bounding_box().is_empty());

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(!tree.traverse(&ray, Interval::new(0.0, 100.0), |_, _| Some(1.0)));
    }

    #[test]
    fn test_single_item_is_root_leaf() {
        let (bounds, centroids) = boxes_along_x(1);
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);

        assert_eq!(tree.node_count(), 1);
        assert!(tree.nodes()[0].is_leaf());
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_structure_for_both_split_methods() {
        let (bounds, centroids) = boxes_along_x(37);
        for method in [SplitMethod::Sah, SplitMethod::Random { seed: 9 }] {
            let tree = FlatTree::build(&bounds, &centroids, method);
            check_structure(&tree, 37);
        }
    }

    #[test]
    fn test_sah_tree_is_balanced_for_even_spacing() {
        let (bounds, centroids) = boxes_along_x(64);
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);
        assert!(tree.depth() <= 10, "depth = {}", tree.depth());
    }

    #[test]
    fn test_coincident_centroids_split_at_median() {
        let bounds = vec![Aabb::from_points(Vec3::ZERO, Vec3::ONE); 1000];
        let centroids = bounds.iter().map(Aabb::centroid).collect::<Vec<_>>();
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);

        check_structure(&tree, 1000);
        assert!(tree.depth() <= 11, "depth = {}", tree.depth());
    }

    #[test]
    fn test_traversal_visits_near_items_first_and_prunes() {
        let (bounds, centroids) = boxes_along_x(16);
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);

        // Ray along +x through every box: the first box hit ends the search
        let ray = Ray::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::X);
        let mut visited = Vec::new();
        let hit = tree.traverse(&ray, Interval::new(0.0, f32::INFINITY), |item, window| {
            visited.push(item);
            let t = bounds[item].intersect(&ray, window);
            (t < f32::INFINITY).then_some(t)
        });

        assert!(hit);
        assert_eq!(visited, vec![0]);
    }

    #[test]
    fn test_traversal_misses_outside_root() {
        let (bounds, centroids) = boxes_along_x(8);
        let tree = FlatTree::build(&bounds, &centroids, SplitMethod::Sah);

        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::Y);
        let mut calls = 0;
        let hit = tree.traverse(&ray, Interval::new(0.0, f32::INFINITY), |_, _| {
            calls += 1;
            None
        });
        assert!(!hit);
        assert_eq!(calls, 0);
    }
}
