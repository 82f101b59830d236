// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//! Prunes facet-pair intersection tests and ray casts

use super::BoundingBox;
use nalgebra::{Point3, Vector3};

const MAX_DEPTH: usize = 32;
const LEAF_SIZE: usize = 8;

/// BVH node
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// Bounding box of this node
    pub bbox: BoundingBox,
    /// Left child (None for leaf)
    pub left: Option<Box<BvhNode>>,
    /// Right child (None for leaf)
    pub right: Option<Box<BvhNode>>,
    /// Item indices (only for leaf nodes)
    pub items: Vec<usize>,
}

impl BvhNode {
    fn leaf(bbox: BoundingBox, items: Vec<usize>) -> Self {
        Self {
            bbox,
            left: None,
            right: None,
            items,
        }
    }

    fn internal(left: Box<BvhNode>, right: Box<BvhNode>) -> Self {
        Self {
            bbox: BoundingBox::union(&left.bbox, &right.bbox),
            left: Some(left),
            right: Some(right),
            items: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Bounding Volume Hierarchy over boxed items
#[derive(Debug, Clone)]
pub struct Bvh {
    root: BvhNode,
    len: usize,
}

impl Bvh {
    /// Build from (item_index, bbox) pairs
    pub fn build(items: Vec<(usize, BoundingBox)>) -> Self {
        let len = items.len();
        if items.is_empty() {
            return Self {
                root: BvhNode::leaf(BoundingBox::empty(), Vec::new()),
                len,
            };
        }
        Self {
            root: Self::build_recursive(items, 0),
            len,
        }
    }

    fn build_recursive(mut items: Vec<(usize, BoundingBox)>, depth: usize) -> BvhNode {
        if items.len() <= LEAF_SIZE || depth >= MAX_DEPTH {
            let bbox = Self::union_of(&items);
            return BvhNode::leaf(bbox, items.into_iter().map(|(idx, _)| idx).collect());
        }

        let axis = Self::split_axis(&items);
        items.sort_by(|(ia, a), (ib, b)| {
            a.center()[axis]
                .total_cmp(&b.center()[axis])
                .then(ia.cmp(ib))
        });

        let right_items = items.split_off(items.len() / 2);
        let left = Box::new(Self::build_recursive(items, depth + 1));
        let right = Box::new(Self::build_recursive(right_items, depth + 1));
        BvhNode::internal(left, right)
    }

    /// Longest axis of the centroid extent
    fn split_axis(items: &[(usize, BoundingBox)]) -> usize {
        let centers = BoundingBox::from_points(
            items.iter().map(|(_, b)| b.center()).collect::<Vec<_>>().iter(),
        );
        let size = centers.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    fn union_of(items: &[(usize, BoundingBox)]) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for (_, item) in items {
            bbox.merge(item);
        }
        bbox
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> BoundingBox {
        self.root.bbox
    }

    /// Items whose boxes overlap `bbox`
    pub fn query(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut result = Vec::new();
        Self::query_recursive(&self.root, bbox, &mut result);
        result
    }

    fn query_recursive(node: &BvhNode, bbox: &BoundingBox, result: &mut Vec<usize>) {
        if node.bbox.is_empty() || !node.bbox.intersects(bbox) {
            return;
        }

        if node.is_leaf() {
            result.extend_from_slice(&node.items);
        } else {
            if let Some(ref left) = node.left {
                Self::query_recursive(left, bbox, result);
            }
            if let Some(ref right) = node.right {
                Self::query_recursive(right, bbox, result);
            }
        }
    }

    /// Items whose boxes the ray `origin + t * dir, t >= 0` passes through
    pub fn query_ray(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> Vec<usize> {
        let inv = Vector3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let mut result = Vec::new();
        Self::ray_recursive(&self.root, origin, &inv, &mut result);
        result
    }

    fn ray_recursive(
        node: &BvhNode,
        origin: &Point3<f64>,
        inv: &Vector3<f64>,
        result: &mut Vec<usize>,
    ) {
        if node.bbox.is_empty() || !ray_hits_box(&node.bbox, origin, inv) {
            return;
        }

        if node.is_leaf() {
            result.extend_from_slice(&node.items);
        } else {
            if let Some(ref left) = node.left {
                Self::ray_recursive(left, origin, inv, result);
            }
            if let Some(ref right) = node.right {
                Self::ray_recursive(right, origin, inv, result);
            }
        }
    }

    #[cfg(test)]
    pub fn root(&self) -> &BvhNode {
        &self.root
    }
}

/// Slab test, conservative for rays lying in a slab boundary
fn ray_hits_box(bbox: &BoundingBox, origin: &Point3<f64>, inv: &Vector3<f64>) -> bool {
    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        if inv[axis].is_infinite() {
            if o < bbox.min[axis] || o > bbox.max[axis] {
                return false;
            }
            continue;
        }
        let t0 = (bbox.min[axis] - o) * inv[axis];
        let t1 = (bbox.max[axis] - o) * inv[axis];
        let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        t_min = t_min.max(near);
        t_max = t_max.min(far);
        if t_min > t_max {
            return false;
        }
    }
    true
}
