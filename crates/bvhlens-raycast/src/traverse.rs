//! Breadth-first BVH traversal and the intersection cost model.

use std::collections::VecDeque;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use bvhlens_ir::GlobalInfo;
use bvhlens_tree::{NodeId, SpatialTree};
use serde::{Deserialize, Serialize};

use crate::Ray;

/// Weights applied to visited nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Cost of testing one internal node's child box.
    pub internal_node_cost: f64,
    /// Cost of testing one primitive in a leaf.
    pub leaf_node_cost: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            internal_node_cost: 1.0,
            leaf_node_cost: 1.0,
        }
    }
}

impl CostModel {
    /// Costs supplied by the builder's global info, defaulting each missing one to 1.
    pub fn from_global_info(info: &GlobalInfo) -> Self {
        let defaults = Self::default();
        Self {
            internal_node_cost: info.internal_node_cost.unwrap_or(defaults.internal_node_cost),
            leaf_node_cost: info.leaf_node_cost.unwrap_or(defaults.leaf_node_cost),
        }
    }
}

/// Intersection statistics of one ray or of a batch.
///
/// `rays` counts the rays that hit the tree at all; a ray that misses the
/// root contributes nothing, not even to the denominator of the averages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IntersectionInfo {
    /// Nodes whose box the rays intersected.
    pub count: usize,
    /// Accumulated traversal cost.
    pub cost: f64,
    /// Rays that intersected at least the root.
    pub rays: usize,
}

impl IntersectionInfo {
    /// The identity of `+`.
    pub const ZERO: Self = Self {
        count: 0,
        cost: 0.0,
        rays: 0,
    };

    /// Contribution of a ray that missed the root.
    pub fn miss() -> Self {
        Self::ZERO
    }

    /// Contribution of a single ray that hit `count` nodes.
    pub fn hit(count: usize, cost: f64) -> Self {
        Self {
            count,
            cost,
            rays: 1,
        }
    }

    /// Mean intersected nodes per contributing ray, `None` without any.
    pub fn count_per_ray(&self) -> Option<f64> {
        (self.rays > 0).then(|| self.count as f64 / self.rays as f64)
    }

    /// Mean cost per contributing ray, `None` without any.
    pub fn cost_per_ray(&self) -> Option<f64> {
        (self.rays > 0).then(|| self.cost / self.rays as f64)
    }
}

impl Add for IntersectionInfo {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            count: self.count + rhs.count,
            cost: self.cost + rhs.cost,
            rays: self.rays + rhs.rays,
        }
    }
}

impl AddAssign for IntersectionInfo {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for IntersectionInfo {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a IntersectionInfo> for IntersectionInfo {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Statistics of one ray plus the ids of the nodes it intersected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RayTrace {
    /// The ray's contribution.
    pub info: IntersectionInfo,
    /// Intersected node ids in visiting order.
    pub visited: Vec<NodeId>,
}

/// Walk `tree` breadth first with a single ray.
///
/// A node whose box the ray misses within `length` is discarded with its
/// whole subtree. A hit internal node costs `internal_node_cost * 2`, since
/// both children get tested, and a hit leaf costs `leaf_node_cost` per
/// primitive.
pub fn trace_ray(
    tree: &SpatialTree,
    ray: &Ray,
    length: f64,
    costs: &CostModel,
) -> IntersectionInfo {
    walk(tree, ray, length, costs, |_| {})
}

/// Like [`trace_ray`], also recording the intersected nodes, left before right.
pub fn trace_ray_visits(tree: &SpatialTree, ray: &Ray, length: f64, costs: &CostModel) -> RayTrace {
    let mut visited = Vec::new();
    let info = walk(tree, ray, length, costs, |id| visited.push(id));
    RayTrace { info, visited }
}

fn walk(
    tree: &SpatialTree,
    ray: &Ray,
    length: f64,
    costs: &CostModel,
    mut on_hit: impl FnMut(NodeId),
) -> IntersectionInfo {
    let mut count = 0;
    let mut cost = 0.0;
    let mut queue = VecDeque::from([tree.root_index()]);

    while let Some(index) = queue.pop_front() {
        let node = tree.get(index);
        if ray.intersect_aabb(&node.aabb, length).is_none() {
            continue;
        }
        count += 1;
        on_hit(node.id);
        match (node.left, node.right) {
            (Some(left), Some(right)) => {
                cost += costs.internal_node_cost * 2.0;
                queue.push_back(left);
                queue.push_back(right);
            }
            _ => cost += costs.leaf_node_cost * node.primitive_count() as f64,
        }
    }

    if count == 0 {
        IntersectionInfo::miss()
    } else {
        IntersectionInfo::hit(count, cost)
    }
}
