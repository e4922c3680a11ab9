//! Display state of tree nodes.
//!
//! Nothing here draws: these queries compute which nodes an inspector should
//! show and how, so any front end can render them.

use serde::Serialize;

use bvhlens_ir::{BvhId, NodeId, OctreeNodeId};

use crate::error::Result;
use crate::{Octree, OctreeNode, SpatialTree};

/// Alpha used when every node is shown at once.
pub const LIGHT_ALPHA: f64 = 0.15;

/// Alpha used for leaves and for the children of a selected node.
pub const OPAQUE_ALPHA: f64 = 0.7;

/// Alpha of the selected node itself, so its children stay visible.
pub const SELECTED_ALPHA: f64 = 0.0;

/// Which BVH nodes to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BvhVisibility {
    /// Every node, lightly shaded.
    #[default]
    All,
    /// No node.
    Nothing,
    /// Leaves only.
    Leaves,
}

/// Display state of one BVH node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeVisibility {
    /// Node id.
    pub id: NodeId,
    /// Whether the node is drawn.
    pub shown: bool,
    /// Fill alpha when shown.
    pub alpha: f64,
}

impl NodeVisibility {
    fn shown(id: NodeId, alpha: f64) -> Self {
        Self {
            id,
            shown: true,
            alpha,
        }
    }

    fn hidden(id: NodeId) -> Self {
        Self {
            id,
            shown: false,
            alpha: 0.0,
        }
    }
}

impl SpatialTree {
    /// Display state of every reachable node, in breadth-first order.
    pub fn visibility(&self, mode: BvhVisibility) -> Vec<NodeVisibility> {
        self.iter_breadth_first()
            .map(|node| match mode {
                BvhVisibility::All => NodeVisibility::shown(node.id, LIGHT_ALPHA),
                BvhVisibility::Nothing => NodeVisibility::hidden(node.id),
                BvhVisibility::Leaves if node.is_leaf() => {
                    NodeVisibility::shown(node.id, OPAQUE_ALPHA)
                }
                BvhVisibility::Leaves => NodeVisibility::hidden(node.id),
            })
            .collect()
    }

    /// Display state when a single node is selected: the node itself is
    /// transparent, its children opaque, everything else hidden.
    pub fn selection_visibility(&self, id: NodeId) -> Result<Vec<NodeVisibility>> {
        let highlight = self.highlight(id)?;
        let children = highlight.children.map(|(l, r)| (l.id, r.id));
        Ok(self
            .iter_breadth_first()
            .map(|node| {
                if node.id == id {
                    NodeVisibility::shown(node.id, SELECTED_ALPHA)
                } else if children.is_some_and(|(l, r)| node.id == l || node.id == r) {
                    NodeVisibility::shown(node.id, OPAQUE_ALPHA)
                } else {
                    NodeVisibility::hidden(node.id)
                }
            })
            .collect())
    }
}

/// What to show of the octree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OctreeVisibility {
    /// No cell.
    Nothing,
    /// Filled leaves only.
    Leaves,
    /// Wireframe of every cell.
    Wireframe,
    /// Wireframe of every cell plus filled leaves.
    #[default]
    WireframeAndLeaves,
}

impl OctreeVisibility {
    fn wireframe(self) -> bool {
        matches!(self, Self::Wireframe | Self::WireframeAndLeaves)
    }

    fn fills(self) -> bool {
        matches!(self, Self::Leaves | Self::WireframeAndLeaves)
    }
}

/// An RGB colour with components in `[0, 1]`.
pub type Rgb = [f64; 3];

/// Colours assigned to BVHs, indexed by `bvh_id % 13`.
pub const PALETTE: [Rgb; 13] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.5, 0.0, 1.0],
    [1.0, 0.5, 0.0],
    [0.0, 0.5, 0.0],
    [0.5, 0.25, 0.0],
    [0.5, 0.0, 0.5],
];

/// Palette colour of a single BVH.
pub fn bvh_color(bvh: BvhId) -> Rgb {
    PALETTE[bvh as usize % PALETTE.len()]
}

/// Display state of one octree cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellVisibility {
    /// Cell id.
    pub id: OctreeNodeId,
    /// Whether the wireframe is drawn.
    pub wireframe: bool,
    /// Fill colour, `None` when the cell is not filled.
    pub filled: Option<Rgb>,
}

impl Octree {
    /// Fill colour of a leaf: the mean palette colour of the BVHs it holds.
    ///
    /// Cells holding the same set of BVHs always get the same colour.
    /// Returns `None` for internal cells and for empty leaves.
    pub fn leaf_color(&self, node: &OctreeNode) -> Option<Rgb> {
        if !node.is_leaf || node.bvhs.is_empty() {
            return None;
        }
        let mut sum = [0.0; 3];
        for &bvh in &node.bvhs {
            let c = bvh_color(bvh);
            for (s, c) in sum.iter_mut().zip(c) {
                *s += c;
            }
        }
        let n = node.bvhs.len() as f64;
        Some(sum.map(|s| s / n))
    }

    /// Display state of every reachable cell, in breadth-first order.
    pub fn visibility(&self, mode: OctreeVisibility) -> Vec<CellVisibility> {
        self.iter_breadth_first()
            .map(|node| CellVisibility {
                id: node.id,
                wireframe: mode.wireframe(),
                filled: if mode.fills() {
                    self.leaf_color(node)
                } else {
                    None
                },
            })
            .collect()
    }
}
