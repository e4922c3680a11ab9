//! Bounding volume hierarchy consumed from an external builder.
//!
//! Nodes live in a flat arena in input order, so the root (the first node
//! of the serialized list) is always at index 0. A node is a leaf iff it has
//! neither a left nor a right child.

use std::collections::{HashMap, VecDeque};
use std::ops::Index;

use bvhlens_ir::{BvhData, Metrics, NodeId, TriangleId};
use tracing::warn;

use crate::error::{Result, TreeError};
use crate::Aabb3;

const KIND: &str = "node";

/// Position of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A BVH node.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Node id from the document.
    pub id: NodeId,
    /// Bounding box of this node.
    pub aabb: Aabb3,
    /// Left child.
    pub left: Option<NodeIndex>,
    /// Right child.
    pub right: Option<NodeIndex>,
    /// Parent node, `None` for the root and for unreachable nodes.
    pub parent: Option<NodeIndex>,
    /// Triangles held by this node.
    pub primitives: Vec<TriangleId>,
    /// Metrics precomputed by the builder.
    pub metrics: Metrics,
    /// Distance from the root, `None` when the node is unreachable.
    pub depth: Option<u32>,
}

impl TreeNode {
    /// A node is a leaf iff both child links are absent.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Number of primitives held by this node.
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }
}

/// A selected node together with its children.
#[derive(Debug, Clone, Copy)]
pub struct Highlight<'a> {
    /// The selected node.
    pub node: &'a TreeNode,
    /// Its `(left, right)` children, `None` for a leaf.
    pub children: Option<(&'a TreeNode, &'a TreeNode)>,
}

impl<'a> Highlight<'a> {
    /// The selected node followed by its children, if any.
    pub fn nodes(&self) -> Vec<&'a TreeNode> {
        let mut nodes = vec![self.node];
        if let Some((left, right)) = self.children {
            nodes.push(left);
            nodes.push(right);
        }
        nodes
    }
}

/// Read-only binary BVH.
#[derive(Debug, Clone)]
pub struct SpatialTree {
    nodes: Vec<TreeNode>,
    by_id: HashMap<NodeId, NodeIndex>,
}

impl SpatialTree {
    /// Validate a serialized BVH and build the arena.
    ///
    /// Fails when the node list is empty, ids repeat, a child id is unknown,
    /// a node has exactly one child, a node is reachable from more than one
    /// parent, or a bounding box is inverted.
    pub fn from_ir(data: &BvhData) -> Result<Self> {
        if data.nodes.is_empty() {
            return Err(TreeError::EmptyTree("BVH"));
        }

        let mut nodes = Vec::with_capacity(data.nodes.len());
        let mut by_id = HashMap::with_capacity(data.nodes.len());
        for (i, node) in data.nodes.iter().enumerate() {
            let id = node.core.id;
            let aabb =
                Aabb3::from_ir(&node.core.aabb).ok_or(TreeError::InvalidAabb { kind: KIND, id })?;
            if by_id.insert(id, NodeIndex(i)).is_some() {
                return Err(TreeError::DuplicateId { kind: KIND, id });
            }
            nodes.push(TreeNode {
                id,
                aabb,
                left: None,
                right: None,
                parent: None,
                primitives: node.core.triangles.clone(),
                metrics: node.metrics,
                depth: None,
            });
        }

        let resolve = |id: NodeId| {
            by_id
                .get(&id)
                .copied()
                .ok_or(TreeError::NotFound { kind: KIND, id })
        };
        for (i, node) in data.nodes.iter().enumerate() {
            let id = node.core.id;
            match (node.core.left(), node.core.right()) {
                (None, None) => {}
                (Some(left), Some(right)) => {
                    if left == right {
                        return Err(TreeError::malformed(
                            KIND,
                            id,
                            format!("both children reference node {left}"),
                        ));
                    }
                    nodes[i].left = Some(resolve(left)?);
                    nodes[i].right = Some(resolve(right)?);
                }
                _ => {
                    return Err(TreeError::malformed(
                        KIND,
                        id,
                        "an internal node needs exactly two children",
                    ));
                }
            }
        }

        let mut tree = Self { nodes, by_id };
        tree.link_from_root()?;
        Ok(tree)
    }

    /// Assign parents and depths breadth first from the root.
    fn link_from_root(&mut self) -> Result<()> {
        let mut queue = VecDeque::from([(NodeIndex(0), 0u32)]);
        self.nodes[0].depth = Some(0);

        while let Some((current, depth)) = queue.pop_front() {
            let (left, right) = (self.nodes[current.0].left, self.nodes[current.0].right);
            for child in [left, right].into_iter().flatten() {
                let node = &mut self.nodes[child.0];
                if node.depth.is_some() {
                    return Err(TreeError::malformed(
                        KIND,
                        node.id,
                        "node is reachable from more than one parent",
                    ));
                }
                node.depth = Some(depth + 1);
                node.parent = Some(current);
                queue.push_back((child, depth + 1));
            }
        }

        let unreachable: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.depth.is_none())
            .map(|n| n.id)
            .collect();
        if !unreachable.is_empty() {
            warn!(
                count = unreachable.len(),
                ids = ?unreachable,
                "BVH nodes not reachable from the root are ignored"
            );
        }
        Ok(())
    }

    /// The root node.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Index of the root node.
    pub fn root_index(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Node stored at `index`.
    pub fn get(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0]
    }

    /// Index of the node with the given id.
    pub fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(TreeError::NotFound { kind: KIND, id })
    }

    /// Find the unique node with the given id.
    pub fn find_node(&self, id: NodeId) -> Result<&TreeNode> {
        self.index_of(id).map(|index| self.get(index))
    }

    /// Structural leaf test.
    pub fn is_leaf(&self, node: &TreeNode) -> bool {
        node.is_leaf()
    }

    /// The `(left, right)` children of an internal node.
    pub fn children(&self, node: &TreeNode) -> Option<(&TreeNode, &TreeNode)> {
        match (node.left, node.right) {
            (Some(left), Some(right)) => Some((self.get(left), self.get(right))),
            _ => None,
        }
    }

    /// The parent of a node, `None` for the root.
    pub fn parent(&self, node: &TreeNode) -> Option<&TreeNode> {
        node.parent.map(|index| self.get(index))
    }

    /// The node with the given id plus its children, for on-demand highlighting.
    pub fn highlight(&self, id: NodeId) -> Result<Highlight<'_>> {
        let node = self.find_node(id)?;
        Ok(Highlight {
            node,
            children: self.children(node),
        })
    }

    /// Number of nodes in the arena, including unreachable ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in input order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    /// Nodes reachable from the root, breadth first, left before right.
    pub fn iter_breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            tree: self,
            queue: VecDeque::from([self.root_index()]),
        }
    }

    /// Leaves reachable from the root, in breadth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.iter_breadth_first().filter(|n| n.is_leaf())
    }

    /// Deepest level reached from the root (the root is level 0).
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().filter_map(|n| n.depth).max().unwrap_or(0)
    }
}

impl Index<NodeIndex> for SpatialTree {
    type Output = TreeNode;

    fn index(&self, index: NodeIndex) -> &TreeNode {
        self.get(index)
    }
}

/// Breadth-first iterator over the reachable part of a [`SpatialTree`].
#[derive(Debug, Clone)]
pub struct BreadthFirst<'a> {
    tree: &'a SpatialTree,
    queue: VecDeque<NodeIndex>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.get(self.queue.pop_front()?);
        self.queue.extend(node.left);
        self.queue.extend(node.right);
        Some(node)
    }
}
