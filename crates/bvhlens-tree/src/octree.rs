//! Octree enclosing the BVHs of a scene.
//!
//! Cells are stored in input order with the root first. Unlike the BVH, leaf
//! status is taken from the serialized `isLeaf` flag and checked against the
//! child list.

use std::collections::{HashMap, VecDeque};

use bvhlens_ir::{BvhId, OctreeNodeId};
use tracing::warn;

use crate::error::{Result, TreeError};
use crate::Aabb3;

const KIND: &str = "octree node";

/// Position of a cell in the octree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OctreeIndex(usize);

impl OctreeIndex {
    /// The arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// An octree cell.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// Cell id from the document.
    pub id: OctreeNodeId,
    /// Bounds of the cell.
    pub aabb: Aabb3,
    /// BVHs overlapping the cell.
    pub bvhs: Vec<BvhId>,
    /// Child cells.
    pub children: Vec<OctreeIndex>,
    /// Parent cell, `None` for the root and for unreachable cells.
    pub parent: Option<OctreeIndex>,
    /// Serialized leaf flag.
    pub is_leaf: bool,
    /// Distance from the root, `None` when unreachable.
    pub depth: Option<u32>,
}

/// Read-only octree.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    by_id: HashMap<OctreeNodeId, OctreeIndex>,
}

impl Octree {
    /// Validate serialized octree cells and build the arena.
    pub fn from_ir(cells: &[bvhlens_ir::OctreeNode]) -> Result<Self> {
        if cells.is_empty() {
            return Err(TreeError::EmptyTree("octree"));
        }

        let mut by_id = HashMap::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            if by_id.insert(cell.id, OctreeIndex(i)).is_some() {
                return Err(TreeError::DuplicateId { kind: KIND, id: cell.id });
            }
        }

        let mut nodes = Vec::with_capacity(cells.len());
        for cell in cells {
            let id = cell.id;
            let aabb =
                Aabb3::from_ir(&cell.aabb).ok_or(TreeError::InvalidAabb { kind: KIND, id })?;
            match (cell.is_leaf, cell.children.is_empty()) {
                (true, false) => {
                    return Err(TreeError::malformed(KIND, id, "leaf cell lists children"));
                }
                (false, true) => {
                    return Err(TreeError::malformed(KIND, id, "internal cell has no children"));
                }
                _ => {}
            }
            let children = cell
                .children
                .iter()
                .map(|&child| {
                    by_id
                        .get(&child)
                        .copied()
                        .ok_or(TreeError::NotFound { kind: KIND, id: child })
                })
                .collect::<Result<Vec<_>>>()?;
            nodes.push(OctreeNode {
                id,
                aabb,
                bvhs: cell.bvhs.clone(),
                children,
                parent: None,
                is_leaf: cell.is_leaf,
                depth: None,
            });
        }

        let mut octree = Self { nodes, by_id };
        octree.link_from_root()?;
        Ok(octree)
    }

    fn link_from_root(&mut self) -> Result<()> {
        let mut queue = VecDeque::from([OctreeIndex(0)]);
        self.nodes[0].depth = Some(0);

        while let Some(current) = queue.pop_front() {
            let depth = self.nodes[current.0].depth.unwrap_or(0);
            for child in self.nodes[current.0].children.clone() {
                let node = &mut self.nodes[child.0];
                if node.depth.is_some() {
                    return Err(TreeError::malformed(
                        KIND,
                        node.id,
                        "cell is reachable from more than one parent",
                    ));
                }
                node.depth = Some(depth + 1);
                node.parent = Some(current);
                queue.push_back(child);
            }
        }

        let unreachable = self.nodes.iter().filter(|n| n.depth.is_none()).count();
        if unreachable > 0 {
            warn!(count = unreachable, "octree cells not reachable from the root are ignored");
        }
        Ok(())
    }

    /// The root cell.
    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    /// Cell stored at `index`.
    pub fn get(&self, index: OctreeIndex) -> &OctreeNode {
        &self.nodes[index.0]
    }

    /// Find the unique cell with the given id.
    pub fn find_node(&self, id: OctreeNodeId) -> Result<&OctreeNode> {
        self.by_id
            .get(&id)
            .map(|&index| self.get(index))
            .ok_or(TreeError::NotFound { kind: KIND, id })
    }

    /// Child cells of `node`, in serialized order.
    pub fn children<'a>(&'a self, node: &'a OctreeNode) -> impl Iterator<Item = &'a OctreeNode> {
        node.children.iter().map(move |&index| self.get(index))
    }

    /// Parent of `node`, `None` for the root.
    pub fn parent(&self, node: &OctreeNode) -> Option<&OctreeNode> {
        node.parent.map(|index| self.get(index))
    }

    /// Cells reachable from the root, breadth first.
    pub fn iter_breadth_first(&self) -> impl Iterator<Item = &OctreeNode> {
        let mut queue = VecDeque::from([OctreeIndex(0)]);
        std::iter::from_fn(move || {
            let node = self.get(queue.pop_front()?);
            queue.extend(node.children.iter().copied());
            Some(node)
        })
    }

    /// Reachable leaf cells.
    pub fn leaves(&self) -> impl Iterator<Item = &OctreeNode> {
        self.iter_breadth_first().filter(|n| n.is_leaf)
    }

    /// Number of cells, including unreachable ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: an octree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bvhlens_ir::Aabb;

    pub(crate) fn cell(
        id: OctreeNodeId,
        children: Vec<OctreeNodeId>,
        bvhs: Vec<BvhId>,
    ) -> bvhlens_ir::OctreeNode {
        bvhlens_ir::OctreeNode {
            id,
            aabb: Aabb {
                min: [0.0; 3],
                max: [1.0; 3],
            },
            is_leaf: children.is_empty(),
            bvhs,
            children,
        }
    }

    /// root(10) -> [11 -> [13, 14], 12]
    pub(crate) fn sample() -> Vec<bvhlens_ir::OctreeNode> {
        vec![
            cell(10, vec![11, 12], vec![0, 1]),
            cell(11, vec![13, 14], vec![0, 1]),
            cell(12, vec![], vec![]),
            cell(13, vec![], vec![0]),
            cell(14, vec![], vec![0, 1]),
        ]
    }

    #[test]
    fn test_build() {
        let octree = Octree::from_ir(&sample()).unwrap();
        assert_eq!(octree.len(), 5);
        assert_eq!(octree.root().id, 10);
        let children: Vec<_> = octree.children(octree.root()).map(|c| c.id).collect();
        assert_eq!(children, vec![11, 12]);
        let leaf = octree.find_node(14).unwrap();
        assert_eq!(leaf.depth, Some(2));
        assert_eq!(octree.parent(leaf).unwrap().id, 11);
    }

    #[test]
    fn test_leaves() {
        let octree = Octree::from_ir(&sample()).unwrap();
        let leaves: Vec<_> = octree.leaves().map(|c| c.id).collect();
        assert_eq!(leaves, vec![12, 13, 14]);
    }

    #[test]
    fn test_find_missing() {
        let octree = Octree::from_ir(&sample()).unwrap();
        assert_eq!(
            octree.find_node(99).unwrap_err().to_string(),
            "no octree node with id = 99 found"
        );
    }

    #[test]
    fn test_leaf_flag_must_match_children() {
        let mut cells = sample();
        cells[2].children = vec![13];
        assert!(matches!(
            Octree::from_ir(&cells).unwrap_err(),
            TreeError::MalformedNode { id: 12, .. }
        ));

        let mut cells = sample();
        cells[1].children.clear();
        assert!(matches!(
            Octree::from_ir(&cells).unwrap_err(),
            TreeError::MalformedNode { id: 11, .. }
        ));
    }

    #[test]
    fn test_dangling_child() {
        let mut cells = sample();
        cells[0].children.push(77);
        assert_eq!(
            Octree::from_ir(&cells).unwrap_err(),
            TreeError::NotFound { kind: KIND, id: 77 }
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            Octree::from_ir(&[]).unwrap_err(),
            TreeError::EmptyTree("octree")
        );
    }
}
