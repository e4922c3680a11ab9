//! Statistics recomputed from a tree.

use std::fmt;

use bvhlens_ir::GlobalInfo;
use serde::Serialize;

use crate::{SpatialTree, TreeNode};

/// Global statistics of a BVH.
///
/// Counts and depth come from the reachable part of the tree with the root
/// at level 0. The SAH and PAH costs are whole-tree figures computed by the
/// builder and taken from the global info as supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreeSummary {
    /// Deepest level.
    pub max_level: u32,
    /// Reachable leaves.
    pub number_of_leaves: u32,
    /// Reachable nodes.
    pub number_of_nodes: u32,
    /// Surface area heuristic cost.
    pub sah_cost: f64,
    /// Projected area heuristic cost.
    pub pah_cost: f64,
}

/// A field where the recomputed summary disagrees with the supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryMismatch {
    /// Field name as written in the document.
    pub field: &'static str,
    /// Value found in the global info.
    pub supplied: u32,
    /// Value recomputed from the tree.
    pub computed: u32,
}

impl TreeSummary {
    /// Recompute the summary of `tree`.
    pub fn new(tree: &SpatialTree, info: &GlobalInfo) -> Self {
        let (mut nodes, mut leaves) = (0u32, 0u32);
        for node in tree.iter_breadth_first() {
            nodes += 1;
            if node.is_leaf() {
                leaves += 1;
            }
        }
        Self {
            max_level: tree.max_depth(),
            number_of_leaves: leaves,
            number_of_nodes: nodes,
            sah_cost: info.sah_cost,
            pah_cost: info.pah_cost,
        }
    }

    /// Fields where the supplied global info disagrees with this summary.
    pub fn mismatches(&self, info: &GlobalInfo) -> Vec<SummaryMismatch> {
        [
            ("maxLevel", info.max_level, self.max_level),
            ("numberOfLeaves", info.number_of_leaves, self.number_of_leaves),
            ("numberOfNodes", info.number_of_nodes, self.number_of_nodes),
        ]
        .into_iter()
        .filter(|(_, supplied, computed)| supplied != computed)
        .map(|(field, supplied, computed)| SummaryMismatch {
            field,
            supplied,
            computed,
        })
        .collect()
    }
}

impl fmt::Display for SummaryMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: supplied {}, computed {}",
            self.field, self.supplied, self.computed
        )
    }
}

/// One-line description of a node for the inspector.
#[derive(Debug, Clone, Copy)]
pub struct NodeReport<'a> {
    /// Label printed before the metrics.
    pub label: &'a str,
    /// The node described.
    pub node: &'a TreeNode,
}

impl<'a> NodeReport<'a> {
    /// Describe `node` under `label`.
    pub fn new(label: &'a str, node: &'a TreeNode) -> Self {
        Self { label, node }
    }
}

impl fmt::Display for NodeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.node.metrics;
        write!(
            f,
            "{} (id {})\tSA = {:.2}\tSAH = {:.2}\tPA = {:.2}\tPAH = {:.2}\tPrimitives = {}",
            self.label,
            self.node.id,
            m.sa,
            m.sah,
            m.pa,
            m.pah,
            self.node.primitive_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::tests::sample;

    #[test]
    fn test_summary_counts() {
        let data = sample();
        let tree = SpatialTree::from_ir(&data).unwrap();
        let info = GlobalInfo {
            sah_cost: 3.5,
            pah_cost: 1.25,
            ..GlobalInfo::default()
        };
        let summary = TreeSummary::new(&tree, &info);
        assert_eq!(summary.max_level, 2);
        assert_eq!(summary.number_of_nodes, 5);
        assert_eq!(summary.number_of_leaves, 3);
        assert!((summary.sah_cost - 3.5).abs() < 1e-12);
        assert!((summary.pah_cost - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_single_node_is_level_zero() {
        let data = crate::bvh::tests::bvh(vec![crate::bvh::tests::ir_node(
            1,
            [0.0; 3],
            [1.0; 3],
            None,
            vec![],
        )]);
        let tree = SpatialTree::from_ir(&data).unwrap();
        let summary = TreeSummary::new(&tree, &GlobalInfo::default());
        assert_eq!(summary.max_level, 0);
        assert_eq!(summary.number_of_leaves, 1);
    }

    #[test]
    fn test_mismatches() {
        let tree = SpatialTree::from_ir(&sample()).unwrap();
        let info = GlobalInfo {
            max_level: 2,
            number_of_leaves: 4,
            number_of_nodes: 5,
            ..GlobalInfo::default()
        };
        let mismatches = TreeSummary::new(&tree, &info).mismatches(&info);
        assert_eq!(
            mismatches,
            vec![SummaryMismatch {
                field: "numberOfLeaves",
                supplied: 4,
                computed: 3
            }]
        );
        assert_eq!(
            mismatches[0].to_string(),
            "numberOfLeaves: supplied 4, computed 3"
        );
    }

    #[test]
    fn test_node_report() {
        let mut data = sample();
        data.nodes[3].metrics.sa = 6.0;
        data.nodes[3].metrics.sah = 1.234;
        let tree = SpatialTree::from_ir(&data).unwrap();
        let line = NodeReport::new("Left child", tree.find_node(4).unwrap()).to_string();
        assert_eq!(
            line,
            "Left child (id 4)\tSA = 6.00\tSAH = 1.23\tPA = 0.00\tPAH = 0.00\tPrimitives = 3"
        );
    }
}
