#![warn(missing_docs)]

//! Read-only spatial trees for bvhlens.
//!
//! The trees are never built here: an external builder serializes them and
//! [`bvhlens_ir`] parses them. This crate validates that data once and stores
//! it in flat arenas addressed by index, so parents, children and lookups by
//! id never need to chase live references.
//!
//! # Architecture
//!
//! - [`Aabb3`] - Axis-aligned bounding box
//! - [`SpatialTree`] - Binary BVH with leaf/internal status derived from structure
//! - [`Octree`] - Octree enclosing a set of BVHs
//! - [`TriangleStore`] - Triangles referenced by BVH leaves
//! - [`TreeSummary`] - Statistics recomputed from a tree on demand
//!
//! # Example
//!
//! ```
//! use bvhlens_ir::Document;
//! use bvhlens_tree::SpatialTree;
//!
//! let doc = Document::from_json(r#"{ "nodes": [ { "core": { "id": 1,
//!     "aabb": { "min": [0, 0, 0], "max": [1, 1, 1] } } } ] }"#).unwrap();
//! let tree = SpatialTree::from_ir(&doc.bvhs[0]).unwrap();
//! assert!(tree.root().is_leaf());
//! ```

mod aabb;
pub mod bvh;
mod error;
pub mod octree;
mod summary;
mod triangle;
pub mod visibility;

pub use aabb::Aabb3;
pub use bvh::{Highlight, NodeIndex, SpatialTree, TreeNode};
pub use error::{Result, TreeError};
pub use octree::{Octree, OctreeIndex, OctreeNode};
pub use summary::{NodeReport, SummaryMismatch, TreeSummary};
pub use triangle::{Triangle, TriangleStore};
pub use visibility::{BvhVisibility, CellVisibility, NodeVisibility, OctreeVisibility};

pub use bvhlens_ir::{BvhId, Metrics, NodeId, OctreeNodeId, TriangleId};
