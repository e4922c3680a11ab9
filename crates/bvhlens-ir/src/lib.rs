#![warn(missing_docs)]

//! Serialized documents consumed by bvhlens.
//!
//! An external builder writes bounding volume hierarchies, the triangles they
//! reference, the influence areas used to evaluate them and an enclosing
//! octree to a single JSON document. This crate mirrors that format one to
//! one; validation of the tree structure happens in `bvhlens-tree`.
//!
//! Vectors are stored as fixed-size component arrays, so a list with the
//! wrong number of components is rejected while parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Identifier of a BVH node.
pub type NodeId = u32;

/// Identifier of a triangle.
pub type TriangleId = u32;

/// Identifier of an octree node.
pub type OctreeNodeId = u32;

/// Identifier of a BVH referenced from an octree node.
pub type BvhId = u32;

/// Errors raised while reading a document.
#[derive(Error, Debug)]
pub enum IrError {
    /// I/O error reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, missing fields or vectors with the wrong component count.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document holds neither a BVH nor an octree.
    #[error("document contains no BVH and no octree")]
    EmptyDocument,
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, IrError>;

/// Axis-aligned box in min/max form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

/// A triangle referenced by BVH leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Triangle id.
    pub id: TriangleId,
    /// First vertex.
    pub v1: [f64; 3],
    /// Second vertex.
    pub v2: [f64; 3],
    /// Third vertex.
    pub v3: [f64; 3],
}

/// Structural part of a BVH node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Core {
    /// Bounding box of the node.
    pub aabb: Aabb,
    /// Node id.
    pub id: NodeId,
    /// Left child id, `0` or absent when there is none.
    #[serde(default)]
    pub left_child: Option<NodeId>,
    /// Right child id, `0` or absent when there is none.
    #[serde(default)]
    pub right_child: Option<NodeId>,
    /// Triangles held by the node (leaves only, by convention).
    #[serde(default)]
    pub triangles: Vec<TriangleId>,
}

impl Core {
    /// Left child id, with the `0` sentinel mapped to `None`.
    pub fn left(&self) -> Option<NodeId> {
        self.left_child.filter(|&id| id != 0)
    }

    /// Right child id, with the `0` sentinel mapped to `None`.
    pub fn right(&self) -> Option<NodeId> {
        self.right_child.filter(|&id| id != 0)
    }
}

/// Precomputed per-node metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Projected area.
    pub pa: f64,
    /// Projected area heuristic.
    pub pah: f64,
    /// Surface area.
    pub sa: f64,
    /// Surface area heuristic.
    pub sah: f64,
}

/// A BVH node as written by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvhNode {
    /// Structure: id, box, children, triangles.
    pub core: Core,
    /// Precomputed metrics.
    #[serde(default)]
    pub metrics: Metrics,
}

impl BvhNode {
    /// A node is a leaf iff it has no children.
    pub fn is_leaf(&self) -> bool {
        self.core.left().is_none() && self.core.right().is_none()
    }
}

/// Global statistics of a BVH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalInfo {
    /// Deepest level of the tree.
    pub max_level: u32,
    /// Number of leaves.
    pub number_of_leaves: u32,
    /// Number of nodes.
    pub number_of_nodes: u32,
    /// Projected area heuristic cost of the whole tree.
    pub pah_cost: f64,
    /// Surface area heuristic cost of the whole tree.
    pub sah_cost: f64,
    /// Cost of testing an internal node, if the builder recorded it.
    pub internal_node_cost: Option<f64>,
    /// Cost of testing a primitive in a leaf, if the builder recorded it.
    pub leaf_node_cost: Option<f64>,
}

/// A plane given by a point and a normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Point on the plane.
    pub point: [f64; 3],
    /// Plane normal; rays leave the plane along it.
    pub normal: [f64; 3],
}

/// Oriented box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obb {
    /// Center of the box.
    pub center: [f64; 3],
    /// Half size along the local right, up and forward axes.
    pub half_size: [f64; 3],
    /// Local forward axis.
    pub forward: [f64; 3],
}

/// Perspective parameters of a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrustumParameters {
    /// Horizontal field of view in radians.
    pub fov_x: f64,
    /// Aspect ratio (width / height).
    pub ratio: f64,
    /// Near plane distance.
    pub n: f64,
    /// Far plane distance.
    pub f: f64,
}

/// A view frustum.
///
/// `vertices` use the box corner layout `index = x*4 + y*2 + z` where the
/// `z` bit selects the near (0) or far (1) face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    /// Perspective parameters.
    pub parameters: FrustumParameters,
    /// The 8 corners, if the builder exported them.
    #[serde(default)]
    pub vertices: Option<[[f64; 3]; 8]>,
}

/// Region of space the BVH was built for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvhRegion {
    /// Region type tag (`"obb"` or `"frustum"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Box region.
    #[serde(default)]
    pub obb: Option<Obb>,
    /// Frustum region.
    #[serde(default)]
    pub frustum: Option<Frustum>,
}

/// A point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pov {
    /// Eye position.
    pub position: [f64; 3],
    /// Viewing direction.
    pub direction: [f64; 3],
}

/// Influence area made of a single point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointInfluenceArea {
    /// The point of view.
    pub pov: Pov,
    /// The frustum seen from it.
    pub bvh_region: BvhRegion,
}

/// Region from which evaluation rays are cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceArea {
    /// Area type tag (`"plane"`, `"point"`, `"obb"`, `"frustum"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Plane of a planar area.
    #[serde(default)]
    pub plane: Option<Plane>,
    /// Half extents of a planar area along its local x and y.
    #[serde(default)]
    pub size: Option<[f64; 2]>,
    /// Ray density recorded by the builder.
    #[serde(default)]
    pub density: Option<f64>,
    /// Region the BVH was built for.
    #[serde(default)]
    pub bvh_region: Option<BvhRegion>,
    /// Point of view of a point area.
    #[serde(default)]
    pub point_influence_area: Option<PointInfluenceArea>,
}

/// One BVH with its triangles and influence area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BvhData {
    /// Global statistics.
    #[serde(default)]
    pub global_info: GlobalInfo,
    /// Triangles local to this BVH.
    #[serde(default)]
    pub triangles: Vec<Triangle>,
    /// Nodes; the first one is the root.
    pub nodes: Vec<BvhNode>,
    /// Influence area used to evaluate the BVH.
    #[serde(default)]
    pub influence_area: Option<InfluenceArea>,
}

impl BvhData {
    /// The root node (first node of the list).
    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    /// Find a node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&BvhNode> {
        self.nodes.iter().find(|n| n.core.id == id)
    }

    /// Find a triangle local to this BVH by id.
    pub fn find_triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.iter().find(|t| t.id == id)
    }
}

/// A node of the octree enclosing the BVHs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OctreeNode {
    /// Node id.
    pub id: OctreeNodeId,
    /// Bounding box of the cell.
    pub aabb: Aabb,
    /// BVHs overlapping the cell.
    #[serde(default)]
    pub bvhs: Vec<BvhId>,
    /// Child cell ids.
    #[serde(default)]
    pub children: Vec<OctreeNodeId>,
    /// Whether the cell is a leaf.
    pub is_leaf: bool,
}

/// A full scene document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// All BVHs.
    #[serde(default)]
    pub bvhs: Vec<BvhData>,
    /// Triangles shared by the BVHs.
    #[serde(default)]
    pub triangles: Vec<Triangle>,
    /// Octree nodes; the first one is the root.
    #[serde(default)]
    pub octree: Vec<OctreeNode>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a single BVH into a document.
    pub fn single(bvh: BvhData) -> Self {
        Self {
            bvhs: vec![bvh],
            ..Self::default()
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from a JSON string.
    ///
    /// Accepts a scene document (`{"bvhs": [...], ...}`) or a bare BVH
    /// object, which is wrapped into a one-BVH document.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let doc = if value.get("bvhs").is_some() || value.get("octree").is_some() {
            serde_json::from_value(value)?
        } else {
            Self::single(serde_json::from_value(value)?)
        };
        if doc.bvhs.is_empty() && doc.octree.is_empty() {
            return Err(IrError::EmptyDocument);
        }
        Ok(doc)
    }

    /// Read and parse a document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Find a shared triangle by id.
    pub fn find_triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.iter().find(|t| t.id == id)
    }

    /// Find an octree node by id.
    pub fn find_octree_node(&self, id: OctreeNodeId) -> Option<&OctreeNode> {
        self.octree.iter().find(|n| n.id == id)
    }

    /// The octree root (first node of the list).
    pub fn octree_root(&self) -> Option<&OctreeNode> {
        self.octree.first()
    }
}
