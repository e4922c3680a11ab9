#![warn(missing_docs)]

//! Inspect precomputed BVHs and octrees and measure ray traversal cost.
//!
//! A [`Scene`] is everything one document describes: the BVHs with their
//! influence regions, the shared triangles and the enclosing octree. It is
//! loaded in one go and replaced wholesale by [`Scene::reload`].
//!
//! # Example
//!
//! ```
//! use bvhlens::{CastSettings, Scene};
//!
//! let json = r#"{
//!     "nodes": [ { "core": { "id": 1, "aabb": { "min": [0, 0, 0], "max": [1, 1, 1] },
//!                            "triangles": [1] } } ],
//!     "influenceArea": { "type": "plane", "size": [0.25, 0.25],
//!         "plane": { "point": [0.5, 0.5, -1], "normal": [0, 0, 1] } }
//! }"#;
//! let mut scene = Scene::from_json(json, CastSettings::default()).unwrap();
//! let summary = scene.bvh_mut(0).unwrap().generate().unwrap().unwrap();
//! assert_eq!(summary.count_per_ray, 1.0);
//! ```

pub use bvhlens_ir;
pub use bvhlens_math;
pub use bvhlens_raycast;
pub use bvhlens_tree;

pub use bvhlens_ir::{Document, GlobalInfo, IrError};
pub use bvhlens_raycast::{
    BatchSummary, CastSettings, CostModel, InfluenceRegion, IntersectionInfo, RayCaster,
    RaycastError,
};
pub use bvhlens_tree::{
    NodeReport, Octree, SpatialTree, SummaryMismatch, Triangle, TreeError, TreeSummary,
    TriangleStore,
};

use std::path::Path;

use bvhlens_ir::{BvhData, NodeId};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while loading or querying a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The document could not be read or parsed.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A tree in the document is malformed, or a lookup failed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// An influence area or cast failed.
    #[error(transparent)]
    Raycast(#[from] RaycastError),

    /// BVH index out of range.
    #[error("no BVH at index {0}")]
    NoSuchBvh(usize),
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

/// One BVH of a scene together with its ray caster.
#[derive(Debug, Clone)]
pub struct LoadedBvh {
    tree: SpatialTree,
    global_info: GlobalInfo,
    costs: CostModel,
    caster: Option<RayCaster>,
}

impl LoadedBvh {
    /// Validate a serialized BVH and set up its caster.
    ///
    /// A BVH without an influence area gets no caster; an influence area of
    /// unknown type aborts the load.
    pub fn from_ir(data: &BvhData, settings: CastSettings) -> Result<Self> {
        let tree = SpatialTree::from_ir(data)?;
        let costs = CostModel::from_global_info(&data.global_info);
        let caster = data
            .influence_area
            .as_ref()
            .map(|area| InfluenceRegion::from_ir(area).map(|r| RayCaster::new(r, settings, costs)))
            .transpose()?;
        Ok(Self {
            tree,
            global_info: data.global_info,
            costs,
            caster,
        })
    }

    /// The tree.
    pub fn tree(&self) -> &SpatialTree {
        &self.tree
    }

    /// Global info as supplied by the builder.
    pub fn global_info(&self) -> &GlobalInfo {
        &self.global_info
    }

    /// Cost model used by the caster.
    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    /// Summary recomputed from the tree.
    pub fn summary(&self) -> TreeSummary {
        TreeSummary::new(&self.tree, &self.global_info)
    }

    /// Fields of the supplied global info that disagree with the tree.
    pub fn mismatches(&self) -> Vec<SummaryMismatch> {
        self.summary().mismatches(&self.global_info)
    }

    /// The caster, if the BVH has an influence area.
    pub fn caster(&self) -> Option<&RayCaster> {
        self.caster.as_ref()
    }

    /// Mutable access to the caster.
    pub fn caster_mut(&mut self) -> Option<&mut RayCaster> {
        self.caster.as_mut()
    }

    /// The tree together with mutable access to its caster.
    pub fn tree_and_caster_mut(&mut self) -> (&SpatialTree, Option<&mut RayCaster>) {
        (&self.tree, self.caster.as_mut())
    }

    /// Generate and trace a ray batch; `None` without an influence area.
    pub fn generate(&mut self) -> Option<std::result::Result<BatchSummary, RaycastError>> {
        let tree = &self.tree;
        self.caster.as_mut().map(|caster| caster.generate(tree))
    }

    /// Drop the cached ray batch.
    pub fn delete_rays(&mut self) {
        if let Some(caster) = self.caster.as_mut() {
            caster.delete();
        }
    }
}

/// A loaded document.
#[derive(Debug, Clone)]
pub struct Scene {
    bvhs: Vec<LoadedBvh>,
    triangles: TriangleStore,
    octree: Option<Octree>,
}

impl Scene {
    /// Build a scene from a parsed document.
    ///
    /// Scene-level triangles come first in the triangle store, followed by
    /// each BVH's own triangles; a repeated id keeps its first definition.
    pub fn from_document(doc: &Document, settings: CastSettings) -> Result<Self> {
        let mut triangles = TriangleStore::from_ir(&doc.triangles);
        for bvh in &doc.bvhs {
            triangles.extend(&bvh.triangles);
        }

        let bvhs = doc
            .bvhs
            .iter()
            .map(|data| LoadedBvh::from_ir(data, settings))
            .collect::<Result<Vec<_>>>()?;

        let octree = if doc.octree.is_empty() {
            None
        } else {
            Some(Octree::from_ir(&doc.octree)?)
        };

        for (i, bvh) in bvhs.iter().enumerate() {
            for mismatch in bvh.mismatches() {
                warn!(bvh = i, "global info disagrees with the tree: {mismatch}");
            }
        }
        info!(
            bvhs = bvhs.len(),
            triangles = triangles.len(),
            octree_nodes = octree.as_ref().map_or(0, Octree::len),
            "scene loaded"
        );

        Ok(Self {
            bvhs,
            triangles,
            octree,
        })
    }

    /// Parse and build a scene from JSON.
    pub fn from_json(json: &str, settings: CastSettings) -> Result<Self> {
        Self::from_document(&Document::from_json(json)?, settings)
    }

    /// Read, parse and build a scene from a file.
    pub fn load(path: impl AsRef<Path>, settings: CastSettings) -> Result<Self> {
        Self::from_document(&Document::from_path(path)?, settings)
    }

    /// Replace the whole scene with a new document. On error the current
    /// scene is kept untouched.
    pub fn reload(&mut self, doc: &Document, settings: CastSettings) -> Result<()> {
        *self = Self::from_document(doc, settings)?;
        Ok(())
    }

    /// All BVHs in document order.
    pub fn bvhs(&self) -> &[LoadedBvh] {
        &self.bvhs
    }

    /// The BVH at `index`.
    pub fn bvh(&self, index: usize) -> Result<&LoadedBvh> {
        self.bvhs.get(index).ok_or(SceneError::NoSuchBvh(index))
    }

    /// Mutable access to the BVH at `index`.
    pub fn bvh_mut(&mut self, index: usize) -> Result<&mut LoadedBvh> {
        self.bvhs.get_mut(index).ok_or(SceneError::NoSuchBvh(index))
    }

    /// The octree, if the document has one.
    pub fn octree(&self) -> Option<&Octree> {
        self.octree.as_ref()
    }

    /// Every triangle of the scene.
    pub fn triangles(&self) -> &TriangleStore {
        &self.triangles
    }

    /// Triangles held by node `id` of BVH `index`.
    pub fn primitives(&self, index: usize, id: NodeId) -> Result<Vec<&Triangle>> {
        let node = self.bvh(index)?.tree().find_node(id)?;
        Ok(self.triangles.resolve(&node.primitives)?)
    }

    /// Generate rays for every BVH that has an influence area.
    ///
    /// Returns `(bvh index, batch result)` pairs in BVH order.
    pub fn generate_all_rays(
        &mut self,
    ) -> Vec<(usize, std::result::Result<BatchSummary, RaycastError>)> {
        self.bvhs
            .iter_mut()
            .enumerate()
            .filter_map(|(i, bvh)| bvh.generate().map(|r| (i, r)))
            .collect()
    }

    /// Drop every cached ray batch.
    pub fn delete_all_rays(&mut self) {
        for bvh in &mut self.bvhs {
            bvh.delete_rays();
        }
    }
}
