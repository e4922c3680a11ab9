#![warn(missing_docs)]

//! Ray/BVH intersection cost statistics.
//!
//! Synthetic rays are drawn from an influence region and walked through an
//! already built [`SpatialTree`](bvhlens_tree::SpatialTree) to measure how
//! many nodes each ray touches and what that traversal costs.
//!
//! # Architecture
//!
//! - [`InfluenceRegion`] - Closed set of sampling domains (plane, point, frustum, box)
//! - [`generate_rays`] - Seeded, reproducible ray batches
//! - [`trace_ray`] - Queue-based breadth-first walk with the [`CostModel`]
//! - [`aggregate`] - Batch sums and per-ray averages, excluding rays that missed
//! - [`RayCaster`] - Generate/delete pipeline caching one batch per region
//!
//! # Example
//!
//! ```
//! use bvhlens_ir::Document;
//! use bvhlens_math::{Point3, Vec3};
//! use bvhlens_raycast::{CastSettings, CostModel, InfluenceRegion, RayCaster};
//! use bvhlens_tree::SpatialTree;
//!
//! let doc = Document::from_json(r#"{ "nodes": [ { "core": { "id": 1,
//!     "aabb": { "min": [0, 0, 0], "max": [1, 1, 1] }, "triangles": [1, 2] } } ] }"#).unwrap();
//! let tree = SpatialTree::from_ir(&doc.bvhs[0]).unwrap();
//!
//! let origin = Point3::new(0.5, 0.5, -1.0);
//! let region = InfluenceRegion::planar(origin, Vec3::z(), [0.25, 0.25]).unwrap();
//! let mut caster = RayCaster::new(region, CastSettings::default(), CostModel::default());
//! let summary = caster.generate(&tree).unwrap();
//! assert_eq!(summary.count_per_ray, 1.0);
//! assert_eq!(summary.cost_per_ray, 2.0);
//! ```

mod caster;
mod error;
mod generate;
mod ray;
pub mod region;
pub mod settings;
mod stats;
mod traverse;

pub use caster::{CasterState, RayCaster};
pub use error::{RaycastError, Result};
pub use generate::generate_rays;
pub use ray::{Ray, RaySegment};
pub use region::{InfluenceRegion, RaySampler};
pub use settings::CastSettings;
pub use stats::{aggregate, BatchSummary};
pub use traverse::{trace_ray, trace_ray_visits, CostModel, IntersectionInfo, RayTrace};
