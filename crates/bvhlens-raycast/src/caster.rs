//! The generate/delete pipeline of one influence region.

use bvhlens_tree::SpatialTree;
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::ray::RaySegment;
use crate::{
    aggregate, generate_rays, trace_ray, BatchSummary, CastSettings, CostModel, InfluenceRegion,
    IntersectionInfo, Ray,
};

/// Cached output of the last cast.
#[derive(Debug, Clone, Default)]
pub enum CasterState {
    /// Nothing generated, or the rays were deleted.
    #[default]
    Idle,
    /// Rays generated and traced.
    Cast {
        /// The generated rays.
        rays: Vec<Ray>,
        /// Statistics of each ray, in ray order.
        per_ray: Vec<IntersectionInfo>,
        /// Batch aggregate of `per_ray`.
        summary: Result<BatchSummary>,
    },
}

/// Casts ray batches from one region through a BVH.
///
/// The tree is borrowed per call and only read, so any number of casters can
/// share one tree. Each caster owns its cached batch.
#[derive(Debug, Clone)]
pub struct RayCaster {
    region: InfluenceRegion,
    settings: CastSettings,
    costs: CostModel,
    state: CasterState,
}

impl RayCaster {
    /// Create an idle caster.
    pub fn new(region: InfluenceRegion, settings: CastSettings, costs: CostModel) -> Self {
        Self {
            region,
            settings,
            costs,
            state: CasterState::Idle,
        }
    }

    /// The sampling region.
    pub fn region(&self) -> &InfluenceRegion {
        &self.region
    }

    /// Current cast settings.
    pub fn settings(&self) -> &CastSettings {
        &self.settings
    }

    /// Replace the cast settings; takes effect on the next [`generate`](Self::generate).
    pub fn set_settings(&mut self, settings: CastSettings) {
        self.settings = settings;
    }

    /// Current cost model.
    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    /// Replace the cost model; takes effect on the next [`generate`](Self::generate).
    pub fn set_costs(&mut self, costs: CostModel) {
        self.costs = costs;
    }

    /// Generate a fresh batch, trace it through `tree` and cache the result.
    ///
    /// Replaces any previous batch. Rays are traced in parallel but summed in
    /// ray order, so the result does not depend on scheduling. Invalid
    /// settings fail before anything is cached.
    pub fn generate(&mut self, tree: &SpatialTree) -> Result<BatchSummary> {
        self.settings.validate()?;
        let CastSettings {
            ray_count,
            length,
            seed,
        } = self.settings;

        let rays = generate_rays(&self.region, ray_count, seed);
        let per_ray: Vec<IntersectionInfo> = rays
            .par_iter()
            .map(|ray| trace_ray(tree, ray, length, &self.costs))
            .collect();
        let summary = aggregate(per_ray.iter().copied());

        match &summary {
            Ok(s) => debug!(
                region = self.region.kind(),
                rays = ray_count,
                seed,
                count_per_ray = s.count_per_ray,
                cost_per_ray = s.cost_per_ray,
                "ray batch traced"
            ),
            Err(e) => debug!(region = self.region.kind(), rays = ray_count, seed, "{e}"),
        }

        self.state = CasterState::Cast {
            rays,
            per_ray,
            summary: summary.clone(),
        };
        summary
    }

    /// Drop the cached batch.
    pub fn delete(&mut self) {
        self.state = CasterState::Idle;
    }

    /// The cached state.
    pub fn state(&self) -> &CasterState {
        &self.state
    }

    /// Whether a batch is cached.
    pub fn is_cast(&self) -> bool {
        matches!(self.state, CasterState::Cast { .. })
    }

    /// Cached rays, empty when idle.
    pub fn rays(&self) -> &[Ray] {
        match &self.state {
            CasterState::Cast { rays, .. } => rays,
            CasterState::Idle => &[],
        }
    }

    /// Cached per-ray statistics, empty when idle.
    pub fn per_ray(&self) -> &[IntersectionInfo] {
        match &self.state {
            CasterState::Cast { per_ray, .. } => per_ray,
            CasterState::Idle => &[],
        }
    }

    /// Cached batch summary; `None` when idle.
    pub fn summary(&self) -> Option<Result<BatchSummary>> {
        match &self.state {
            CasterState::Cast { summary, .. } => Some(summary.clone()),
            CasterState::Idle => None,
        }
    }

    /// Cached rays as drawable segments of the cast length.
    pub fn segments(&self) -> Vec<RaySegment> {
        self.rays()
            .iter()
            .map(|ray| ray.segment(self.settings.length))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::tests::two_leaf_tree;
    use crate::RaycastError;
    use bvhlens_math::{Point3, Vec3};

    fn caster(ray_count: usize) -> RayCaster {
        // a 0.4 x 0.4 patch under the left leaf, shooting up +Z
        let region =
            InfluenceRegion::planar(Point3::new(0.5, 0.5, -5.0), Vec3::z(), [0.4, 0.4]).unwrap();
        let settings = CastSettings {
            ray_count,
            length: 10.0,
            seed: 3,
        };
        RayCaster::new(region, settings, CostModel::default())
    }

    #[test]
    fn test_generate_and_delete() {
        let tree = two_leaf_tree();
        let mut caster = caster(20);
        assert!(caster.summary().is_none());

        let summary = caster.generate(&tree).unwrap();
        assert_eq!(caster.rays().len(), 20);
        assert_eq!(caster.per_ray().len(), 20);
        assert_eq!(summary.rays_cast, 20);
        // every ray hits the root and the left leaf
        assert!((summary.count_per_ray - 2.0).abs() < 1e-12);
        assert!((summary.cost_per_ray - 5.0).abs() < 1e-12);
        assert_eq!(caster.summary(), Some(Ok(summary)));

        caster.delete();
        assert!(!caster.is_cast());
        assert!(caster.rays().is_empty());
        assert!(caster.summary().is_none());
    }

    #[test]
    fn test_zero_rays_is_undefined() {
        let tree = two_leaf_tree();
        let mut caster = caster(0);
        assert_eq!(
            caster.generate(&tree).unwrap_err(),
            RaycastError::UndefinedAggregate { rays_cast: 0 }
        );
        assert!(caster.rays().is_empty());
        assert!(matches!(caster.summary(), Some(Err(_))));
    }

    #[test]
    fn test_all_rays_miss() {
        let tree = two_leaf_tree();
        let region =
            InfluenceRegion::planar(Point3::new(50.0, 0.0, 0.0), Vec3::z(), [1.0, 1.0]).unwrap();
        let mut caster = RayCaster::new(region, CastSettings::default(), CostModel::default());
        assert!(matches!(
            caster.generate(&tree),
            Err(RaycastError::UndefinedAggregate { rays_cast: 10 })
        ));
    }

    #[test]
    fn test_regenerate_is_deterministic() {
        let tree = two_leaf_tree();
        let mut caster = caster(50);
        let first = caster.generate(&tree).unwrap();
        let rays = caster.rays().to_vec();
        let second = caster.generate(&tree).unwrap();
        assert_eq!(first, second);
        assert_eq!(rays, caster.rays());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let tree = two_leaf_tree();
        let region =
            InfluenceRegion::planar(Point3::new(1.0, 1.0, -5.0), Vec3::z(), [1.5, 1.5]).unwrap();
        let settings = CastSettings {
            ray_count: 200,
            length: 10.0,
            seed: 9,
        };
        let mut caster = RayCaster::new(region.clone(), settings, CostModel::default());
        let summary = caster.generate(&tree).unwrap();

        let sequential: IntersectionInfo = generate_rays(&region, 200, 9)
            .iter()
            .map(|ray| trace_ray(&tree, ray, 10.0, &CostModel::default()))
            .sum();
        assert_eq!(summary.total, sequential);
        assert!(summary.rays_missed() > 0);
    }

    #[test]
    fn test_invalid_settings_keep_state() {
        let tree = two_leaf_tree();
        let mut caster = caster(5);
        caster.generate(&tree).unwrap();
        caster.set_settings(CastSettings {
            ray_count: 1000,
            ..*caster.settings()
        });
        assert!(matches!(
            caster.generate(&tree),
            Err(RaycastError::InvalidSettings(_))
        ));
        assert_eq!(caster.rays().len(), 5);
    }

    #[test]
    fn test_segments() {
        let tree = two_leaf_tree();
        let mut caster = caster(3);
        caster.generate(&tree).unwrap();
        for s in caster.segments() {
            assert!((s.end[2] - s.start[2] - 10.0).abs() < 1e-12);
        }
    }
}
