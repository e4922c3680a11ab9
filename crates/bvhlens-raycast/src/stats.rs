//! Batch aggregation of per-ray statistics.

use serde::Serialize;

use crate::error::{RaycastError, Result};
use crate::IntersectionInfo;

/// Summary of a ray batch in which at least one ray hit the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Sum of the per-ray statistics.
    pub total: IntersectionInfo,
    /// Rays traced, including the ones that missed.
    pub rays_cast: usize,
    /// Intersected nodes per contributing ray.
    pub count_per_ray: f64,
    /// Cost per contributing ray.
    pub cost_per_ray: f64,
}

impl BatchSummary {
    /// Rays that missed the root and were left out of the averages.
    pub fn rays_missed(&self) -> usize {
        self.rays_cast - self.total.rays
    }
}

/// Sum per-ray statistics into a batch summary.
///
/// Fails with [`RaycastError::UndefinedAggregate`] when no ray hit the tree,
/// which includes the empty batch.
pub fn aggregate<I>(infos: I) -> Result<BatchSummary>
where
    I: IntoIterator<Item = IntersectionInfo>,
{
    let mut total = IntersectionInfo::ZERO;
    let mut rays_cast = 0;
    for info in infos {
        total += info;
        rays_cast += 1;
    }
    match (total.count_per_ray(), total.cost_per_ray()) {
        (Some(count_per_ray), Some(cost_per_ray)) => Ok(BatchSummary {
            total,
            rays_cast,
            count_per_ray,
            cost_per_ray,
        }),
        _ => Err(RaycastError::UndefinedAggregate { rays_cast }),
    }
}
