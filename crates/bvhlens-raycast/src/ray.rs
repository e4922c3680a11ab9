//! Ray representation and the ray-box slab test.

use bvhlens_math::{Dir3, Point3, Vec3};
use bvhlens_tree::Aabb3;
use serde::Serialize;

/// Below this magnitude a direction component counts as axis-parallel.
const PARALLEL_EPS: f64 = 1e-12;

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    direction: Dir3,
    /// Precomputed reciprocal of direction components for the slab test.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized. Returns `None` for a zero or
    /// non-finite direction.
    pub fn new(origin: Point3, direction: Vec3) -> Option<Self> {
        normalize(direction).map(|dir| Self::from_dir(origin, dir))
    }

    /// Create a ray from an already normalized direction.
    pub fn from_dir(origin: Point3, direction: Dir3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.map(|c| 1.0 / c),
        }
    }

    /// Unit direction of the ray.
    pub fn direction(&self) -> &Dir3 {
        &self.direction
    }

    /// Replace the direction, normalizing it. A zero direction is rejected
    /// and leaves the ray unchanged.
    pub fn set_direction(&mut self, direction: Vec3) -> bool {
        match normalize(direction) {
            Some(dir) => {
                *self = Self::from_dir(self.origin, dir);
                true
            }
            None => false,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Test ray-AABB intersection using the slab method, limited to
    /// `t in [0, length]`.
    ///
    /// Returns `Some((t_enter, t_exit))` clipped to that range. An origin
    /// inside the box intersects it with `t_enter = 0`. Axis-parallel rays
    /// are handled per axis so no `0 * inf` NaN can leak into the bounds.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3, length: f64) -> Option<(f64, f64)> {
        let mut t_min = 0.0_f64;
        let mut t_max = length;

        for axis in 0..3 {
            let o = self.origin[axis];
            if self.direction[axis].abs() < PARALLEL_EPS {
                if o < aabb.min[axis] || o > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = self.inv_direction[axis];
            let t1 = (aabb.min[axis] - o) * inv;
            let t2 = (aabb.max[axis] - o) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_max < t_min {
                return None;
            }
        }

        Some((t_min, t_max))
    }

    /// Segment endpoints `(origin, origin + length * direction)` for display.
    pub fn segment(&self, length: f64) -> RaySegment {
        let end = self.at(length);
        RaySegment {
            start: [self.origin.x, self.origin.y, self.origin.z],
            end: [end.x, end.y, end.z],
        }
    }
}

fn normalize(v: Vec3) -> Option<Dir3> {
    if v.iter().all(|c| c.is_finite()) {
        Dir3::try_new(v, PARALLEL_EPS)
    } else {
        None
    }
}

/// A drawable ray segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaySegment {
    /// Ray origin.
    pub start: [f64; 3],
    /// Point reached after the cast length.
    pub end: [f64; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb3 {
        Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_direction_is_normalized() {
        let mut ray = Ray::new(Point3::origin(), Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((ray.direction().norm() - 1.0).abs() < 1e-12);
        assert!((ray.direction().z - 0.8).abs() < 1e-12);

        assert!(ray.set_direction(Vec3::new(-2.0, 0.0, 0.0)));
        assert!((ray.direction().x + 1.0).abs() < 1e-12);
        assert!(!ray.set_direction(Vec3::zeros()));
        assert!((ray.direction().x + 1.0).abs() < 1e-12);

        assert!(Ray::new(Point3::origin(), Vec3::zeros()).is_none());
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let p = ray.at(5.0);
        assert!((p.x - 5.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let (t_min, t_max) = ray.intersect_aabb(&unit_box(), 100.0).unwrap();
        assert!((t_min - 5.0).abs() < 1e-10);
        assert!((t_max - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box(), 100.0).is_none());
    }

    #[test]
    fn test_ray_too_short() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box(), 4.9).is_none());
        let (_, t_max) = ray.intersect_aabb(&unit_box(), 5.5).unwrap();
        assert!((t_max - 5.5).abs() < 1e-10);
    }

    #[test]
    fn test_ray_inside_aabb() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let (t_min, t_max) = ray.intersect_aabb(&unit_box(), 100.0).unwrap();
        assert_eq!(t_min, 0.0);
        assert!((t_max - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_ray_on_box_face() {
        // origin exactly on the min-x face plane, travelling parallel to it
        let ray = Ray::new(Point3::new(0.0, 0.5, -1.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        let (t_min, t_max) = ray.intersect_aabb(&unit_box(), 10.0).unwrap();
        assert!(t_min.is_finite() && t_max.is_finite());
        assert!((t_min - 1.0).abs() < 1e-10);
        assert!((t_max - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_ray_aabb_diagonal() {
        let ray = Ray::new(Point3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box(), 100.0).is_some());
    }

    #[test]
    fn test_ray_aabb_behind() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box(), 100.0).is_none());
    }

    #[test]
    fn test_segment() {
        let ray = Ray::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)).unwrap();
        let s = ray.segment(3.0);
        assert_eq!(s.start, [1.0, 0.0, 0.0]);
        assert_eq!(s.end, [1.0, 0.0, 3.0]);
    }
}
