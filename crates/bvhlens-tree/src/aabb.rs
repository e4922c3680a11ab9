//! Axis-aligned bounding boxes.

use bvhlens_math::{point3, Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an AABB, rejecting non-finite corners and `min > max` on any axis.
    pub fn try_new(min: Point3, max: Point3) -> Option<Self> {
        let finite = min.iter().chain(max.iter()).all(|c| c.is_finite());
        let ordered = (0..3).all(|axis| min[axis] <= max[axis]);
        (finite && ordered).then_some(Self { min, max })
    }

    /// Convert a serialized box.
    pub fn from_ir(aabb: &bvhlens_ir::Aabb) -> Option<Self> {
        Self::try_new(point3(aabb.min), point3(aabb.max))
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Test if a point lies inside or on the boundary.
    pub fn contains_point(&self, p: &Point3) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area of the box.
    pub fn surface_area(&self) -> f64 {
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// The 8 corners, `index = x*4 + y*2 + z` where a set bit picks `max`
    /// on that axis.
    ///
    /// ```text
    ///  2_______________6
    ///  |\              \
    ///  | \______________\7
    /// 0| 3|          4. |
    ///   \ |             |
    ///    \|_____________|
    ///     1             5
    /// ```
    pub fn corners(&self) -> [Point3; 8] {
        let size = self.size();
        std::array::from_fn(|i| {
            let bit = |shift: usize| ((i >> shift) & 1) as f64;
            self.min + Vec3::new(bit(2) * size.x, bit(1) * size.y, bit(0) * size.z)
        })
    }
}
