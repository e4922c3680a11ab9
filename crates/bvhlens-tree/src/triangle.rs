//! Triangles referenced by BVH leaves.

use std::collections::HashMap;

use bvhlens_ir::TriangleId;
use bvhlens_math::{point3, Point3};

use crate::error::{Result, TreeError};
use crate::Aabb3;

/// A triangle from the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Triangle id.
    pub id: TriangleId,
    /// The three vertices.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Convert a serialized triangle.
    pub fn from_ir(t: &bvhlens_ir::Triangle) -> Self {
        Self {
            id: t.id,
            vertices: [point3(t.v1), point3(t.v2), point3(t.v3)],
        }
    }

    /// Bounding box of the three vertices.
    pub fn aabb(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for v in &self.vertices {
            aabb.include_point(v);
        }
        aabb
    }

    /// Geometric area.
    pub fn area(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a)).norm() / 2.0
    }
}

/// Id-addressed collection of triangles.
///
/// When two sources supply the same id the first one wins.
#[derive(Debug, Clone, Default)]
pub struct TriangleStore {
    triangles: Vec<Triangle>,
    by_id: HashMap<TriangleId, usize>,
}

impl TriangleStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from serialized triangles.
    pub fn from_ir(triangles: &[bvhlens_ir::Triangle]) -> Self {
        let mut store = Self::new();
        store.extend(triangles);
        store
    }

    /// Add triangles, skipping ids already present.
    pub fn extend(&mut self, triangles: &[bvhlens_ir::Triangle]) {
        for t in triangles {
            if self.by_id.contains_key(&t.id) {
                continue;
            }
            self.by_id.insert(t.id, self.triangles.len());
            self.triangles.push(Triangle::from_ir(t));
        }
    }

    /// Find the triangle with the given id.
    pub fn find(&self, id: TriangleId) -> Result<&Triangle> {
        self.by_id
            .get(&id)
            .map(|&i| &self.triangles[i])
            .ok_or(TreeError::NotFound {
                kind: "triangle",
                id,
            })
    }

    /// Look up every id, failing on the first unknown one.
    pub fn resolve(&self, ids: &[TriangleId]) -> Result<Vec<&Triangle>> {
        ids.iter().map(|&id| self.find(id)).collect()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Triangle> {
        self.triangles.iter()
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the store holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
