#![warn(missing_docs)]

//! Math types for bvhlens.
//!
//! Thin wrappers around nalgebra providing the points, vectors, directions,
//! look-at frames and tolerance constants used to inspect bounding volume
//! hierarchies and cast rays through them.

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Build a [`Point3`] from a `[x, y, z]` component array.
#[inline]
pub fn point3(c: [f64; 3]) -> Point3 {
    Point3::new(c[0], c[1], c[2])
}

/// Build a [`Vec3`] from a `[x, y, z]` component array.
#[inline]
pub fn vec3(c: [f64; 3]) -> Vec3 {
    Vec3::new(c[0], c[1], c[2])
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Local-to-world frame with the given origin and basis.
    ///
    /// Local `x`, `y` and `z` map onto `right`, `up` and `forward`.
    pub fn from_frame(origin: &Point3, right: &Vec3, up: &Vec3, forward: &Vec3) -> Self {
        let mut m = Matrix4::identity();
        for row in 0..3 {
            m[(row, 0)] = right[row];
            m[(row, 1)] = up[row];
            m[(row, 2)] = forward[row];
            m[(row, 3)] = origin[row];
        }
        Self { matrix: m }
    }

    /// Orthonormal local-to-world frame looking along `forward`.
    ///
    /// The basis follows the editor convention `right = up_hint × forward`,
    /// `up = forward × right` with `up_hint = +Y`. When `forward` is parallel
    /// to +Y the hint falls back to +Z. Returns `None` for a zero `forward`.
    pub fn look_at_frame(origin: &Point3, forward: &Vec3) -> Option<Self> {
        let (right, up, forward) = look_basis(forward)?;
        Some(Self::from_frame(
            origin,
            right.as_ref(),
            up.as_ref(),
            forward.as_ref(),
        ))
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }
}

/// Orthonormal `(right, up, forward)` basis looking along `forward`.
///
/// See [`Transform::look_at_frame`] for the handedness convention.
pub fn look_basis(forward: &Vec3) -> Option<(Dir3, Dir3, Dir3)> {
    let forward = Dir3::try_new(*forward, Tolerance::DEFAULT.linear)?;
    let hint = if forward.y.abs() > 1.0 - Tolerance::DEFAULT.angular {
        Vec3::z()
    } else {
        Vec3::y()
    };
    let right = Dir3::try_new(hint.cross(forward.as_ref()), Tolerance::DEFAULT.linear)?;
    let up = Dir3::new_normalize(forward.cross(right.as_ref()));
    Some((right, up, forward))
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-9 linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-9,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_identity() {
        let t = Transform::default();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!((t.apply_point(&p) - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation_ignored_for_vectors() {
        let t = Transform::from_frame(
            &Point3::new(10.0, 20.0, 30.0),
            &Vec3::x(),
            &Vec3::y(),
            &Vec3::z(),
        );
        assert_relative_eq!(t.apply_vec(&Vec3::new(1.0, 0.0, 0.0)), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(t.apply_point(&Point3::origin()), Point3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_look_at_frame_default_forward() {
        // Looking down +Z reproduces the world axes
        let t = Transform::look_at_frame(&Point3::origin(), &Vec3::z()).unwrap();
        assert_relative_eq!(t.apply_vec(&Vec3::x()), Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(t.apply_vec(&Vec3::y()), Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(t.apply_vec(&Vec3::z()), Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_look_at_frame_maps_local_z_to_forward() {
        let origin = Point3::new(1.0, 2.0, 3.0);
        let forward = Vec3::new(1.0, 0.0, 1.0);
        let t = Transform::look_at_frame(&origin, &forward).unwrap();
        let p = t.apply_point(&Point3::new(0.0, 0.0, 2.0_f64.sqrt()));
        assert_relative_eq!(p, Point3::new(2.0, 2.0, 4.0), epsilon = 1e-12);
    }

    #[test]
    fn test_look_basis_is_orthonormal() {
        for forward in [
            Vec3::new(0.3, -0.2, 0.9),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -3.0, 0.0),
        ] {
            let (r, u, f) = look_basis(&forward).unwrap();
            assert!(r.dot(u.as_ref()).abs() < 1e-12);
            assert!(r.dot(f.as_ref()).abs() < 1e-12);
            assert!(u.dot(f.as_ref()).abs() < 1e-12);
            assert!((f.into_inner() - forward.normalize()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_look_basis_rejects_zero() {
        assert!(look_basis(&Vec3::zeros()).is_none());
        assert!(Transform::look_at_frame(&Point3::origin(), &Vec3::zeros()).is_none());
    }
}
