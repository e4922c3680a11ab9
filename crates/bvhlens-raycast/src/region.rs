//! Influence regions: the sampling domains rays are drawn from.

use bvhlens_ir::InfluenceArea;
use bvhlens_math::{point3, vec3, Dir3, Point3, Transform, Vec3};
use rand::Rng;

use crate::error::{RaycastError, Result};
use crate::Ray;

/// Region kind tag for [`InfluenceRegion::Planar`].
pub const PLANE: &str = "plane";
/// Region kind tag for [`InfluenceRegion::Point`].
pub const POINT: &str = "point";
/// Region kind tag for [`InfluenceRegion::Frustum`].
pub const FRUSTUM: &str = "frustum";
/// Region kind tag for [`InfluenceRegion::Obb`].
pub const OBB: &str = "obb";

/// A sampling domain for rays.
#[derive(Debug, Clone, PartialEq)]
pub enum InfluenceRegion {
    /// Rectangle on a plane; every ray starts on it and travels along the normal.
    Planar {
        /// Center of the rectangle.
        point: Point3,
        /// Plane normal, the direction of every ray.
        normal: Dir3,
        /// Half extents along the local right and up axes.
        half_extents: [f64; 2],
    },
    /// Point of view; rays fan out across its view frustum.
    Point {
        /// Eye position, the origin of every ray.
        position: Point3,
        /// View direction.
        direction: Dir3,
        /// Horizontal field of view in radians.
        fov_x: f64,
        /// Width over height.
        ratio: f64,
        /// Near plane distance.
        near: f64,
        /// Far plane distance.
        far: f64,
    },
    /// Frustum given by its 8 vertices, `index = x*4 + y*2 + z` with `z = 0`
    /// on the near quad and `z = 1` on the far quad.
    Frustum {
        /// The vertices.
        vertices: [Point3; 8],
    },
    /// Oriented box; rays start on its back face and travel along `forward`.
    Obb {
        /// Box center.
        center: Point3,
        /// Half size along the local right, up and forward axes.
        half_size: Vec3,
        /// Forward axis.
        forward: Dir3,
    },
}

fn invalid(msg: impl Into<String>) -> RaycastError {
    RaycastError::InvalidRegion(msg.into())
}

fn unit(v: Vec3, what: &str) -> Result<Dir3> {
    if !v.iter().all(|c| c.is_finite()) {
        return Err(invalid(format!("{what} is not finite")));
    }
    Dir3::try_new(v, 1e-12).ok_or_else(|| invalid(format!("{what} is a zero vector")))
}

fn finite(p: &Point3, what: &str) -> Result<()> {
    if p.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(invalid(format!("{what} is not finite")))
    }
}

fn non_negative(values: &[f64], what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite() && *v >= 0.0) {
        Ok(())
    } else {
        Err(invalid(format!("{what} must be finite and non-negative, got {values:?}")))
    }
}

/// Local-to-world frame of a unit forward axis; `look_basis` only fails for a
/// zero vector, which a `Dir3` cannot be.
fn look_frame(origin: &Point3, forward: &Dir3) -> Transform {
    Transform::look_at_frame(origin, forward.as_ref()).unwrap_or_default()
}

fn near_quad(v: &[Point3; 8]) -> [&Point3; 4] {
    [&v[0], &v[2], &v[4], &v[6]]
}

fn far_quad(v: &[Point3; 8]) -> [&Point3; 4] {
    [&v[1], &v[3], &v[5], &v[7]]
}

/// Bilinear sample of a quad ordered `[x0y0, x0y1, x1y0, x1y1]`.
fn bilinear(quad: [&Point3; 4], s: f64, t: f64) -> Point3 {
    let bottom = quad[0].coords.lerp(&quad[2].coords, s);
    let top = quad[1].coords.lerp(&quad[3].coords, s);
    Point3::from(bottom.lerp(&top, t))
}

impl InfluenceRegion {
    /// Planar region; `half_extents` must be non-negative.
    pub fn planar(point: Point3, normal: Vec3, half_extents: [f64; 2]) -> Result<Self> {
        finite(&point, "plane point")?;
        non_negative(&half_extents, "plane size")?;
        Ok(Self::Planar {
            point,
            normal: unit(normal, "plane normal")?,
            half_extents,
        })
    }

    /// Point-of-view region; requires `0 < fov_x < pi`, `ratio > 0` and
    /// `0 <= near < far`.
    pub fn point(
        position: Point3,
        direction: Vec3,
        fov_x: f64,
        ratio: f64,
        near: f64,
        far: f64,
    ) -> Result<Self> {
        finite(&position, "point of view")?;
        if !(fov_x > 0.0 && fov_x < std::f64::consts::PI) {
            return Err(invalid(format!("field of view must be in (0, pi), got {fov_x}")));
        }
        if !(ratio > 0.0 && ((fov_x / 2.0).tan() / ratio).is_finite()) {
            return Err(invalid(format!(
                "aspect ratio must be positive and keep the view finite, got {ratio}"
            )));
        }
        if !(near >= 0.0 && far > near && far.is_finite()) {
            return Err(invalid(format!(
                "clip planes must satisfy 0 <= near < far, got {near}, {far}"
            )));
        }
        Ok(Self::Point {
            position,
            direction: unit(direction, "view direction")?,
            fov_x,
            ratio,
            near,
            far,
        })
    }

    /// Frustum region.
    ///
    /// Every near vertex must differ from its far counterpart and all four
    /// side edges must run from the near quad toward the far quad, so every
    /// sampled direction is non-zero.
    pub fn frustum(vertices: [Point3; 8]) -> Result<Self> {
        for (i, v) in vertices.iter().enumerate() {
            finite(v, &format!("frustum vertex {i}"))?;
        }
        let near_center = bilinear(near_quad(&vertices), 0.5, 0.5);
        let axis = bilinear(far_quad(&vertices), 0.5, 0.5) - near_center;
        for i in (0..8).step_by(2) {
            let edge = vertices[i + 1] - vertices[i];
            if !edge.norm().is_finite() {
                return Err(invalid(format!("frustum edge {i}-{} is too long", i + 1)));
            }
            if edge.norm() < 1e-12 {
                return Err(invalid(format!("frustum vertices {i} and {} coincide", i + 1)));
            }
            if edge.dot(&axis) <= 0.0 {
                return Err(invalid(format!(
                    "frustum edge {i}-{} does not point from the near to the far face",
                    i + 1
                )));
            }
        }
        Ok(Self::Frustum { vertices })
    }

    /// Oriented-box region; `half_size` must be non-negative.
    pub fn obb(center: Point3, half_size: Vec3, forward: Vec3) -> Result<Self> {
        finite(&center, "box center")?;
        non_negative(half_size.as_slice(), "box half size")?;
        Ok(Self::Obb {
            center,
            half_size,
            forward: unit(forward, "box forward axis")?,
        })
    }

    /// Build a region from a serialized influence area.
    ///
    /// The `"frustum"` and `"obb"` kinds read the area's `bvhRegion` block;
    /// `"point"` reads `pointInfluenceArea` with the frustum parameters of
    /// its region. Any other tag is an [`RaycastError::InvalidRegionType`].
    pub fn from_ir(area: &InfluenceArea) -> Result<Self> {
        match area.kind.as_str() {
            PLANE => {
                let plane = area.plane.ok_or_else(|| invalid("plane area without a plane"))?;
                let size = area.size.ok_or_else(|| invalid("plane area without a size"))?;
                Self::planar(point3(plane.point), vec3(plane.normal), size)
            }
            POINT => {
                let pia = area
                    .point_influence_area
                    .as_ref()
                    .ok_or_else(|| invalid("point area without pointInfluenceArea"))?;
                let params = pia
                    .bvh_region
                    .frustum
                    .as_ref()
                    .ok_or_else(|| invalid("point area without frustum parameters"))?
                    .parameters;
                Self::point(
                    point3(pia.pov.position),
                    vec3(pia.pov.direction),
                    params.fov_x,
                    params.ratio,
                    params.n,
                    params.f,
                )
            }
            FRUSTUM => {
                let vertices = area
                    .bvh_region
                    .as_ref()
                    .and_then(|r| r.frustum.as_ref())
                    .and_then(|f| f.vertices)
                    .ok_or_else(|| invalid("frustum area without frustum vertices"))?;
                Self::frustum(vertices.map(point3))
            }
            OBB => {
                let obb = area
                    .bvh_region
                    .as_ref()
                    .and_then(|r| r.obb)
                    .ok_or_else(|| invalid("obb area without an obb"))?;
                Self::obb(point3(obb.center), vec3(obb.half_size), vec3(obb.forward))
            }
            other => Err(RaycastError::InvalidRegionType(other.to_string())),
        }
    }

    /// The kind tag of this region.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Planar { .. } => PLANE,
            Self::Point { .. } => POINT,
            Self::Frustum { .. } => FRUSTUM,
            Self::Obb { .. } => OBB,
        }
    }

    /// Local-to-world frame of the region: local `z` is the main ray
    /// direction and the origin sits at the region's anchor point.
    pub fn local_to_world(&self) -> Transform {
        match self {
            Self::Planar { point, normal, .. } => look_frame(point, normal),
            Self::Point {
                position,
                direction,
                ..
            } => look_frame(position, direction),
            Self::Frustum { vertices } => {
                let near = bilinear(near_quad(vertices), 0.5, 0.5);
                let far = bilinear(far_quad(vertices), 0.5, 0.5);
                let forward = Dir3::new_normalize(far - near);
                look_frame(&near, &forward)
            }
            Self::Obb {
                center,
                half_size,
                forward,
            } => look_frame(&(*center - forward.as_ref() * half_size.z), forward),
        }
    }

    /// Draw one ray, consuming exactly two uniform samples from `rng`.
    ///
    /// Batches should go through [`sampler`](Self::sampler), which builds
    /// the region frame once.
    pub fn sample_ray<R: Rng + ?Sized>(&self, rng: &mut R) -> Ray {
        self.sampler().sample(rng)
    }

    /// A sampler holding this region's local-to-world frame.
    pub fn sampler(&self) -> RaySampler<'_> {
        RaySampler {
            region: self,
            frame: self.local_to_world(),
        }
    }
}

/// Draws rays from one region with its frame computed up front.
#[derive(Debug, Clone)]
pub struct RaySampler<'a> {
    region: &'a InfluenceRegion,
    frame: Transform,
}

/// Uniform sample of `[-extent, extent)` that stays finite for every finite extent.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, extent: f64) -> f64 {
    (2.0 * rng.random::<f64>() - 1.0) * extent
}

impl RaySampler<'_> {
    /// Draw one ray, consuming exactly two uniform samples from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Ray {
        match self.region {
            InfluenceRegion::Planar {
                normal,
                half_extents: [ex, ey],
                ..
            } => {
                let x = symmetric(rng, *ex);
                let y = symmetric(rng, *ey);
                let origin = self.frame.apply_point(&Point3::new(x, y, 0.0));
                Ray::from_dir(origin, *normal)
            }
            InfluenceRegion::Point {
                position,
                fov_x,
                ratio,
                ..
            } => {
                let half_w = (fov_x / 2.0).tan();
                let u = symmetric(rng, half_w);
                let v = symmetric(rng, half_w / ratio);
                let dir = self.frame.apply_vec(&Vec3::new(u, v, 1.0));
                Ray::from_dir(*position, Dir3::new_normalize(dir))
            }
            InfluenceRegion::Frustum { vertices } => {
                let s = rng.random::<f64>();
                let t = rng.random::<f64>();
                let near = bilinear(near_quad(vertices), s, t);
                let far = bilinear(far_quad(vertices), s, t);
                Ray::from_dir(near, Dir3::new_normalize(far - near))
            }
            InfluenceRegion::Obb {
                half_size, forward, ..
            } => {
                let x = symmetric(rng, half_size.x);
                let y = symmetric(rng, half_size.y);
                let origin = self.frame.apply_point(&Point3::new(x, y, 0.0));
                Ray::from_dir(origin, *forward)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bvhlens_ir::{BvhRegion, Frustum, FrustumParameters, Obb, Plane, PointInfluenceArea, Pov};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn area(kind: &str) -> InfluenceArea {
        InfluenceArea {
            kind: kind.to_string(),
            plane: None,
            size: None,
            density: None,
            bvh_region: None,
            point_influence_area: None,
        }
    }

    fn unit_frustum() -> [Point3; 8] {
        // near quad [-1,1]^2 at z=0, far quad [-2,2]^2 at z=4
        std::array::from_fn(|i| {
            let far = i & 1 == 1;
            let s = if far { 2.0 } else { 1.0 };
            let x = if i & 4 != 0 { s } else { -s };
            let y = if i & 2 != 0 { s } else { -s };
            Point3::new(x, y, if far { 4.0 } else { 0.0 })
        })
    }

    #[test]
    fn test_plane_from_ir() {
        let mut a = area("plane");
        a.plane = Some(Plane {
            point: [1.0, 2.0, 3.0],
            normal: [0.0, 0.0, 2.0],
        });
        a.size = Some([4.0, 5.0]);
        let region = InfluenceRegion::from_ir(&a).unwrap();
        assert_eq!(region.kind(), "plane");
        let InfluenceRegion::Planar {
            normal,
            half_extents,
            ..
        } = region
        else {
            panic!("expected a planar region");
        };
        assert_relative_eq!(normal.into_inner(), Vec3::z());
        assert_eq!(half_extents, [4.0, 5.0]);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            InfluenceRegion::from_ir(&area("sphere")).unwrap_err(),
            RaycastError::InvalidRegionType("sphere".into())
        );
    }

    #[test]
    fn test_missing_blocks() {
        for kind in ["plane", "point", "frustum", "obb"] {
            assert!(matches!(
                InfluenceRegion::from_ir(&area(kind)).unwrap_err(),
                RaycastError::InvalidRegion(_)
            ));
        }
    }

    #[test]
    fn test_point_from_ir() {
        let mut a = area("point");
        a.point_influence_area = Some(PointInfluenceArea {
            pov: Pov {
                position: [0.0, 1.0, 0.0],
                direction: [0.0, 0.0, 1.0],
            },
            bvh_region: BvhRegion {
                kind: "frustum".into(),
                obb: None,
                frustum: Some(Frustum {
                    parameters: FrustumParameters {
                        fov_x: 1.0,
                        ratio: 2.0,
                        n: 0.1,
                        f: 50.0,
                    },
                    vertices: None,
                }),
            },
        });
        let region = InfluenceRegion::from_ir(&a).unwrap();
        assert!(matches!(region, InfluenceRegion::Point { ratio, .. } if ratio == 2.0));
    }

    #[test]
    fn test_obb_from_ir() {
        let mut a = area("obb");
        a.bvh_region = Some(BvhRegion {
            kind: "obb".into(),
            obb: Some(Obb {
                center: [0.0; 3],
                half_size: [1.0, 1.0, 2.0],
                forward: [1.0, 0.0, 0.0],
            }),
            frustum: None,
        });
        let region = InfluenceRegion::from_ir(&a).unwrap();
        assert_eq!(region.kind(), "obb");
    }

    #[test]
    fn test_degenerate_geometry() {
        let p = Point3::origin();
        assert!(InfluenceRegion::planar(p, Vec3::zeros(), [1.0, 1.0]).is_err());
        assert!(InfluenceRegion::planar(p, Vec3::z(), [-1.0, 1.0]).is_err());
        assert!(InfluenceRegion::point(p, Vec3::z(), 0.0, 1.0, 0.1, 10.0).is_err());
        assert!(InfluenceRegion::point(p, Vec3::z(), 1.0, 0.0, 0.1, 10.0).is_err());
        assert!(InfluenceRegion::point(p, Vec3::z(), 1.0, 1.0, 10.0, 1.0).is_err());
        assert!(InfluenceRegion::obb(p, Vec3::new(1.0, -1.0, 1.0), Vec3::z()).is_err());

        let mut v = unit_frustum();
        v[1] = v[0];
        assert!(InfluenceRegion::frustum(v).is_err());
    }

    #[test]
    fn test_planar_rays_stay_on_rectangle() {
        let region =
            InfluenceRegion::planar(Point3::new(0.0, 0.0, -5.0), Vec3::z(), [2.0, 1.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let ray = region.sample_ray(&mut rng);
            assert!((ray.origin.z + 5.0).abs() < 1e-12);
            assert!(ray.origin.x.abs() <= 2.0 && ray.origin.y.abs() <= 1.0);
            assert_relative_eq!(ray.direction().into_inner(), Vec3::z());
        }
    }

    #[test]
    fn test_planar_frame_is_rotated() {
        // normal +X: local x maps onto world -Z, local y onto world +Y
        let region = InfluenceRegion::planar(Point3::origin(), Vec3::x(), [1.0, 0.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..20 {
            let ray = region.sample_ray(&mut rng);
            assert!(ray.origin.x.abs() < 1e-12);
            assert!(ray.origin.y.abs() < 1e-12);
            assert!(ray.origin.z.abs() <= 1.0);
        }
    }

    #[test]
    fn test_point_rays_stay_in_view() {
        let fov: f64 = 1.2;
        let eye = Point3::new(1.0, 1.0, 1.0);
        let region = InfluenceRegion::point(eye, Vec3::z(), fov, 2.0, 0.1, 10.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let half_w = (fov / 2.0).tan();
        for _ in 0..50 {
            let ray = region.sample_ray(&mut rng);
            assert_eq!(ray.origin, eye);
            let d = ray.direction();
            assert!(d.z > 0.0);
            assert!((d.x / d.z).abs() <= half_w + 1e-12);
            assert!((d.y / d.z).abs() <= half_w / 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_frustum_rays_run_near_to_far() {
        let region = InfluenceRegion::frustum(unit_frustum()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let ray = region.sample_ray(&mut rng);
            assert!(ray.origin.z.abs() < 1e-12);
            assert!(ray.origin.x.abs() <= 1.0 && ray.origin.y.abs() <= 1.0);
            // the far point lies within the far quad
            let t = 4.0 / ray.direction().z;
            let far = ray.at(t);
            assert!(far.x.abs() <= 2.0 + 1e-9 && far.y.abs() <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn test_obb_rays_start_on_back_face() {
        let region =
            InfluenceRegion::obb(Point3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 2.0, 3.0), Vec3::z())
                .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let ray = region.sample_ray(&mut rng);
            assert!((ray.origin.z - 7.0).abs() < 1e-12);
            assert!(ray.origin.x.abs() <= 1.0 && ray.origin.y.abs() <= 2.0);
            assert_relative_eq!(ray.direction().into_inner(), Vec3::z());
        }
    }

    #[test]
    fn test_huge_extents_sample_finite_origins() {
        let planar =
            InfluenceRegion::planar(Point3::origin(), Vec3::z(), [f64::MAX, 1.0]).unwrap();
        let obb = InfluenceRegion::obb(Point3::origin(), Vec3::new(1e308, 1.0, 1.0), Vec3::z())
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for region in [planar, obb] {
            let sampler = region.sampler();
            for _ in 0..20 {
                let ray = sampler.sample(&mut rng);
                assert!(ray.origin.x.is_finite());
                assert!(ray.origin.y.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_tiny_ratio_rejected() {
        let p = Point3::origin();
        assert!(InfluenceRegion::point(p, Vec3::z(), 1.0, 1e-320, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_sampler_matches_sample_ray() {
        let region =
            InfluenceRegion::planar(Point3::new(1.0, 2.0, 3.0), Vec3::x(), [2.0, 1.0]).unwrap();
        let sampler = region.sampler();
        let mut a = ChaCha8Rng::seed_from_u64(6);
        let mut b = ChaCha8Rng::seed_from_u64(6);
        for _ in 0..10 {
            assert_eq!(sampler.sample(&mut a), region.sample_ray(&mut b));
        }
    }

    #[test]
    fn test_local_to_world_origin() {
        let region = InfluenceRegion::frustum(unit_frustum()).unwrap();
        let frame = region.local_to_world();
        let anchor = frame.apply_point(&Point3::origin());
        assert_relative_eq!(anchor, Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(frame.apply_vec(&Vec3::z()), Vec3::z(), epsilon = 1e-12);
    }
}
