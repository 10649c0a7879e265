//! Half-space boundaries for brush faces.

use nalgebra::{Point2, Point3, Vector3};

use crate::config::COLLINEAR_EPSILON;
use crate::{Error, Result};

/// A plane in 3D space, represented as `normal · point + distance = 0`.
///
/// The normal points out of the brush: a point is inside the half-space
/// when `normal · point + distance <= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f32>,
    distance: f32,
}

impl Plane {
    /// Creates a new plane from a normal vector and distance.
    /// Both are scaled so that the stored normal has unit length.
    ///
    /// Fails with [`Error::DegeneratePlane`] if the normal has zero length or
    /// either argument is not finite.
    pub fn new(normal: Vector3<f32>, distance: f32) -> Result<Self> {
        let norm = normal.norm();
        if !(norm.is_finite() && norm > f32::EPSILON && distance.is_finite()) {
            return Err(Error::DegeneratePlane(format!(
                "invalid normal {:?} or distance {}",
                normal, distance
            )));
        }
        Ok(Self {
            normal: normal / norm,
            distance: distance / norm,
        })
    }

    /// Creates a plane from three points of a brush face.
    ///
    /// The normal is `(p2 - p1) × (p3 - p1)`, so the points must be wound such
    /// that the brush interior ends up on the negative side.
    ///
    /// Fails with [`Error::DegeneratePlane`] if the points are collinear or
    /// any coordinate is not finite.
    pub fn from_points(p1: Point3<f32>, p2: Point3<f32>, p3: Point3<f32>) -> Result<Self> {
        Self::from_points_with_epsilon(p1, p2, p3, COLLINEAR_EPSILON)
    }

    /// Same as [`Plane::from_points`], with a custom collinearity tolerance.
    pub fn from_points_with_epsilon(
        p1: Point3<f32>,
        p2: Point3<f32>,
        p3: Point3<f32>,
        epsilon: f32,
    ) -> Result<Self> {
        let cross = (p2 - p1).cross(&(p3 - p1));
        let norm = cross.norm();
        if !(norm.is_finite() && norm >= epsilon) {
            return Err(Error::DegeneratePlane(format!(
                "collinear or non-finite points {:?}, {:?}, {:?}",
                p1.coords, p2.coords, p3.coords
            )));
        }
        let normal = cross / norm;
        let distance = -normal.dot(&p1.coords);
        if !distance.is_finite() {
            return Err(Error::DegeneratePlane(format!(
                "non-finite point {:?}",
                p1.coords
            )));
        }
        Ok(Self { normal, distance })
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    /// Returns the signed distance term `d` of `normal · p + d = 0`.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Computes the signed distance from a point to the plane.
    /// - Positive: point is in front (outside)
    /// - Negative: point is behind (inside)
    /// - Zero: point is on the plane
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) + self.distance
    }

    /// Returns true if the point is inside the half-space or at most `epsilon` outside it.
    #[inline]
    pub fn contains(&self, point: Point3<f32>, epsilon: f32) -> bool {
        self.signed_distance(point) <= epsilon
    }

    /// Computes the single point shared by three planes.
    ///
    /// Returns `None` when `|a.n · (b.n × c.n)|` is below `epsilon`, i.e. when
    /// two of the planes are parallel or all three share a line.
    pub fn intersect_three(a: &Plane, b: &Plane, c: &Plane, epsilon: f32) -> Option<Point3<f32>> {
        let bc = b.normal.cross(&c.normal);
        let denom = a.normal.dot(&bc);
        if denom.abs() < epsilon {
            return None;
        }

        let ca = c.normal.cross(&a.normal);
        let ab = a.normal.cross(&b.normal);
        let numerator = bc * -a.distance + ca * -b.distance + ab * -c.distance;
        Some(Point3::from(numerator / denom))
    }

    /// Returns two orthonormal vectors spanning the plane.
    ///
    /// The pair is right-handed around the normal (`u × v == normal`), so
    /// increasing angles in `(u, v)` run counter-clockwise seen from the front.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let n = self.normal;
        // Least aligned axis, never parallel to the normal
        let helper = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
            Vector3::x()
        } else if n.y.abs() <= n.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let u = n.cross(&helper).normalize();
        let v = n.cross(&u);
        (u, v)
    }

    /// Projects a point into the plane's 2D basis.
    pub fn project(&self, point: Point3<f32>) -> Point2<f32> {
        let (u, v) = self.basis();
        Point2::new(u.dot(&point.coords), v.dot(&point.coords))
    }
}
