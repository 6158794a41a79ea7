//! Interface planes
//!
//! A [`Plane`] is stored as a unit normal and an offset `w` so that points on
//! the plane satisfy `n·p = w`. Throughout the crate the normal points *away*
//! from the reference fluid: the fluid occupies the half-space `n·p <= w`
//! (the "back" side).

use crate::float_types::{EPSILON, Real};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Oriented plane `n·p = w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Plane {
    /// Create a new plane from normal vector and distance.
    /// The normal is normalized; a zero normal falls back to `+z`.
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < EPSILON {
            return Plane {
                normal: Vector3::z(),
                w,
            };
        }
        Plane {
            normal: normal / len,
            w: w / len,
        }
    }

    /// Plane with the given normal passing through `point`.
    pub fn through_point(normal: Vector3<Real>, point: &Point3<Real>) -> Self {
        let plane = Self::from_normal(normal, 0.0);
        Plane {
            w: plane.normal.dot(&point.coords),
            ..plane
        }
    }

    /// Copy of this plane moved by `distance` along its normal.
    pub fn translated(&self, distance: Real) -> Self {
        Plane {
            normal: self.normal,
            w: self.w + distance,
        }
    }

    /// Signed distance of `point`; negative on the fluid side.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Splits a point loop by this plane into `(front, back)` loops.
    ///
    /// Vertices are assigned by the sign of their exact signed distance and
    /// every edge that changes sign contributes its intersection point to both
    /// loops, so the areas of the two parts vary continuously with `w`.
    /// Loops with fewer than three points come back empty.
    pub fn split_points(&self, points: &[Point3<Real>]) -> (Vec<Point3<Real>>, Vec<Point3<Real>>) {
        let mut front = Vec::with_capacity(points.len() + 1);
        let mut back = Vec::with_capacity(points.len() + 1);
        let n = points.len();

        for i in 0..n {
            // j is the vertex following i, we modulo by len to wrap around to the first vertex after the last
            let j = (i + 1) % n;
            let pi = points[i];
            let pj = points[j];
            let di = self.signed_distance(&pi);
            let dj = self.signed_distance(&pj);

            if di >= 0.0 {
                front.push(pi);
            }
            if di <= 0.0 {
                back.push(pi);
            }
            if (di < 0.0 && dj > 0.0) || (di > 0.0 && dj < 0.0) {
                let t = di / (di - dj);
                let p = pi + (pj - pi) * t;
                front.push(p);
                back.push(p);
            }
        }

        if front.len() < 3 {
            front.clear();
        }
        if back.len() < 3 {
            back.clear();
        }
        (front, back)
    }

    /// The part of a point loop lying on the fluid side of the plane.
    pub fn clip_points(&self, points: &[Point3<Real>]) -> Vec<Point3<Real>> {
        self.split_points(points).1
    }

    /// Orthonormal basis `(u, v)` spanning the plane, with `u × v = n`.
    pub fn basis(&self) -> (Vector3<Real>, Vector3<Real>) {
        let n = self.normal;
        let mut u = if n.z.abs() > n.x.abs() || n.z.abs() > n.y.abs() {
            // normal is closer to ±Z ⇒ cross with X
            Vector3::x().cross(&n)
        } else {
            // otherwise cross with Z
            Vector3::z().cross(&n)
        };
        u.normalize_mut();
        let v = n.cross(&u).normalize();
        (u, v)
    }
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            normal: Vector3::z(),
            w: 0.0,
        }
    }
}
