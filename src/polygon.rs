//! Polygon measures shared by the mesh and the cutting engines.
//!
//! Faces of a polyhedral mesh are generally only near-planar. All measures
//! here decompose a point loop into a triangle fan about its point average,
//! so a warped face is treated as the union of planar triangles.

use crate::float_types::{Real, VSMALL};
use crate::plane::Plane;
use nalgebra::{Point3, Vector3};

/// Ordered point loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Point3<Real>>,
}

impl Polygon {
    pub const fn new(vertices: Vec<Point3<Real>>) -> Self {
        Polygon { vertices }
    }

    /// Arithmetic mean of the vertices.
    pub fn point_average(&self) -> Point3<Real> {
        point_average(&self.vertices)
    }

    /// Area-weighted centre and area vector of the loop.
    pub fn centre_and_area(&self) -> (Point3<Real>, Vector3<Real>) {
        centre_and_area(&self.vertices)
    }

    /// Area vector (right-hand rule on the vertex order).
    pub fn area_vector(&self) -> Vector3<Real> {
        self.centre_and_area().1
    }

    /// Triangles of the fan about `apex`, keeping the loop orientation.
    pub fn fan(&self, apex: Point3<Real>) -> Vec<[Point3<Real>; 3]> {
        fan(&self.vertices, apex)
    }
}

/// Arithmetic mean of `points`.
pub fn point_average(points: &[Point3<Real>]) -> Point3<Real> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as Real)
}

/// Centre and area vector of a point loop.
///
/// Triangles use the exact formula; larger loops are fanned about the point
/// average and the centre is the area-weighted mean of the fan centroids.
pub fn centre_and_area(points: &[Point3<Real>]) -> (Point3<Real>, Vector3<Real>) {
    match points.len() {
        0 => (Point3::origin(), Vector3::zeros()),
        1 | 2 => (point_average(points), Vector3::zeros()),
        3 => {
            let centre = point_average(points);
            let area = 0.5 * (points[1] - points[0]).cross(&(points[2] - points[0]));
            (centre, area)
        },
        n => {
            let p_avg = point_average(points);
            let mut sum_n = Vector3::zeros();
            let mut sum_a: Real = 0.0;
            let mut sum_ac = Vector3::zeros();

            for i in 0..n {
                let p = points[i];
                let q = points[(i + 1) % n];
                let c = p.coords + q.coords + p_avg.coords;
                let tri_n = (q - p).cross(&(p_avg - p));
                let a = tri_n.norm();
                sum_n += tri_n;
                sum_a += a;
                sum_ac += c * a;
            }

            let centre = if sum_a < VSMALL {
                p_avg
            } else {
                Point3::from(sum_ac / (3.0 * sum_a))
            };
            (centre, 0.5 * sum_n)
        },
    }
}

/// Fan triangulation of a loop about `apex`. Triangles come back unchanged.
pub fn fan(points: &[Point3<Real>], apex: Point3<Real>) -> Vec<[Point3<Real>; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[points[0], points[1], points[2]]];
    }
    (0..n)
        .map(|i| [points[i], points[(i + 1) % n], apex])
        .collect()
}

/// Orders coplanar points counter-clockwise about `normal`.
///
/// Used to assemble interface polygons from unordered edge intersections;
/// exact for convex loops, which is what a plane cut of a convex cell gives.
pub fn order_about_normal(points: &mut Vec<Point3<Real>>, normal: &Vector3<Real>, merge_distance: Real) {
    // drop near-duplicates first (vertices shared by neighbouring triangles)
    let mut unique: Vec<Point3<Real>> = Vec::with_capacity(points.len());
    for p in points.iter() {
        if !unique.iter().any(|q| (q - p).norm() <= merge_distance) {
            unique.push(*p);
        }
    }

    let centre = point_average(&unique);
    let plane = Plane::from_normal(*normal, 0.0);
    let (u, v) = plane.basis();
    unique.sort_by(|a, b| {
        let da = a - centre;
        let db = b - centre;
        let ta = da.dot(&v).atan2(da.dot(&u));
        let tb = db.dot(&v).atan2(db.dot(&u));
        ta.total_cmp(&tb)
    });
    *points = unique;
}

/// Removes vertices lying on the straight segment between their neighbours.
pub fn drop_collinear(points: &mut Vec<Point3<Real>>, tolerance: Real) {
    let n = points.len();
    if n < 4 {
        return;
    }
    let keep: Vec<bool> = (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            let p = points[i];
            (p - prev).cross(&(next - p)).norm() > tolerance
        })
        .collect();
    let mut k = keep.iter();
    points.retain(|_| k.next().copied().unwrap_or(true));
}
