//! Face cutting: how much reference fluid a moving interface plane pushes
//! through a face.
//!
//! Over one sub-interval the upwind interface plane translates along its own
//! normal by `D = Un0·dt`. The submerged face area `A(w)` is piecewise
//! quadratic in the plane offset with breakpoints at the vertex levels of the
//! face triangulation, so its mean over the sweep is integrated exactly with
//! Simpson's rule on every piece.

use crate::float_types::{Real, VSMALL};
use crate::mesh::MeshTopology;
use crate::plane::Plane;
use crate::polygon;
use nalgebra::{Point3, Vector3};

/// A mesh face fanned about its centre.
#[derive(Debug, Clone)]
pub struct FacePolygon {
    triangles: Vec<[Point3<Real>; 3]>,
    unit_normal: Vector3<Real>,
    area: Real,
}

impl FacePolygon {
    pub fn from_mesh<M: MeshTopology + ?Sized>(mesh: &M, face: usize) -> Self {
        let points = mesh.points();
        let loop_: Vec<Point3<Real>> = mesh.face_points(face).iter().map(|&p| points[p]).collect();
        Self::new(&loop_, mesh.face_centre(face), mesh.face_area_vector(face))
    }

    pub fn new(loop_: &[Point3<Real>], centre: Point3<Real>, area_vector: Vector3<Real>) -> Self {
        let area = area_vector.norm();
        let unit_normal = if area > VSMALL {
            area_vector / area
        } else {
            Vector3::zeros()
        };
        FacePolygon {
            triangles: polygon::fan(loop_, centre),
            unit_normal,
            area,
        }
    }

    pub const fn area(&self) -> Real {
        self.area
    }

    pub fn is_degenerate(&self) -> bool {
        self.area < VSMALL
    }

    /// Sorted vertex levels `n·v`.
    fn levels(&self, normal: &Vector3<Real>) -> Vec<Real> {
        let mut levels: Vec<Real> = self
            .triangles
            .iter()
            .flat_map(|t| t.iter().map(|v| normal.dot(&v.coords)))
            .collect();
        levels.sort_by(Real::total_cmp);
        levels.dedup();
        levels
    }
}

/// Integrates the submerged area of a face under a translating plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceClipper;

impl FaceClipper {
    /// Area of `face` on the fluid side of `plane`.
    pub fn submerged_area(&self, face: &FacePolygon, plane: &Plane) -> Real {
        let mut area = Vector3::zeros();
        for tri in &face.triangles {
            let d = tri.map(|p| plane.signed_distance(&p));
            if d.iter().all(|&di| di <= 0.0) {
                area += (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
                continue;
            }
            if d.iter().all(|&di| di >= 0.0) {
                continue;
            }
            let clipped = plane.clip_points(tri);
            for i in 1..clipped.len().saturating_sub(1) {
                area += (clipped[i] - clipped[0]).cross(&(clipped[i + 1] - clipped[0]));
            }
        }
        (0.5 * area.dot(&face.unit_normal)).clamp(0.0, face.area)
    }

    /// Mean submerged fraction of `face` while `plane` moves by `sweep` along
    /// its normal.
    pub fn mean_submerged_fraction(&self, face: &FacePolygon, plane: &Plane, sweep: Real) -> Real {
        if face.is_degenerate() {
            return 0.0;
        }
        let area_at = |w: Real| {
            self.submerged_area(
                face,
                &Plane {
                    normal: plane.normal,
                    w,
                },
            )
        };

        let scale = face.area.sqrt();
        if sweep.abs() <= 1e-12 * scale {
            return area_at(plane.w + 0.5 * sweep) / face.area;
        }

        let (start, end) = if sweep > 0.0 {
            (plane.w, plane.w + sweep)
        } else {
            (plane.w + sweep, plane.w)
        };

        let mut knots = vec![start];
        knots.extend(
            face.levels(&plane.normal)
                .into_iter()
                .filter(|&l| l > start && l < end),
        );
        knots.push(end);

        // area is quadratic inside each piece; Gauss nodes never touch a
        // knot, where a face parallel to the plane jumps from 0 to |Sf|
        let node = 1.0 / (3.0 as Real).sqrt();
        let integral: Real = knots
            .windows(2)
            .map(|k| {
                let mid = 0.5 * (k[0] + k[1]);
                let half = 0.5 * (k[1] - k[0]);
                half * (area_at(mid - node * half) + area_at(mid + node * half))
            })
            .sum();

        (integral / (end - start) / face.area).clamp(0.0, 1.0)
    }

    /// Reference-fluid volume crossing `face` when a total of `flux_volume`
    /// (`phi·dt`) crosses it and the interface sweeps by `sweep`.
    pub fn integrate(&self, face: &FacePolygon, plane: &Plane, sweep: Real, flux_volume: Real) -> Real {
        flux_volume * self.mean_submerged_fraction(face, plane, sweep)
    }
}
