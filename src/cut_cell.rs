//! Cell cutting: the volume a plane encloses inside a polyhedral cell, and
//! the inverse problem of placing a plane of given orientation so that it
//! encloses a target volume fraction.
//!
//! Each cell face is fanned about its face centre and all coordinates are
//! taken relative to the cell centre. For a plane `n·x = s` the fluid part of
//! the cell is bounded by the clipped triangles plus a planar cap, so
//!
//! ```text
//! 6V(s) = Σ det(clipped triangles) - s · n·Σ(2 × clipped area vectors)
//! ```
//!
//! `V(s)` is a cubic between two consecutive vertex levels `n·v`.

use crate::float_types::{Real, VSMALL};
use crate::mesh::MeshTopology;
use crate::plane::Plane;
use crate::polygon::{self, Polygon};
use nalgebra::{Point3, Vector3};

/// Outward-oriented triangulated cell boundary.
#[derive(Debug, Clone)]
pub struct CellPolyhedron {
    centre: Point3<Real>,
    /// Relative to `centre`
    triangles: Vec<[Point3<Real>; 3]>,
    volume: Real,
}

impl CellPolyhedron {
    pub fn from_mesh<M: MeshTopology + ?Sized>(mesh: &M, cell: usize) -> Self {
        let centre = mesh.cell_centre(cell);
        let points = mesh.points();
        let mut triangles = Vec::new();

        for &f in mesh.cell_faces(cell) {
            let mut loop_: Vec<Point3<Real>> = mesh
                .face_points(f)
                .iter()
                .map(|&p| Point3::from(points[p] - centre))
                .collect();
            if mesh.face_owner(f) != cell {
                loop_.reverse();
            }
            let apex = Point3::from(mesh.face_centre(f) - centre);
            triangles.extend(polygon::fan(&loop_, apex));
        }

        Self::from_triangles(centre, triangles)
    }

    /// Build from outward triangles already relative to `centre`.
    pub fn from_triangles(centre: Point3<Real>, triangles: Vec<[Point3<Real>; 3]>) -> Self {
        let volume = triangles.iter().map(|t| det(t[0], t[1], t[2])).sum::<Real>() / 6.0;
        CellPolyhedron {
            centre,
            triangles,
            volume,
        }
    }

    pub const fn centre(&self) -> Point3<Real> {
        self.centre
    }

    /// Volume of the triangulated cell.
    pub const fn volume(&self) -> Real {
        self.volume
    }

    /// Sorted, distinct vertex levels `n·v` (relative to the centre).
    pub fn levels(&self, normal: &Vector3<Real>) -> Vec<Real> {
        let mut levels: Vec<Real> = self
            .triangles
            .iter()
            .flat_map(|t| t.iter().map(|v| normal.dot(&v.coords)))
            .collect();
        levels.sort_by(Real::total_cmp);
        levels.dedup();
        levels
    }

    /// Volume on the fluid side of `n·x <= s`, `x` relative to the centre.
    pub fn enclosed_volume_local(&self, normal: &Vector3<Real>, s: Real) -> Real {
        let cut = Plane {
            normal: *normal,
            w: s,
        };
        let mut six_v = 0.0;
        let mut sarea = Vector3::zeros();

        for tri in &self.triangles {
            let d = [
                cut.signed_distance(&tri[0]),
                cut.signed_distance(&tri[1]),
                cut.signed_distance(&tri[2]),
            ];
            if d.iter().all(|&di| di <= 0.0) {
                six_v += det(tri[0], tri[1], tri[2]);
                sarea += (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
                continue;
            }
            if d.iter().all(|&di| di >= 0.0) {
                continue;
            }
            let clipped = cut.clip_points(tri);
            for i in 1..clipped.len().saturating_sub(1) {
                let (a, b, c) = (clipped[0], clipped[i], clipped[i + 1]);
                six_v += det(a, b, c);
                sarea += (b - a).cross(&(c - a));
            }
        }

        (six_v - s * normal.dot(&sarea)) / 6.0
    }

    /// Volume enclosed by `plane` (absolute coordinates).
    pub fn enclosed_volume(&self, plane: &Plane) -> Real {
        let s = plane.w - plane.normal.dot(&self.centre.coords);
        self.enclosed_volume_local(&plane.normal, s)
    }

    /// Enclosed volume as a fraction of the cell volume.
    pub fn enclosed_fraction(&self, plane: &Plane) -> Real {
        if self.volume < VSMALL {
            return 0.0;
        }
        self.enclosed_volume(plane) / self.volume
    }

    /// The interface polygon `cell ∩ plane` as an ordered loop in absolute
    /// coordinates. Empty when the plane misses the cell.
    pub fn cap_polygon(&self, plane: &Plane) -> Polygon {
        let s = plane.w - plane.normal.dot(&self.centre.coords);
        let cut = Plane {
            normal: plane.normal,
            w: s,
        };
        let mut points = Vec::new();
        for tri in &self.triangles {
            for i in 0..3 {
                let (p, q) = (tri[i], tri[(i + 1) % 3]);
                let (dp, dq) = (cut.signed_distance(&p), cut.signed_distance(&q));
                if dp == 0.0 {
                    points.push(p);
                }
                if (dp < 0.0 && dq > 0.0) || (dp > 0.0 && dq < 0.0) {
                    points.push(p + (q - p) * (dp / (dp - dq)));
                }
            }
        }
        if points.len() < 3 {
            return Polygon::new(Vec::new());
        }
        let scale = self.volume.abs().cbrt().max(VSMALL);
        polygon::order_about_normal(&mut points, &plane.normal, 1e-10 * scale);
        polygon::drop_collinear(&mut points, 1e-12 * scale * scale);
        if points.len() < 3 {
            return Polygon::new(Vec::new());
        }
        Polygon::new(
            points
                .into_iter()
                .map(|p| Point3::from(p.coords + self.centre.coords))
                .collect(),
        )
    }
}

#[inline]
fn det(a: Point3<Real>, b: Point3<Real>, c: Point3<Real>) -> Real {
    a.coords.dot(&b.coords.cross(&c.coords))
}

/// Result of a plane fit. A fit that hit the iteration cap still carries the
/// best plane found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFit {
    pub plane: Plane,
    /// Exact volume evaluations spent after bracketing
    pub iterations: usize,
    /// `|V(plane) - target| / V(cell)`
    pub relative_error: Real,
    pub converged: bool,
}

/// Places a plane of fixed orientation so that it encloses a target fraction
/// of a cell.
#[derive(Debug, Clone, Copy)]
pub struct PlaneFitter {
    pub tolerance: Real,
    pub max_iterations: usize,
}

impl Default for PlaneFitter {
    fn default() -> Self {
        PlaneFitter {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

impl PlaneFitter {
    pub const fn new(tolerance: Real, max_iterations: usize) -> Self {
        PlaneFitter {
            tolerance,
            max_iterations,
        }
    }

    /// Fit a plane with unit `normal` enclosing `fraction` of `cell`.
    pub fn fit(&self, cell: &CellPolyhedron, normal: Vector3<Real>, fraction: Real) -> PlaneFit {
        let total = cell.volume();
        let to_plane = |s: Real| Plane {
            normal,
            w: s + normal.dot(&cell.centre().coords),
        };

        let levels = cell.levels(&normal);
        let (Some(&lo_level), Some(&hi_level)) = (levels.first(), levels.last()) else {
            return PlaneFit {
                plane: to_plane(0.0),
                iterations: 0,
                relative_error: 0.0,
                converged: false,
            };
        };
        if total < VSMALL || fraction <= 0.0 || fraction >= 1.0 || levels.len() < 2 {
            let s = if fraction >= 0.5 { hi_level } else { lo_level };
            return PlaneFit {
                plane: to_plane(s),
                iterations: 0,
                relative_error: 0.0,
                converged: total >= VSMALL,
            };
        }

        let target = fraction * total;
        let volume = |s: Real| cell.enclosed_volume_local(&normal, s);

        // bracket between consecutive vertex levels
        let (mut lo, mut hi) = (0, levels.len() - 1);
        let (mut v_lo, mut v_hi) = (0.0, total);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            let v = volume(levels[mid]);
            if v <= target {
                lo = mid;
                v_lo = v;
            } else {
                hi = mid;
                v_hi = v;
            }
        }
        let (a, b) = (levels[lo], levels[hi]);
        let width = b - a;

        // exact cubic on the bracket from four samples
        let h: Real = 1.0 / 3.0;
        let f = [v_lo, volume(a + h * width), volume(a + 2.0 * h * width), v_hi];
        let cubic = NewtonCubic::new(f, h);
        let u = cubic.invert(target);

        let mut s = a + u * width;
        let mut v = volume(s);
        let mut iterations = 1;
        let mut err = (v - target).abs() / total;

        if err > self.tolerance {
            // Illinois on the exact volume
            let (mut xa, mut fa) = (a, v_lo - target);
            let (mut xb, mut fb) = (b, v_hi - target);
            let (mut best_s, mut best_err) = (s, err);
            let mut side = 0i8;
            while iterations < self.max_iterations && err > self.tolerance {
                let x = if (fb - fa).abs() > VSMALL {
                    (xa * fb - xb * fa) / (fb - fa)
                } else {
                    0.5 * (xa + xb)
                };
                let x = if x > xa.min(xb) && x < xa.max(xb) {
                    x
                } else {
                    0.5 * (xa + xb)
                };
                let fx = volume(x) - target;
                iterations += 1;
                err = fx.abs() / total;
                if err < best_err {
                    best_s = x;
                    best_err = err;
                }
                if fx.signum() == fb.signum() {
                    xb = x;
                    fb = fx;
                    if side == -1 {
                        fa *= 0.5;
                    }
                    side = -1;
                } else {
                    xa = x;
                    fa = fx;
                    if side == 1 {
                        fb *= 0.5;
                    }
                    side = 1;
                }
            }
            s = best_s;
            err = best_err;
            v = volume(s);
        }

        let converged = err <= self.tolerance;
        if !converged {
            log::warn!(
                "plane fit did not converge: fraction {fraction}, relative error {err:.3e} after {iterations} iterations"
            );
        }
        log::trace!("plane fit: bracket [{a:.6e}, {b:.6e}], s = {s:.6e}, V = {v:.6e}");

        PlaneFit {
            plane: to_plane(s),
            iterations,
            relative_error: err,
            converged,
        }
    }
}

/// Cubic through four equally spaced samples on `[0, 1]`, in Newton form.
#[derive(Debug, Clone, Copy)]
struct NewtonCubic {
    f0: Real,
    d1: Real,
    d2: Real,
    d3: Real,
    h: Real,
}

impl NewtonCubic {
    fn new(f: [Real; 4], h: Real) -> Self {
        let d1 = [(f[1] - f[0]) / h, (f[2] - f[1]) / h, (f[3] - f[2]) / h];
        let d2 = [(d1[1] - d1[0]) / (2.0 * h), (d1[2] - d1[1]) / (2.0 * h)];
        let d3 = (d2[1] - d2[0]) / (3.0 * h);
        NewtonCubic {
            f0: f[0],
            d1: d1[0],
            d2: d2[0],
            d3,
            h,
        }
    }

    fn value(&self, u: Real) -> Real {
        let h = self.h;
        self.f0 + u * (self.d1 + (u - h) * (self.d2 + (u - 2.0 * h) * self.d3))
    }

    fn slope(&self, u: Real) -> Real {
        let h = self.h;
        self.d1
            + self.d2 * (2.0 * u - h)
            + self.d3 * ((u - h) * (u - 2.0 * h) + u * (u - 2.0 * h) + u * (u - h))
    }

    /// Root of `value(u) = target` on `[0, 1]`, Newton safeguarded by
    /// bisection. The cubic is assumed increasing on the interval.
    fn invert(&self, target: Real) -> Real {
        let (mut lo, mut hi) = (0.0, 1.0);
        let f_lo = self.value(0.0) - target;
        let f_hi = self.value(1.0) - target;
        if f_lo >= 0.0 {
            return 0.0;
        }
        if f_hi <= 0.0 {
            return 1.0;
        }
        let mut u = -f_lo / (f_hi - f_lo);
        for _ in 0..50 {
            let fu = self.value(u) - target;
            if fu == 0.0 {
                return u;
            }
            if fu < 0.0 {
                lo = u;
            } else {
                hi = u;
            }
            let slope = self.slope(u);
            let next = if slope > 0.0 { u - fu / slope } else { Real::NAN };
            let next = if next > lo && next < hi {
                next
            } else {
                0.5 * (lo + hi)
            };
            if (next - u).abs() <= Real::EPSILON * 4.0 {
                return next;
            }
            u = next;
        }
        u
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PolyMesh;

    fn unit_cell() -> CellPolyhedron {
        let mesh = PolyMesh::hex_block([1, 1, 1], Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap();
        CellPolyhedron::from_mesh(&mesh, 0)
    }

    #[test]
    fn volume_matches_mesh() {
        let cell = unit_cell();
        assert!((cell.volume() - 1.0).abs() < 1e-14);
    }

    #[test]
    fn enclosed_volume_of_axis_plane_is_linear() {
        let cell = unit_cell();
        for &w in &[0.0, 0.1, 0.5, 0.93, 1.0] {
            let v = cell.enclosed_volume(&Plane::from_normal(Vector3::z(), w));
            assert!((v - w).abs() < 1e-14, "w = {w}: {v}");
        }
    }

    #[test]
    fn diagonal_corner_is_a_tetrahedron() {
        let cell = unit_cell();
        let n = Vector3::new(1.0, 1.0, 1.0).normalize();
        // plane x + y + z = 1 cuts off the corner tetrahedron of volume 1/6
        let plane = Plane::through_point(n, &Point3::new(1.0, 0.0, 0.0));
        assert!((cell.enclosed_volume(&plane) - 1.0 / 6.0).abs() < 1e-13);
    }

    #[test]
    fn midplane_fit_bisects_cube() {
        let cell = unit_cell();
        let fit = PlaneFitter::default().fit(&cell, Vector3::z(), 0.5);
        assert!(fit.converged);
        assert!((fit.plane.w - 0.5).abs() < 1e-12);
        let cap = cell.cap_polygon(&fit.plane);
        assert_eq!(cap.vertices.len(), 4);
        assert!((cap.area_vector() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn fit_round_trip_for_oblique_normals() {
        let cell = unit_cell();
        let fitter = PlaneFitter::default();
        let normals = [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-0.3, 0.9, 0.1),
            Vector3::new(0.0, -1.0, 1.0),
            Vector3::new(1.0, 1.0, 1.0),
        ];
        for n in normals {
            let n = n.normalize();
            for &alpha in &[1e-6, 0.05, 0.3, 0.5, 0.77, 0.999] {
                let fit = fitter.fit(&cell, n, alpha);
                let back = cell.enclosed_fraction(&fit.plane);
                assert!(fit.converged, "n = {n:?}, alpha = {alpha}");
                assert!((back - alpha).abs() <= 1e-8 * alpha.max(1e-2), "{back} vs {alpha}");
            }
        }
    }

    #[test]
    fn cubic_is_exact_on_cubic_data() {
        let g = |u: Real| 2.0 + u - 0.5 * u * u + 0.25 * u * u * u;
        let h = 1.0 / 3.0;
        let c = NewtonCubic::new([g(0.0), g(h), g(2.0 * h), g(1.0)], h);
        for &u in &[0.1, 0.45, 0.9] {
            assert!((c.value(u) - g(u)).abs() < 1e-14);
        }
        let u = c.invert(g(0.6));
        assert!((u - 0.6).abs() < 1e-12);
    }
}
