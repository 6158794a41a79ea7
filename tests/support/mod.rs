//! Test support library
//! Mesh builders, analytic flows and field initialisers shared by the
//! integration tests.

#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use plicvof::{
    fields::{cell_velocities, stream_function_fluxes},
    float_types::{PI, Real},
    mesh::{MeshTopology, PolyMesh},
};

/// `n x n x 1` block over the unit square, one cell thick.
pub fn unit_square(n: usize) -> PolyMesh {
    let h = 1.0 / n as Real;
    PolyMesh::hex_block([n, n, 1], Point3::origin(), Point3::new(1.0, 1.0, h)).unwrap()
}

/// Row of `n` unit cubes along x.
pub fn unit_row(n: usize) -> PolyMesh {
    PolyMesh::hex_block([n, 1, 1], Point3::origin(), Point3::new(n as Real, 1.0, 1.0)).unwrap()
}

/// Single-vortex flow `psi = sin(pi x) sin(pi y) / pi`: divergence-free face
/// fluxes and the matching cell velocities.
pub fn vortex(mesh: &PolyMesh) -> (Vec<Real>, Vec<Vector3<Real>>) {
    let phi = stream_function_fluxes(mesh, |x, y| (PI * x).sin() * (PI * y).sin() / PI);
    let u = cell_velocities(mesh, |p| {
        Vector3::new(
            (PI * p.x).sin() * (PI * p.y).cos(),
            -(PI * p.x).cos() * (PI * p.y).sin(),
            0.0,
        )
    });
    (phi, u)
}

/// Uniform flow along `velocity`.
pub fn uniform(mesh: &PolyMesh, velocity: Vector3<Real>) -> (Vec<Real>, Vec<Vector3<Real>>) {
    let phi = plicvof::fields::face_fluxes(mesh, |_| velocity);
    let u = cell_velocities(mesh, |_| velocity);
    (phi, u)
}

/// Fraction of each cell of an extruded mesh inside a disc, by sub-sampling
/// the cell's bounding box in x and y.
pub fn disc_fraction(mesh: &PolyMesh, centre: [Real; 2], radius: Real, samples: usize) -> Vec<Real> {
    (0..mesh.n_cells())
        .map(|c| {
            let (lo, hi) = cell_bounds(mesh, c);
            let mut inside = 0;
            for i in 0..samples {
                for j in 0..samples {
                    let x = lo.x + (i as Real + 0.5) * (hi.x - lo.x) / samples as Real;
                    let y = lo.y + (j as Real + 0.5) * (hi.y - lo.y) / samples as Real;
                    if (x - centre[0]).hypot(y - centre[1]) <= radius {
                        inside += 1;
                    }
                }
            }
            inside as Real / (samples * samples) as Real
        })
        .collect()
}

/// Axis-aligned bounds of a cell from its face points.
pub fn cell_bounds(mesh: &PolyMesh, cell: usize) -> (Point3<Real>, Point3<Real>) {
    let mut lo = Point3::new(Real::MAX, Real::MAX, Real::MAX);
    let mut hi = Point3::new(Real::MIN, Real::MIN, Real::MIN);
    for &f in mesh.cell_faces(cell) {
        for &p in mesh.face_points(f) {
            let p = mesh.points()[p];
            lo = lo.inf(&p);
            hi = hi.sup(&p);
        }
    }
    (lo, hi)
}

/// Total reference-fluid volume `sum(alpha * V)`.
pub fn fluid_volume(mesh: &PolyMesh, alpha: &[Real]) -> Real {
    alpha
        .iter()
        .enumerate()
        .map(|(c, a)| a * mesh.cell_volume(c))
        .sum()
}
