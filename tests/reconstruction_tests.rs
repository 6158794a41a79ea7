mod support;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use nalgebra::{Point3, Vector3};
use plicvof::cut_cell::{CellPolyhedron, PlaneFitter};
use plicvof::fields::BoundaryConditions;
use plicvof::float_types::Real;
use plicvof::mesh::{MeshTopology, Patch, PatchKind, PolyMesh};
use plicvof::sync::SerialComm;
use plicvof::{GradientScheme, PlicVofConfig, PlicVofSolver};
use support::{disc_fraction, unit_square};

/// Single tetrahedron with its right-angle corner at the origin.
fn corner_tet() -> PolyMesh {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]];
    let patches = vec![Patch::new("walls", 0, 4, PatchKind::Wall)];
    PolyMesh::new(points, faces, vec![0; 4], vec![], patches).unwrap()
}

#[test]
fn fitted_planes_enclose_the_requested_fraction() {
    let mesh = PolyMesh::hex_block([2, 2, 2], Point3::origin(), Point3::new(1.0, 2.0, 0.5)).unwrap();
    let fitter = PlaneFitter::default();
    let normals = [
        Vector3::x(),
        Vector3::new(1.0, 1.0, 0.0).normalize(),
        Vector3::new(-0.3, 0.8, 0.52).normalize(),
        Vector3::new(1.0, -2.0, 3.0).normalize(),
    ];
    for cell in 0..mesh.n_cells() {
        let poly = CellPolyhedron::from_mesh(&mesh, cell);
        for n in &normals {
            for fraction in [0.01, 0.25, 0.5, 0.77, 0.999] {
                let fit = fitter.fit(&poly, *n, fraction);
                assert!(fit.converged, "cell {cell}, fraction {fraction}");
                let got = poly.enclosed_fraction(&fit.plane);
                assert_abs_diff_eq!(got, fraction, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn cube_midplane_and_its_cap() {
    let mesh = PolyMesh::hex_block([1, 1, 1], Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap();
    let poly = CellPolyhedron::from_mesh(&mesh, 0);
    let fit = PlaneFitter::default().fit(&poly, Vector3::z(), 0.5);
    assert_abs_diff_eq!(fit.plane.w, 0.5, epsilon = 1e-10);

    let cap = poly.cap_polygon(&fit.plane);
    assert_eq!(cap.vertices.len(), 4);
    assert_abs_diff_eq!(cap.area_vector().norm(), 1.0, epsilon = 1e-9);
    for v in &cap.vertices {
        assert_abs_diff_eq!(v.z, 0.5, epsilon = 1e-9);
    }
}

#[test]
fn tetrahedron_corner_volume_is_cubic() {
    let mesh = corner_tet();
    assert_relative_eq!(mesh.cell_volume(0), 1.0 / 6.0, max_relative = 1e-13);
    let poly = CellPolyhedron::from_mesh(&mesh, 0);
    let n = Vector3::new(1.0, 1.0, 1.0).normalize();
    // fluid x + y + z <= s fills s^3 of the cell
    let fit = PlaneFitter::default().fit(&poly, n, 0.125);
    let s = fit.plane.w * (3.0 as Real).sqrt();
    assert_abs_diff_eq!(s, 0.5, epsilon = 1e-8);
    assert_eq!(poly.cap_polygon(&fit.plane).vertices.len(), 3);
}

#[test]
fn solver_planes_match_cell_fractions() {
    for scheme in [GradientScheme::GreenGauss, GradientScheme::LeastSquares] {
        let mesh = unit_square(12);
        let alpha = disc_fraction(&mesh, [0.45, 0.55], 0.27, 6);
        let config = PlicVofConfig::default()
            .with_gradient(scheme)
            .with_smoothed_alpha_grad(true)
            .with_write_plic_faces(true);
        let mut solver = PlicVofSolver::new(&mesh, alpha.clone(), config, &SerialComm).unwrap();
        let bcs = BoundaryConditions::zero_gradient(&mesh);
        solver.classify(&mesh).unwrap();
        solver.orientation(&mesh, &bcs, &SerialComm).unwrap();
        solver.reconstruction(&mesh).unwrap();

        assert!(!solver.mixed_cells().is_empty());
        for (cell, plane) in solver.interface_planes() {
            let got = CellPolyhedron::from_mesh(&mesh, cell).enclosed_fraction(&plane);
            assert_abs_diff_eq!(got, alpha[cell], epsilon = 1e-8);
            // normals point out of the disc
            let c = mesh.cell_centre(cell);
            let outward = Vector3::new(c.x - 0.45, c.y - 0.55, 0.0);
            assert!(plane.normal.dot(&outward) > 0.0);
        }
        assert_eq!(solver.collected_plic_faces().len(), solver.plic_faces(&mesh).len());
        assert!(solver.collected_plic_faces().len() <= solver.mixed_cells().len());
    }
}
