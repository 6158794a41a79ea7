#![cfg(feature = "stl-io")]

mod support;

use plicvof::fields::BoundaryConditions;
use plicvof::io::{to_obj_string, to_stl_ascii, to_stl_binary};
use plicvof::sync::SerialComm;
use plicvof::{PlicVofConfig, PlicVofSolver};
use support::{disc_fraction, unit_square};

#[test]
fn interface_polygons_export_to_stl_and_obj() {
    let mesh = unit_square(8);
    let alpha = disc_fraction(&mesh, [0.5, 0.5], 0.3, 4);
    let mut solver = PlicVofSolver::new(&mesh, alpha, PlicVofConfig::default(), &SerialComm).unwrap();
    solver.classify(&mesh).unwrap();
    solver
        .orientation(&mesh, &BoundaryConditions::zero_gradient(&mesh), &SerialComm)
        .unwrap();
    solver.reconstruction(&mesh).unwrap();
    let polygons = solver.plic_faces(&mesh);
    assert!(!polygons.is_empty());

    let stl = to_stl_ascii(&polygons, "interface");
    assert!(stl.starts_with("solid interface"));
    assert!(stl.contains("facet normal"));
    assert!(stl.trim_end().ends_with("endsolid interface"));

    let triangles: usize = polygons
        .iter()
        .map(|p| if p.vertices.len() == 3 { 1 } else { p.vertices.len() })
        .sum();
    let binary = to_stl_binary(&polygons).unwrap();
    assert_eq!(binary.len(), 84 + 50 * triangles);

    let obj = to_obj_string("interface", &polygons).unwrap();
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), polygons.len());
}
