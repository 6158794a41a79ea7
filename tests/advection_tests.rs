mod support;

use approx::{abs_diff_eq, assert_abs_diff_eq, assert_relative_eq};
use nalgebra::Vector3;
use plicvof::errors::PlicError;
use plicvof::fields::{AlphaBoundary, BoundaryConditions, FlowFields};
use plicvof::float_types::Real;
use plicvof::mesh::MeshTopology;
use plicvof::solver::{CellStatus, Stage};
use plicvof::sync::SerialComm;
use plicvof::{PlicVofConfig, PlicVofSolver};
use support::{disc_fraction, fluid_volume, uniform, unit_row, unit_square, vortex};

fn internal_face(mesh: &impl MeshTopology, owner: usize, neighbour: usize) -> usize {
    (0..mesh.n_internal_faces())
        .find(|&f| mesh.face_owner(f) == owner && mesh.face_neighbour(f) == Some(neighbour))
        .unwrap()
}

#[test]
fn zero_velocity_leaves_the_field_alone() {
    let mesh = unit_square(10);
    let alpha = disc_fraction(&mesh, [0.5, 0.5], 0.3, 4);
    let phi = vec![0.0; mesh.n_faces()];
    let u = vec![Vector3::zeros(); mesh.n_cells()];
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut solver = PlicVofSolver::new(&mesh, alpha.clone(), PlicVofConfig::default(), &SerialComm).unwrap();

    for _ in 0..3 {
        let report = solver
            .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 0.1, &SerialComm)
            .unwrap();
        assert_eq!(report.sub_cycles, 1);
        assert_eq!(report.courant, 0.0);
    }
    assert_eq!(solver.alpha(), alpha.as_slice());
    assert!(solver.dvf().iter().all(|&v| v == 0.0));
    assert_eq!(solver.mass_conservation_error(), 0.0);
}

#[test]
fn full_and_empty_cells_pass_whole_fluxes() {
    let mesh = unit_row(4);
    let (phi, u) = uniform(&mesh, Vector3::new(0.25, 0.0, 0.0));
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut solver =
        PlicVofSolver::new(&mesh, vec![1.0, 1.0, 0.0, 0.0], PlicVofConfig::default(), &SerialComm).unwrap();

    let report = solver
        .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
        .unwrap();
    assert_eq!(report.sub_cycles, 1);
    assert_eq!(report.mixed_cells, 0);
    assert!(solver.interface_planes().next().is_none());

    assert_abs_diff_eq!(solver.dvf()[internal_face(&mesh, 0, 1)], 0.25, epsilon = 1e-14);
    assert_abs_diff_eq!(solver.dvf()[internal_face(&mesh, 1, 2)], 0.25, epsilon = 1e-14);
    assert_eq!(solver.dvf()[internal_face(&mesh, 2, 3)], 0.0);
    // zero-gradient inflow next to a full cell brings in a full flux
    for (a, expected) in solver.alpha().iter().zip([1.0, 1.0, 0.25, 0.0]) {
        assert_abs_diff_eq!(*a, expected, epsilon = 1e-14);
    }
    assert_eq!(solver.stage(), Stage::Done);
}

#[test]
fn flat_interface_moves_one_cell_per_step() {
    let mesh = unit_row(8);
    let (phi, u) = uniform(&mesh, Vector3::x());
    let xmin = mesh.find_patch("xmin").unwrap();
    let bcs = BoundaryConditions::zero_gradient(&mesh).with(xmin, AlphaBoundary::FixedValue(1.0));
    let mut alpha = vec![0.0; 8];
    alpha[..3].fill(1.0);
    let mut solver = PlicVofSolver::new(&mesh, alpha, PlicVofConfig::default(), &SerialComm).unwrap();

    for step in 1..=3 {
        let report = solver
            .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
            .unwrap();
        // Co = 1 with the default limit of 0.5
        assert_eq!(report.sub_cycles, 2);
        for (c, a) in solver.alpha().iter().enumerate() {
            let expected = if c < 3 + step { 1.0 } else { 0.0 };
            assert!(
                abs_diff_eq!(*a, expected, epsilon = 1e-8),
                "step {step}, cell {c}: {a}"
            );
        }
    }
    assert_eq!(solver.diagnostics().time_steps, 3);
    assert_eq!(solver.diagnostics().sub_cycles, 6);
}

#[test]
fn vortex_keeps_fractions_bounded_and_volume_conserved() {
    let mesh = unit_square(16);
    let alpha = disc_fraction(&mesh, [0.5, 0.75], 0.15, 6);
    let initial = fluid_volume(&mesh, &alpha);
    let (phi, u) = vortex(&mesh);
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut solver = PlicVofSolver::new(&mesh, alpha.clone(), PlicVofConfig::default(), &SerialComm).unwrap();
    assert_relative_eq!(solver.diagnostics().mass_total_ini, initial, max_relative = 1e-12);

    let dt = 0.5 / 16.0;
    for _ in 0..24 {
        solver
            .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, dt, &SerialComm)
            .unwrap();
        assert!(solver.alpha().iter().all(|a| (0.0..=1.0).contains(a)));
    }

    let change = (fluid_volume(&mesh, solver.alpha()) - initial).abs();
    assert!(change <= solver.mass_conservation_error() + 1e-10 * initial);
    assert!(solver.relative_mass_error() < 1e-4);
    // the disc moved
    assert_ne!(solver.alpha(), alpha.as_slice());
    assert!(solver.vof_solving_time() >= solver.advection_time());
}

#[test]
fn outflow_boundary_drains_fluid() {
    let mesh = unit_row(4);
    let (phi, u) = uniform(&mesh, Vector3::new(0.5, 0.0, 0.0));
    let bcs = BoundaryConditions::zero_gradient(&mesh).with(0, AlphaBoundary::FixedValue(0.0));
    let mut solver = PlicVofSolver::new(&mesh, vec![1.0; 4], PlicVofConfig::default(), &SerialComm).unwrap();

    let mut volume = 4.0;
    for _ in 0..4 {
        solver
            .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
            .unwrap();
        let now = fluid_volume(&mesh, solver.alpha());
        assert!(now <= volume + 1e-12);
        volume = now;
    }
    // 0.5 per step leaves through xmax while clean fluid enters at xmin
    assert_abs_diff_eq!(volume, 2.0, epsilon = 1e-6);
    let xmax = mesh.patches()[mesh.find_patch("xmax").unwrap()].start;
    assert!(solver.alpha_phi()[xmax] > 0.0);
}

#[test]
fn topology_change_resets_caches() {
    let small = unit_row(4);
    let mut solver =
        PlicVofSolver::new(&small, vec![1.0, 0.5, 0.0, 0.0], PlicVofConfig::default(), &SerialComm).unwrap();
    solver.classify(&small).unwrap();
    assert_eq!(solver.cell_status()[1], CellStatus::Mixed);

    let large = unit_row(6);
    // alpha still sized for the old mesh
    assert!(matches!(
        solver.classify(&large),
        Err(PlicError::FieldSize { field: "alpha", expected: 6, found: 4 })
    ));
    assert!(solver.topology_changed(&large, vec![0.0; 5]).is_err());

    solver
        .topology_changed(&large, vec![1.0, 1.0, 0.5, 0.0, 0.0, 0.0])
        .unwrap();
    assert_eq!(solver.stage(), Stage::Idle);
    assert_eq!(solver.dvf().len(), large.n_faces());
    assert_eq!(solver.cell_is_bounded().len(), 6);

    let (phi, u) = uniform(&large, Vector3::new(0.1, 0.0, 0.0));
    let bcs = BoundaryConditions::zero_gradient(&large);
    solver
        .advect(&large, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
        .unwrap();
    assert_eq!(solver.cell_status().len(), 6);
}

#[test]
fn same_size_topology_change_drops_interface_data() {
    let mut mesh = unit_row(4);
    let (phi, u) = uniform(&mesh, Vector3::new(0.25, 0.0, 0.0));
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut solver =
        PlicVofSolver::new(&mesh, vec![1.0, 1.0, 1.0, 0.5], PlicVofConfig::default(), &SerialComm).unwrap();
    solver
        .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
        .unwrap();
    // the mixed outflow cell left its interface on the xmax face
    assert!(!solver.boundary_cache().is_empty());
    assert!(solver.interface_planes().next().is_some());
    let alpha = solver.alpha().to_vec();

    mesh.bump_topology();
    solver.classify(&mesh).unwrap();
    assert!(solver.boundary_cache().is_empty());
    assert!(solver.interface_planes().next().is_none());
    assert!(solver.dvf().iter().all(|&v| v == 0.0));
    assert!(solver.cell_is_bounded().iter().all(|b| !b));
    assert_eq!(solver.alpha(), alpha.as_slice());

    solver
        .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
        .unwrap();
    assert_eq!(solver.stage(), Stage::Done);
}

#[test]
fn step_wise_calls_match_advect() {
    let mesh = unit_square(16);
    let alpha = disc_fraction(&mesh, [0.5, 0.75], 0.15, 6);
    let (phi, u) = vortex(&mesh);
    let flow = FlowFields::new(&phi, &u);
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut direct = PlicVofSolver::new(&mesh, alpha.clone(), PlicVofConfig::default(), &SerialComm).unwrap();
    let mut step_wise = PlicVofSolver::new(&mesh, alpha, PlicVofConfig::default(), &SerialComm).unwrap();

    let dt = 0.25 / 16.0;
    for step in 0..6 {
        direct.advect(&mesh, &flow, &bcs, dt, &SerialComm).unwrap();

        step_wise.orientation(&mesh, &bcs, &SerialComm).unwrap();
        step_wise.reconstruction(&mesh).unwrap();
        assert_eq!(step_wise.stage(), Stage::Reconstructed);
        let planes = step_wise.interface_planes().count();
        assert_eq!(planes, step_wise.mixed_cells().len(), "step {step}");
        step_wise.advect(&mesh, &flow, &bcs, dt, &SerialComm).unwrap();

        assert_eq!(direct.cell_status(), step_wise.cell_status(), "step {step}");
        assert_eq!(direct.mixed_cells(), step_wise.mixed_cells(), "step {step}");
        assert_eq!(direct.alpha(), step_wise.alpha(), "step {step}");
        assert_eq!(direct.dvf(), step_wise.dvf(), "step {step}");
        assert_eq!(direct.cell_is_bounded(), step_wise.cell_is_bounded(), "step {step}");
    }
}

#[test]
fn reconstruction_needs_fresh_normals() {
    let mesh = unit_row(4);
    let (phi, u) = uniform(&mesh, Vector3::new(0.25, 0.0, 0.0));
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let mut solver =
        PlicVofSolver::new(&mesh, vec![1.0, 0.5, 0.0, 0.0], PlicVofConfig::default(), &SerialComm).unwrap();
    assert!(matches!(
        solver.reconstruction(&mesh),
        Err(PlicError::StageOrder { expected: Stage::Oriented, found: Stage::Idle, .. })
    ));

    solver
        .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm)
        .unwrap();
    assert!(matches!(
        solver.reconstruction(&mesh),
        Err(PlicError::StageOrder { found: Stage::Done, .. })
    ));
    solver.classify(&mesh).unwrap();
    assert!(solver.reconstruction(&mesh).is_err());
    solver.orientation(&mesh, &bcs, &SerialComm).unwrap();
    solver.reconstruction(&mesh).unwrap();
}

#[test]
fn mismatched_flux_field_is_rejected() {
    let mesh = unit_row(3);
    let mut solver = PlicVofSolver::new(&mesh, vec![0.0; 3], PlicVofConfig::default(), &SerialComm).unwrap();
    let phi = vec![0.0; 2];
    let u = vec![Vector3::zeros(); 3];
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    let err = solver.advect(&mesh, &FlowFields::new(&phi, &u), &bcs, 1.0, &SerialComm);
    assert!(matches!(err, Err(PlicError::FieldSize { field: "phi", .. })));
    let rho = solver.rho_phi(1.0, 1.0, &phi);
    assert!(rho.is_err());
}

#[test]
fn initial_fractions_are_clamped() {
    let mesh = unit_row(3);
    let solver = PlicVofSolver::new(&mesh, vec![-0.1, 0.4, 1.2], PlicVofConfig::default(), &SerialComm).unwrap();
    assert_eq!(solver.alpha(), &[0.0, 0.4, 1.0]);
    let expected: Real = 1.4;
    assert_relative_eq!(solver.diagnostics().mass_total_ini, expected, max_relative = 1e-12);
}
