#![cfg(feature = "hashmap")]

mod support;

use approx::abs_diff_eq;
use nalgebra::Vector3;
use plicvof::fields::{BoundaryConditions, FlowFields};
use plicvof::float_types::Real;
use plicvof::mesh::MeshTopology;
use plicvof::mesh::decompose::{SubMesh, decompose};
use plicvof::sync::{Communicator, SerialComm, ThreadComm};
use plicvof::{PlicVofConfig, PlicVofSolver};
use support::{disc_fraction, unit_square, vortex};

const STEPS: usize = 4;

fn run_partition(
    sub: &SubMesh,
    comm: &ThreadComm,
    alpha: &[Real],
    phi: &[Real],
    u: &[Vector3<Real>],
    dt: Real,
    config: &PlicVofConfig,
) -> (Vec<Real>, Vec<Real>) {
    let local_phi = sub.scatter_faces(phi);
    let local_u = sub.scatter_cells(u);
    let bcs = BoundaryConditions::zero_gradient(&sub.mesh);
    let mut solver = PlicVofSolver::new(&sub.mesh, sub.scatter_cells(alpha), config.clone(), comm).unwrap();
    for _ in 0..STEPS {
        solver
            .advect(&sub.mesh, &FlowFields::new(&local_phi, &local_u), &bcs, dt, comm)
            .unwrap();
    }
    (solver.alpha().to_vec(), solver.dvf().to_vec())
}

fn compare_with_serial(parts: usize, partition: impl Fn(Real, Real) -> usize, config: PlicVofConfig) {
    let mesh = unit_square(12);
    let alpha = disc_fraction(&mesh, [0.5, 0.6], 0.22, 6);
    let (phi, u) = vortex(&mesh);
    let dt = 0.04;

    let mut serial = PlicVofSolver::new(&mesh, alpha.clone(), config.clone(), &SerialComm).unwrap();
    let bcs = BoundaryConditions::zero_gradient(&mesh);
    for _ in 0..STEPS {
        serial
            .advect(&mesh, &FlowFields::new(&phi, &u), &bcs, dt, &SerialComm)
            .unwrap();
    }

    let cell_partition: Vec<usize> = (0..mesh.n_cells())
        .map(|c| {
            let cc = mesh.cell_centre(c);
            partition(cc.x, cc.y)
        })
        .collect();
    let subs = decompose(&mesh, &cell_partition).unwrap();
    assert_eq!(subs.len(), parts);

    let results: Vec<(Vec<Real>, Vec<Real>)> = std::thread::scope(|s| {
        let handles: Vec<_> = subs
            .iter()
            .zip(ThreadComm::world(parts))
            .map(|(sub, comm)| {
                let (alpha, phi, u, config) = (&alpha, &phi, &u, &config);
                s.spawn(move || {
                    assert_eq!(comm.rank(), sub.rank);
                    run_partition(sub, &comm, alpha, phi, u, dt, config)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut alpha_par = vec![Real::NAN; mesh.n_cells()];
    let mut dvf_par = vec![Real::NAN; mesh.n_faces()];
    for (sub, (a, d)) in subs.iter().zip(&results) {
        sub.gather_cells(a, &mut alpha_par);
        sub.gather_faces(d, &mut dvf_par);
    }

    for (c, (p, s)) in alpha_par.iter().zip(serial.alpha()).enumerate() {
        assert!(abs_diff_eq!(*p, *s, epsilon = 1e-9), "cell {c}: {p} vs {s}");
    }
    for (f, (p, s)) in dvf_par.iter().zip(serial.dvf()).enumerate() {
        assert!(abs_diff_eq!(*p, *s, epsilon = 1e-9), "face {f}: {p} vs {s}");
    }
}

#[test]
fn two_partitions_match_serial() {
    compare_with_serial(2, |x, _| usize::from(x > 0.5), PlicVofConfig::default());
}

#[test]
fn four_partitions_with_smoothing_match_serial() {
    let config = PlicVofConfig::default().with_smoothed_alpha_grad(true);
    compare_with_serial(4, |x, y| usize::from(x > 0.5) + 2 * usize::from(y > 0.55), config);
}
