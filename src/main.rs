// main.rs
//
// A disc of fluid carried around by a single vortex in a closed box. The flow
// reverses halfway through, so the disc should come back to where it started.
// Interface polygons are written to plic/ every few steps.

use std::fs::{self, File};
use std::io::BufWriter;

use nalgebra::{Point3, Vector3};
use plicvof::fields::{BoundaryConditions, FlowFields, cell_velocities, stream_function_fluxes};
use plicvof::float_types::{PI, Real};
use plicvof::io::{IoError, write_obj};
use plicvof::mesh::{MeshTopology, PolyMesh};
use plicvof::sync::SerialComm;
use plicvof::{PlicVofConfig, PlicVofSolver};

const N: usize = 32;
const STEPS: usize = 128;
const WRITE_EVERY: usize = 16;

/// Fraction of each cell inside the disc, by sub-sampling.
fn disc_fraction(mesh: &PolyMesh, centre: [Real; 2], radius: Real) -> Vec<Real> {
    let h = 1.0 / N as Real;
    let samples = 8;
    (0..mesh.n_cells())
        .map(|c| {
            let cc = mesh.cell_centre(c);
            let mut inside = 0;
            for i in 0..samples {
                for j in 0..samples {
                    let x = cc.x - 0.5 * h + (i as Real + 0.5) * h / samples as Real;
                    let y = cc.y - 0.5 * h + (j as Real + 0.5) * h / samples as Real;
                    if (x - centre[0]).hypot(y - centre[1]) <= radius {
                        inside += 1;
                    }
                }
            }
            inside as Real / (samples * samples) as Real
        })
        .collect()
}

fn main() -> plicvof::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let h = 1.0 / N as Real;
    let mesh = PolyMesh::hex_block([N, N, 1], Point3::origin(), Point3::new(1.0, 1.0, h))?;
    let alpha = disc_fraction(&mesh, [0.5, 0.75], 0.15);

    let config = PlicVofConfig::default().with_write_plic_faces(true);
    let comm = SerialComm;
    let mut solver = PlicVofSolver::new(&mesh, alpha, config, &comm)?;
    let bcs = BoundaryConditions::zero_gradient(&mesh);

    let psi = |x: Real, y: Real| (PI * x).sin() * (PI * y).sin() / PI;
    let velocity = |p: &Point3<Real>| {
        Vector3::new(
            (PI * p.x).sin() * (PI * p.y).cos(),
            -(PI * p.x).cos() * (PI * p.y).sin(),
            0.0,
        )
    };
    let forward_phi = stream_function_fluxes(&mesh, psi);
    let forward_u = cell_velocities(&mesh, velocity);
    let backward_phi: Vec<Real> = forward_phi.iter().map(|p| -p).collect();
    let backward_u: Vec<Vector3<Real>> = forward_u.iter().map(|u| -u).collect();

    fs::create_dir_all("plic").map_err(IoError::from)?;
    let dt = 0.5 * h;

    for step in 0..STEPS {
        let flow = if step < STEPS / 2 {
            FlowFields::new(&forward_phi, &forward_u)
        } else {
            FlowFields::new(&backward_phi, &backward_u)
        };
        solver.advect(&mesh, &flow, &bcs, dt, &comm)?;

        if step % WRITE_EVERY == 0 || step + 1 == STEPS {
            let name = format!("plic/step_{step:04}.obj");
            let file = File::create(&name).map_err(IoError::from)?;
            write_obj(BufWriter::new(file), "interface", solver.collected_plic_faces())?;
            log::info!("wrote {} interface polygons to {name}", solver.collected_plic_faces().len());
        }
    }

    let d = solver.diagnostics();
    log::info!(
        "{} steps, {} sub-cycles, relative mass error {:.3e}, {} clamp events, {} unconverged fits",
        d.time_steps,
        d.sub_cycles,
        solver.relative_mass_error(),
        d.clamp_events,
        d.plane_fit_failures
    );
    log::info!(
        "orientation {:.3}s, reconstruction {:.3}s, advection {:.3}s",
        solver.orientation_time(),
        solver.reconstruction_time(),
        solver.advection_time()
    );
    Ok(())
}
