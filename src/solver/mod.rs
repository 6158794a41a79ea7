//! The per-partition PLIC-VOF solver.
//!
//! One [`PlicVofSolver`] owns the volume-fraction field of its partition and
//! advances it one flow timestep per [`advect`](PlicVofSolver::advect) call:
//!
//! ```text
//! Idle -> Classified -> Oriented -> Reconstructed -> Advected (sub-cycles) -> Done
//! ```
//!
//! Each sub-cycle classifies cells, orients and reconstructs the interface in
//! mixed cells, cuts every face against its upwind interface, reconciles
//! processor faces, limits and applies the transport volumes. All partitions
//! of a run must call `advect` together since the sub-cycle count and the
//! limiter passes are agreed on through global reductions.

pub mod boundary_cache;
pub mod diagnostics;
pub mod state;

pub use boundary_cache::{BoundaryInterfaceCache, BoundarySnapshot};
pub use diagnostics::{AdvectionReport, Diagnostics};
pub use state::{CellStatus, MixedCells, Stage};

use crate::config::PlicVofConfig;
use crate::cut_cell::{CellPolyhedron, PlaneFitter};
use crate::cut_face::FaceClipper;
use crate::errors::{PlicError, Result};
use crate::fields::{AlphaBoundary, BoundaryConditions, FlowFields};
use crate::float_types::{Real, VSMALL};
use crate::kernels::{CutJob, DefaultKernels, KernelOps};
use crate::limiter::FluxLimiter;
use crate::mesh::{FaceRef, MeshTopology};
use crate::orientation::OrientationEstimator;
use crate::plane::Plane;
use crate::polygon::Polygon;
use crate::sync::{Communicator, PartitionSynchronizer, ReduceOp};
use nalgebra::Vector3;
use std::time::Instant;

pub struct PlicVofSolver<K: KernelOps = DefaultKernels> {
    config: PlicVofConfig,
    kernels: K,
    fitter: PlaneFitter,
    estimator: OrientationEstimator,
    limiter: FluxLimiter,

    alpha: Vec<Real>,
    status: Vec<CellStatus>,
    mixed: MixedCells,
    /// Last good normal of each cell, used when the gradient vanishes
    retained: Vec<Option<Vector3<Real>>>,
    /// Cells flagged by the limiter or by a degenerate normal
    bounded: Vec<bool>,
    /// Transport volumes accumulated over the current timestep
    dvf: Vec<Real>,
    boundary_cache: BoundaryInterfaceCache,
    plic_faces: Vec<Polygon>,
    diagnostics: Diagnostics,
    stage: Stage,

    topology_version: u64,
    n_cells: usize,
    n_faces: usize,
    step: u64,
    time: Real,
    last_dt: Real,
}

impl PlicVofSolver<DefaultKernels> {
    /// Solver for `mesh` starting from `alpha`. Values outside `[0, 1]` are
    /// clamped. Collective: every partition must construct its solver.
    pub fn new<M, C>(mesh: &M, alpha: Vec<Real>, config: PlicVofConfig, comm: &C) -> Result<Self>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        Self::with_kernels(mesh, alpha, config, comm, DefaultKernels::default())
    }
}

impl<K: KernelOps> PlicVofSolver<K> {
    pub fn with_kernels<M, C>(
        mesh: &M,
        mut alpha: Vec<Real>,
        config: PlicVofConfig,
        comm: &C,
        kernels: K,
    ) -> Result<Self>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        if alpha.len() != mesh.n_cells() {
            return Err(PlicError::FieldSize {
                field: "alpha",
                expected: mesh.n_cells(),
                found: alpha.len(),
            });
        }
        let out_of_range = alpha.iter().filter(|a| !(0.0..=1.0).contains(*a)).count();
        if out_of_range > 0 {
            log::warn!("{out_of_range} initial fraction values outside [0, 1] were clamped");
            for a in &mut alpha {
                *a = a.clamp(0.0, 1.0);
            }
        }

        let local_mass: Real = alpha
            .iter()
            .enumerate()
            .map(|(c, a)| a * mesh.cell_volume(c))
            .sum();
        let mass_total_ini = comm.all_reduce(local_mass, ReduceOp::Sum)?;

        let mut solver = PlicVofSolver {
            fitter: PlaneFitter::new(config.fit_tolerance, config.fit_max_iterations),
            estimator: OrientationEstimator::new(config.gradient, config.smoothed_alpha_grad),
            limiter: FluxLimiter::new(config.n_alpha_bounds),
            config,
            kernels,
            alpha,
            status: Vec::new(),
            mixed: MixedCells::default(),
            retained: Vec::new(),
            bounded: Vec::new(),
            dvf: Vec::new(),
            boundary_cache: BoundaryInterfaceCache::default(),
            plic_faces: Vec::new(),
            diagnostics: Diagnostics {
                mass_total_ini,
                ..Default::default()
            },
            stage: Stage::Idle,
            topology_version: 0,
            n_cells: 0,
            n_faces: 0,
            step: 0,
            time: 0.0,
            last_dt: 0.0,
        };
        solver.reset_caches(mesh);
        log::info!(
            "PLIC-VOF solver: {} cells, {} faces, initial volume {mass_total_ini:.6e}",
            mesh.n_cells(),
            mesh.n_faces()
        );
        Ok(solver)
    }

    /// Resize and clear every per-cell and per-face cache.
    fn reset_caches<M: MeshTopology + ?Sized>(&mut self, mesh: &M) {
        self.n_cells = mesh.n_cells();
        self.n_faces = mesh.n_faces();
        self.topology_version = mesh.topology_version();
        self.status = vec![CellStatus::Empty; self.n_cells];
        self.mixed = MixedCells::default();
        self.retained = vec![None; self.n_cells];
        self.bounded = vec![false; self.n_cells];
        self.dvf = vec![0.0; self.n_faces];
        self.boundary_cache.reset(mesh);
        self.plic_faces.clear();
        self.stage = Stage::Idle;
    }

    fn topology_is_stale<M: MeshTopology + ?Sized>(&self, mesh: &M) -> bool {
        mesh.topology_version() != self.topology_version
            || mesh.n_cells() != self.n_cells
            || mesh.n_faces() != self.n_faces
    }

    /// Install a fraction field mapped onto a changed mesh and drop all
    /// caches.
    pub fn topology_changed<M: MeshTopology + ?Sized>(&mut self, mesh: &M, alpha: Vec<Real>) -> Result<()> {
        if alpha.len() != mesh.n_cells() {
            return Err(PlicError::FieldSize {
                field: "alpha",
                expected: mesh.n_cells(),
                found: alpha.len(),
            });
        }
        self.alpha = alpha;
        self.reset_caches(mesh);
        log::info!("mesh topology changed, caches reset for {} cells", self.n_cells);
        Ok(())
    }

    /// Tag every cell empty, mixed or full. Called at the start of a
    /// timestep it also clears the bounded flags of the previous one.
    pub fn classify<M: MeshTopology + ?Sized>(&mut self, mesh: &M) -> Result<()> {
        if self.topology_is_stale(mesh) {
            if self.alpha.len() != mesh.n_cells() {
                return Err(PlicError::FieldSize {
                    field: "alpha",
                    expected: mesh.n_cells(),
                    found: self.alpha.len(),
                });
            }
            log::debug!("mesh topology version changed, resetting caches");
            self.reset_caches(mesh);
        }
        if matches!(self.stage, Stage::Idle | Stage::Done) {
            self.bounded.iter_mut().for_each(|b| *b = false);
        }

        let tol = self.config.surf_cell_tol;
        for (c, status) in self.status.iter_mut().enumerate() {
            let degenerate = mesh.cell_volume(c) < VSMALL;
            *status = CellStatus::classify(self.alpha[c], tol, degenerate);
        }
        self.mixed = MixedCells::from_status(&self.status);
        self.stage = Stage::Classified;
        log::trace!("classified {} mixed cells", self.mixed.len());
        Ok(())
    }

    /// Boundary-face values of the fraction: boundary conditions on physical
    /// patches, remote cell values on processor patches.
    fn boundary_alpha<M, C>(&self, mesh: &M, bcs: &BoundaryConditions, comm: &C) -> Result<Vec<Real>>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let mut values: Vec<Real> = (mesh.n_internal_faces()..mesh.n_faces())
            .map(|f| bcs.face_value(mesh, &self.alpha, f))
            .collect();
        PartitionSynchronizer.swap_cell_values(mesh, comm, &self.alpha, &mut values)?;
        Ok(values)
    }

    /// Interface normals of the mixed cells. Cells are classified first
    /// unless [`classify`](Self::classify) was the last call.
    pub fn orientation<M, C>(&mut self, mesh: &M, bcs: &BoundaryConditions, comm: &C) -> Result<()>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        if self.stage != Stage::Classified || self.topology_is_stale(mesh) {
            self.classify(mesh)?;
        }
        let timer = Instant::now();

        let boundary = self.boundary_alpha(mesh, bcs, comm)?;
        let cells = &self.mixed.cells;
        let mut estimate = self
            .estimator
            .raw_normals(mesh, &self.alpha, &boundary, cells, &self.retained);

        if self.estimator.smoothing {
            let mut raw = vec![Vector3::zeros(); mesh.n_cells()];
            for (&c, n) in cells.iter().zip(&estimate.normals) {
                raw[c] = *n;
            }
            let mut halo = vec![Vector3::zeros(); mesh.n_boundary_faces()];
            PartitionSynchronizer.swap_cell_vectors(mesh, comm, &raw, &mut halo)?;
            estimate.normals = self.estimator.smooth(mesh, cells, &raw, &halo);
        }

        for ((&c, n), &degenerate) in cells.iter().zip(&estimate.normals).zip(&estimate.degenerate) {
            if degenerate {
                self.bounded[c] = true;
            } else {
                self.retained[c] = Some(*n);
            }
        }
        self.diagnostics.degenerate_normals += estimate.n_degenerate();
        self.mixed.normals = estimate.normals;
        self.mixed.degenerate = estimate.degenerate;
        self.mixed.planes.clear();

        self.diagnostics.orientation_time += timer.elapsed();
        self.stage = Stage::Oriented;
        Ok(())
    }

    /// Fit one interface plane per mixed cell. Must follow
    /// [`orientation`](Self::orientation) within the same timestep.
    pub fn reconstruction<M: MeshTopology + ?Sized>(&mut self, mesh: &M) -> Result<()> {
        if self.stage != Stage::Oriented {
            return Err(PlicError::StageOrder {
                operation: "reconstruction",
                expected: Stage::Oriented,
                found: self.stage,
            });
        }
        let timer = Instant::now();

        let fits = self.kernels.fit_planes(
            mesh,
            &self.fitter,
            &self.mixed.cells,
            &self.mixed.normals,
            &self.alpha,
        );
        let failures = fits.iter().filter(|f| !f.converged).count();
        if failures > 0 {
            log::warn!("{failures} plane fits did not reach tolerance");
        }
        self.diagnostics.plane_fit_failures += failures;
        self.mixed.planes = fits.into_iter().map(|f| f.plane).collect();

        if self.config.write_plic_faces {
            self.plic_faces = self.plic_faces(mesh);
        }

        self.diagnostics.reconstruction_time += timer.elapsed();
        self.stage = Stage::Reconstructed;
        Ok(())
    }

    /// Advance the fraction field over one flow timestep `dt`.
    pub fn advect<M, C>(
        &mut self,
        mesh: &M,
        flow: &FlowFields,
        bcs: &BoundaryConditions,
        dt: Real,
        comm: &C,
    ) -> Result<AdvectionReport>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        flow.validate(mesh)?;
        if self.topology_is_stale(mesh) {
            self.classify(mesh)?;
        }

        let courant = comm.all_reduce(self.local_courant(mesh, flow.phi, dt), ReduceOp::Max)?;
        let n_sub = self.config.sub_cycles_for(courant);
        let sub_dt = dt / n_sub as Real;

        self.step += 1;
        self.last_dt = dt;
        self.dvf.iter_mut().for_each(|v| *v = 0.0);
        let mut report = AdvectionReport {
            courant,
            sub_cycles: n_sub,
            ..Default::default()
        };

        for cycle in 0..n_sub {
            // the first sub-cycle may reuse a reconstruction done step-wise
            if cycle > 0 || self.stage != Stage::Reconstructed {
                self.classify(mesh)?;
                self.orientation(mesh, bcs, comm)?;
                self.reconstruction(mesh)?;
            }
            self.stage = Stage::Advected;
            let timer = Instant::now();

            let mut dvf = self.face_transport(mesh, flow, bcs, sub_dt);
            PartitionSynchronizer.reconcile(mesh, comm, flow.phi, &mut dvf)?;

            let limited = self.limiter.limit(
                mesh,
                comm,
                flow.phi,
                sub_dt,
                &self.alpha,
                &mut dvf,
                &mut self.bounded,
            )?;
            if !limited.converged {
                self.diagnostics.limiter_unconverged += 1;
                log::warn!(
                    "flux limiter left bound violations after {} passes (step {}, sub-cycle {cycle})",
                    limited.passes,
                    self.step
                );
            }
            report.limiter_passes += limited.passes;

            let update = self
                .limiter
                .update_fraction(mesh, &mut self.alpha, &dvf, self.config.snap_tol);
            if update.clamp_events > 0 {
                log::warn!(
                    "{} cells clamped into [0, 1] (step {}, sub-cycle {cycle})",
                    update.clamp_events,
                    self.step
                );
            }
            let mass_change = comm.all_reduce(update.mass_change, ReduceOp::Sum)?;
            self.diagnostics.mass_conservation_error += mass_change;
            self.diagnostics.clamp_events += update.clamp_events;
            self.diagnostics.snapped_cells += update.snapped_cells;
            report.clamp_events += update.clamp_events;
            report.mass_change += mass_change;
            report.mixed_cells = self.mixed.len();

            for (acc, v) in self.dvf.iter_mut().zip(&dvf) {
                *acc += v;
            }
            self.time += sub_dt;
            self.diagnostics.advection_time += timer.elapsed();
            log::debug!(
                "sub-cycle {}/{n_sub}: {} mixed cells, {} limiter passes",
                cycle + 1,
                self.mixed.len(),
                limited.passes
            );
        }

        self.diagnostics.time_steps += 1;
        self.diagnostics.sub_cycles += n_sub;
        self.stage = Stage::Done;
        log::info!(
            "step {}: Co = {courant:.3}, {n_sub} sub-cycles, {} mixed cells, relative mass error {:.3e}",
            self.step,
            report.mixed_cells,
            self.diagnostics.relative_mass_error()
        );
        Ok(report)
    }

    /// Largest `0.5·Σ|phi|·dt/V` over the cells of this partition.
    fn local_courant<M: MeshTopology + ?Sized>(&self, mesh: &M, phi: &[Real], dt: Real) -> Real {
        let mut sum = vec![0.0; mesh.n_cells()];
        for (f, p) in phi.iter().enumerate() {
            sum[mesh.face_owner(f)] += p.abs();
            if let Some(n) = mesh.face_neighbour(f) {
                sum[n] += p.abs();
            }
        }
        sum.iter()
            .enumerate()
            .filter(|(c, _)| mesh.cell_volume(*c) >= VSMALL)
            .map(|(c, s)| 0.5 * s * dt / mesh.cell_volume(c))
            .fold(0.0, Real::max)
    }

    /// Raw transport volume of every face for one sub-interval.
    fn face_transport<M: MeshTopology + ?Sized>(
        &mut self,
        mesh: &M,
        flow: &FlowFields,
        bcs: &BoundaryConditions,
        sub_dt: Real,
    ) -> Vec<Real> {
        let mut dvf = vec![0.0; mesh.n_faces()];
        let mut jobs = Vec::new();

        for f in 0..mesh.n_faces() {
            let phi = flow.phi[f];
            if phi == 0.0 {
                continue;
            }
            let flux_volume = phi * sub_dt;

            let upwind = match mesh.face_ref(f) {
                FaceRef::Internal { owner, neighbour } => {
                    if phi > 0.0 {
                        owner
                    } else {
                        neighbour
                    }
                },
                FaceRef::Processor { owner, .. } => {
                    if phi > 0.0 {
                        owner
                    } else {
                        // adopted from the upwind partition
                        continue;
                    }
                },
                FaceRef::Boundary { owner, patch, .. } => {
                    if phi < 0.0 {
                        dvf[f] = match bcs.get(patch) {
                            AlphaBoundary::FixedValue(v) => flux_volume * v,
                            AlphaBoundary::ZeroGradient => match self.status[owner] {
                                CellStatus::Full => flux_volume,
                                CellStatus::Empty => 0.0,
                                CellStatus::Mixed => flux_volume * self.alpha[owner],
                            },
                        };
                        continue;
                    }
                    if self.status[owner] != CellStatus::Mixed {
                        if let Some(snap) = self.boundary_cache.lookup(f, self.step) {
                            let plane = snap.plane_at(self.time);
                            jobs.push(CutJob {
                                face: f,
                                plane,
                                sweep: snap.un0 * sub_dt,
                                flux_volume,
                            });
                            continue;
                        }
                    }
                    owner
                },
            };

            if mesh.mag_sf(f) < VSMALL {
                dvf[f] = if self.alpha[upwind] >= 0.5 { flux_volume } else { 0.0 };
                continue;
            }
            match self.status[upwind] {
                CellStatus::Full => dvf[f] = flux_volume,
                CellStatus::Empty => {},
                CellStatus::Mixed => {
                    let Some(plane) = self.mixed.plane_of(upwind) else {
                        continue;
                    };
                    let un0 = flow.u[upwind].dot(&plane.normal);
                    if !mesh.is_internal(f) {
                        self.boundary_cache.store(
                            f,
                            BoundarySnapshot {
                                plane,
                                un0,
                                step: self.step,
                                time: self.time,
                            },
                        );
                    }
                    jobs.push(CutJob {
                        face: f,
                        plane,
                        sweep: un0 * sub_dt,
                        flux_volume,
                    });
                },
            }
        }

        let volumes = self.kernels.transport_volumes(mesh, &FaceClipper, &jobs);
        for (job, v) in jobs.iter().zip(volumes) {
            dvf[job.face] = v;
        }
        dvf
    }

    pub fn config(&self) -> &PlicVofConfig {
        &self.config
    }

    /// Current volume fraction field.
    pub fn alpha(&self) -> &[Real] {
        &self.alpha
    }

    /// Transport volume of every face accumulated over the last timestep.
    pub fn dvf(&self) -> &[Real] {
        &self.dvf
    }

    /// `dVf/dt` of the last timestep.
    pub fn alpha_phi(&self) -> Vec<Real> {
        if self.last_dt <= 0.0 {
            return vec![0.0; self.dvf.len()];
        }
        self.dvf.iter().map(|v| v / self.last_dt).collect()
    }

    /// Mass flux `(ρ1 - ρ2)·dVf/dt + ρ2·phi`.
    pub fn rho_phi(&self, rho1: Real, rho2: Real, phi: &[Real]) -> Result<Vec<Real>> {
        if phi.len() != self.dvf.len() {
            return Err(PlicError::FieldSize {
                field: "phi",
                expected: self.dvf.len(),
                found: phi.len(),
            });
        }
        Ok(self
            .alpha_phi()
            .into_iter()
            .zip(phi)
            .map(|(ap, p)| (rho1 - rho2) * ap + rho2 * p)
            .collect())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Seconds spent estimating normals.
    pub fn orientation_time(&self) -> f64 {
        self.diagnostics.orientation_time.as_secs_f64()
    }

    /// Seconds spent fitting planes.
    pub fn reconstruction_time(&self) -> f64 {
        self.diagnostics.reconstruction_time.as_secs_f64()
    }

    /// Seconds spent cutting faces, limiting and updating.
    pub fn advection_time(&self) -> f64 {
        self.diagnostics.advection_time.as_secs_f64()
    }

    pub fn vof_solving_time(&self) -> f64 {
        self.diagnostics.vof_solving_time().as_secs_f64()
    }

    pub fn mass_conservation_error(&self) -> Real {
        self.diagnostics.mass_conservation_error
    }

    pub fn relative_mass_error(&self) -> Real {
        self.diagnostics.relative_mass_error()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn cell_status(&self) -> &[CellStatus] {
        &self.status
    }

    pub fn mixed_cells(&self) -> &[usize] {
        &self.mixed.cells
    }

    /// Cells touched by the limiter or oriented with a fallback normal
    /// during the last timestep.
    pub fn cell_is_bounded(&self) -> &[bool] {
        &self.bounded
    }

    /// `(cell, plane)` for every reconstructed mixed cell.
    pub fn interface_planes(&self) -> impl Iterator<Item = (usize, Plane)> + '_ {
        self.mixed
            .cells
            .iter()
            .copied()
            .zip(self.mixed.planes.iter().copied())
    }

    /// Interface polygon of every reconstructed mixed cell.
    ///
    /// Cap points are ordered by angle about their centroid, which assumes
    /// convex cells. A non-convex cell cut into several loops yields a
    /// self-intersecting polygon. Only the exported geometry is affected.
    pub fn plic_faces<M: MeshTopology + ?Sized>(&self, mesh: &M) -> Vec<Polygon> {
        self.interface_planes()
            .map(|(c, plane)| CellPolyhedron::from_mesh(mesh, c).cap_polygon(&plane))
            .filter(|p| p.vertices.len() >= 3)
            .collect()
    }

    /// Polygons collected at the last reconstruction when `write_plic_faces`
    /// is enabled.
    pub fn collected_plic_faces(&self) -> &[Polygon] {
        &self.plic_faces
    }

    pub fn boundary_cache(&self) -> &BoundaryInterfaceCache {
        &self.boundary_cache
    }
}
