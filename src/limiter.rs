//! Bounding of face transport volumes.
//!
//! A cell that would end above `1` pushes its surplus out through its
//! downwind faces in proportion to `|phi|`, each face capped by the volume it
//! can still carry, `|phi·dt - dVf|`. Undershoots are the same operation on
//! the other phase: `1 - alpha` with `phi·dt - dVf`.
//!
//! Every cell only edits faces it is upwind of and computes its surplus from
//! the transport volumes at the start of the sweep, so the outcome does not
//! depend on cell order or on how the mesh is partitioned.

use crate::errors::Result;
use crate::float_types::{Real, VSMALL};
use crate::mesh::MeshTopology;
use crate::sync::{Communicator, PartitionSynchronizer, ReduceOp};

/// Global bound violation that triggers a limiter pass.
const GLOBAL_TOL: Real = 1e-12;
/// Per-cell surplus below which a cell is left alone.
const CELL_TOL: Real = 1e-14;

/// Net volume leaving each cell through its faces.
pub fn net_outflow<M: MeshTopology + ?Sized>(mesh: &M, dvf: &[Real]) -> Vec<Real> {
    let mut out = vec![0.0; mesh.n_cells()];
    for (f, &v) in dvf.iter().enumerate().take(mesh.n_faces()) {
        out[mesh.face_owner(f)] += v;
        if let Some(n) = mesh.face_neighbour(f) {
            out[n] -= v;
        }
    }
    out
}

/// Fraction each cell would have after applying `dvf` to `alpha`.
pub fn tentative_fraction<M: MeshTopology + ?Sized>(mesh: &M, alpha: &[Real], dvf: &[Real]) -> Vec<Real> {
    net_outflow(mesh, dvf)
        .into_iter()
        .enumerate()
        .map(|(c, out)| {
            let v = mesh.cell_volume(c);
            if v < VSMALL { alpha[c] } else { alpha[c] - out / v }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterReport {
    /// Passes that found a violation
    pub passes: usize,
    /// Faces changed over all passes
    pub corrected_faces: usize,
    /// Whether the tentative fraction ended within bounds on all partitions
    pub converged: bool,
}

/// Outcome of applying corrected transport volumes to the fraction field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    /// Cells clamped back into `[0, 1]`
    pub clamp_events: usize,
    pub snapped_cells: usize,
    /// `Σ |α_final - α_raw|·V`, the volume created or destroyed by clamping
    /// and snapping
    pub mass_change: Real,
}

#[derive(Debug, Clone, Copy)]
pub struct FluxLimiter {
    pub n_alpha_bounds: usize,
}

impl FluxLimiter {
    pub const fn new(n_alpha_bounds: usize) -> Self {
        FluxLimiter { n_alpha_bounds }
    }

    /// Correct `dvf` in place so that `alpha - div(dvf)` stays within
    /// `[0, 1]`. Cells whose faces were changed are flagged in `bounded`.
    ///
    /// Faces corrected by the overshoot sweep of a pass are locked for the
    /// undershoot sweep of that pass only. Locks are cleared when the next
    /// pass starts, so a face may be corrected again in a later pass.
    #[allow(clippy::too_many_arguments)]
    pub fn limit<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        phi: &[Real],
        dt: Real,
        alpha: &[Real],
        dvf: &mut [Real],
        bounded: &mut [bool],
    ) -> Result<LimiterReport>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let sync = PartitionSynchronizer;
        let mut report = LimiterReport::default();
        let mut locked = vec![false; mesh.n_faces()];
        let complement: Vec<Real> = alpha.iter().map(|a| 1.0 - a).collect();

        for _ in 0..self.n_alpha_bounds {
            let (over, under) = self.violations(mesh, comm, alpha, dvf)?;
            if !over && !under {
                report.converged = true;
                return Ok(report);
            }
            report.passes += 1;
            locked.fill(false);

            if over {
                let mut changed = vec![false; mesh.n_faces()];
                bound_from_above(mesh, phi, dt, alpha, dvf, &locked, &mut changed, bounded);
                report.corrected_faces += changed.iter().filter(|&&c| c).count();
                for (l, c) in locked.iter_mut().zip(&changed) {
                    *l |= *c;
                }
                sync.reconcile(mesh, comm, phi, dvf)?;
            }

            // undershoot needs its own global check after the overshoot sweep
            let (_, under) = self.violations(mesh, comm, alpha, dvf)?;
            if under {
                let mut dvf2: Vec<Real> = phi
                    .iter()
                    .zip(dvf.iter())
                    .map(|(p, d)| p * dt - d)
                    .collect();
                let mut changed = vec![false; mesh.n_faces()];
                bound_from_above(mesh, phi, dt, &complement, &mut dvf2, &locked, &mut changed, bounded);
                for f in 0..mesh.n_faces() {
                    if changed[f] {
                        dvf[f] = phi[f] * dt - dvf2[f];
                        report.corrected_faces += 1;
                    }
                }
                sync.reconcile(mesh, comm, phi, dvf)?;
            }
        }

        let (over, under) = self.violations(mesh, comm, alpha, dvf)?;
        report.converged = !over && !under;
        Ok(report)
    }

    /// Global overshoot and undershoot of the tentative fraction.
    fn violations<M, C>(&self, mesh: &M, comm: &C, alpha: &[Real], dvf: &[Real]) -> Result<(bool, bool)>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let tentative = tentative_fraction(mesh, alpha, dvf);
        let local_max = tentative.iter().copied().fold(Real::NEG_INFINITY, Real::max);
        let local_min = tentative.iter().copied().fold(Real::INFINITY, Real::min);
        let max = comm.all_reduce(local_max, ReduceOp::Max)?;
        let min = comm.all_reduce(local_min, ReduceOp::Min)?;
        Ok((max > 1.0 + GLOBAL_TOL, min < -GLOBAL_TOL))
    }

    /// Apply `dvf` to `alpha`, then clamp into `[0, 1]` and snap values
    /// within `snap_tol` of either bound.
    pub fn update_fraction<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        alpha: &mut [Real],
        dvf: &[Real],
        snap_tol: Real,
    ) -> UpdateReport {
        let raw = tentative_fraction(mesh, alpha, dvf);
        let mut report = UpdateReport::default();

        for (c, (a, r)) in alpha.iter_mut().zip(raw).enumerate() {
            let mut value = r.clamp(0.0, 1.0);
            if value != r {
                report.clamp_events += 1;
                log::trace!("cell {c}: fraction {r:.3e} clamped");
            }
            if snap_tol > 0.0 {
                if value > 0.0 && value < snap_tol {
                    value = 0.0;
                    report.snapped_cells += 1;
                } else if value < 1.0 && value > 1.0 - snap_tol {
                    value = 1.0;
                    report.snapped_cells += 1;
                }
            }
            report.mass_change += (value - r).abs() * mesh.cell_volume(c);
            *a = value;
        }
        report
    }
}

/// Push overshoots above `1` out through downwind faces.
#[allow(clippy::too_many_arguments)]
fn bound_from_above<M: MeshTopology + ?Sized>(
    mesh: &M,
    phi: &[Real],
    dt: Real,
    alpha: &[Real],
    dvf: &mut [Real],
    locked: &[bool],
    changed: &mut [bool],
    bounded: &mut [bool],
) {
    let tentative = tentative_fraction(mesh, alpha, dvf);

    for (cell, &a_new) in tentative.iter().enumerate() {
        let vi = mesh.cell_volume(cell);
        if vi < VSMALL || a_new <= 1.0 + CELL_TOL {
            continue;
        }
        let faces = mesh.cell_faces(cell);
        let mut to_pass = (a_new - 1.0) * vi;
        let mut first = true;
        let mut open_faces = 1;
        let mut guard = faces.len() + 2;

        while to_pass / vi > CELL_TOL && open_faces > 0 && guard > 0 {
            guard -= 1;
            let mut candidates = Vec::new();
            let mut total = 0.0;
            for &f in faces {
                let sign = mesh.outward_sign(f, cell);
                let phi_out = sign * phi[f];
                if phi_out <= 0.0 || locked[f] {
                    continue;
                }
                let capacity = (phi_out * dt - sign * dvf[f]).abs();
                if first || capacity / vi > CELL_TOL {
                    candidates.push((f, sign, capacity, phi_out * dt));
                    total += phi_out * dt;
                }
            }
            first = false;
            if candidates.is_empty() || total <= 0.0 {
                break;
            }

            open_faces = 0;
            let budget = to_pass;
            for (f, sign, capacity, weight) in candidates {
                let mut through = budget * weight / total;
                if capacity > through {
                    open_faces += 1;
                } else {
                    through = capacity;
                }
                if through > 0.0 {
                    dvf[f] += sign * through;
                    to_pass -= through;
                    changed[f] = true;
                }
            }
            bounded[cell] = true;
        }
    }
}
