//! Parallel implementations of the kernels.

use super::traits::{CutJob, KernelOps};
use crate::cut_cell::{CellPolyhedron, PlaneFit, PlaneFitter};
use crate::cut_face::{FaceClipper, FacePolygon};
use crate::float_types::Real;
use crate::mesh::MeshTopology;
use nalgebra::Vector3;
use rayon::prelude::*;

/// Parallel implementation of `KernelOps`.
///
/// Results are collected in input order, so they are identical to the
/// serial ones.
#[derive(Debug, Clone, Copy)]
pub struct ParallelKernelOps;

impl Default for ParallelKernelOps {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelKernelOps {
    pub const fn new() -> Self {
        Self
    }
}

impl KernelOps for ParallelKernelOps {
    fn fit_planes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        fitter: &PlaneFitter,
        cells: &[usize],
        normals: &[Vector3<Real>],
        alpha: &[Real],
    ) -> Vec<PlaneFit> {
        cells
            .par_iter()
            .zip(normals.par_iter())
            .map(|(&c, n)| fitter.fit(&CellPolyhedron::from_mesh(mesh, c), *n, alpha[c]))
            .collect()
    }

    fn transport_volumes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        clipper: &FaceClipper,
        jobs: &[CutJob],
    ) -> Vec<Real> {
        jobs.par_iter()
            .map(|job| {
                let face = FacePolygon::from_mesh(mesh, job.face);
                clipper.integrate(&face, &job.plane, job.sweep, job.flux_volume)
            })
            .collect()
    }
}
