//! Traits for the per-cell and per-face kernels.

use crate::cut_cell::{PlaneFit, PlaneFitter};
use crate::cut_face::FaceClipper;
use crate::float_types::Real;
use crate::mesh::MeshTopology;
use crate::plane::Plane;
use nalgebra::Vector3;

/// One face to cut: the upwind interface plane, how far it moves during the
/// sub-interval, and the total volume `phi·dt` crossing the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutJob {
    pub face: usize,
    pub plane: Plane,
    pub sweep: Real,
    pub flux_volume: Real,
}

pub trait KernelOps {
    /// Fit one plane per cell in `cells`, with normals aligned to `cells`
    /// and fractions indexed by cell.
    fn fit_planes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        fitter: &PlaneFitter,
        cells: &[usize],
        normals: &[Vector3<Real>],
        alpha: &[Real],
    ) -> Vec<PlaneFit>;

    /// Transported reference-fluid volume of each job, in job order.
    fn transport_volumes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        clipper: &FaceClipper,
        jobs: &[CutJob],
    ) -> Vec<Real>;
}
