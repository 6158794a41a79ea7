//! Interface orientation of mixed cells.
//!
//! The raw normal of a mixed cell is `-∇α/|∇α|`, so it points away from the
//! reference fluid. Smoothing averages it with the raw normals of face
//! neighbours weighted by face area; neighbours that are not mixed carry a
//! zero raw normal and do not contribute.

pub mod gradient;

pub use gradient::{GradientOperator, GreenGaussGradient, LeastSquaresGradient};

use crate::config::GradientScheme;
use crate::float_types::{Real, VSMALL, tolerance};
use crate::mesh::{FaceRef, MeshTopology};
use nalgebra::Vector3;

/// Normals for a list of cells, plus which of them fell back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalEstimate {
    /// Unit normals aligned with the requested cells
    pub normals: Vec<Vector3<Real>>,
    /// `true` where the gradient was too small and a fallback was used
    pub degenerate: Vec<bool>,
}

impl NormalEstimate {
    pub fn n_degenerate(&self) -> usize {
        self.degenerate.iter().filter(|&&d| d).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationEstimator {
    pub scheme: GradientScheme,
    pub smoothing: bool,
}

impl OrientationEstimator {
    pub const fn new(scheme: GradientScheme, smoothing: bool) -> Self {
        OrientationEstimator { scheme, smoothing }
    }

    /// Raw unit normals of `cells`.
    ///
    /// A cell whose gradient is negligible against its size gets
    /// `retained[cell]` if present, otherwise `+z`, and is reported as
    /// degenerate.
    pub fn raw_normals<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        alpha: &[Real],
        boundary_alpha: &[Real],
        cells: &[usize],
        retained: &[Option<Vector3<Real>>],
    ) -> NormalEstimate {
        let grads = self.scheme.gradient(mesh, alpha, boundary_alpha, cells);
        let mut out = NormalEstimate {
            normals: Vec::with_capacity(cells.len()),
            degenerate: Vec::with_capacity(cells.len()),
        };
        for (&cell, grad) in cells.iter().zip(grads) {
            let h = mesh.cell_volume(cell).abs().cbrt();
            let mag = grad.norm();
            if mag * h <= tolerance() || !mag.is_finite() {
                let fallback = retained
                    .get(cell)
                    .copied()
                    .flatten()
                    .unwrap_or_else(Vector3::z);
                log::debug!("cell {cell}: degenerate fraction gradient, using fallback normal");
                out.normals.push(fallback);
                out.degenerate.push(true);
            } else {
                out.normals.push(-grad / mag);
                out.degenerate.push(false);
            }
        }
        out
    }

    /// Area-weighted smoothing of raw normals.
    ///
    /// `raw` is indexed by cell (zero for cells that are not mixed) and
    /// `halo` by boundary face (the remote raw normal on processor faces,
    /// zero elsewhere).
    pub fn smooth<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cells: &[usize],
        raw: &[Vector3<Real>],
        halo: &[Vector3<Real>],
    ) -> Vec<Vector3<Real>> {
        cells
            .iter()
            .map(|&cell| {
                let mut surface = 0.0;
                let mut sum = Vector3::zeros();
                for &f in mesh.cell_faces(cell) {
                    let mag = mesh.mag_sf(f);
                    surface += mag;
                    let nb = match mesh.face_ref(f) {
                        FaceRef::Internal { owner, neighbour } => {
                            raw[if owner == cell { neighbour } else { owner }]
                        },
                        FaceRef::Processor { .. } => halo[f - mesh.n_internal_faces()],
                        FaceRef::Boundary { .. } => Vector3::zeros(),
                    };
                    sum += mag * nb;
                }
                let n = surface * raw[cell] + sum;
                let len = n.norm();
                if len > VSMALL { n / len } else { raw[cell] }
            })
            .collect()
    }
}
