//! Cell gradients of the volume fraction.
//!
//! Both operators take the cell field plus one value per boundary face
//! (`boundary[f - n_internal]`): the boundary value on physical patches and
//! the neighbour cell value on processor patches.

use crate::config::GradientScheme;
use crate::float_types::{Real, VSMALL};
use crate::mesh::{FaceRef, MeshTopology};
use nalgebra::{Matrix3, Vector3};

pub trait GradientOperator {
    /// Gradient of `field` at each of `cells`, in that order.
    fn gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cells: &[usize],
    ) -> Vec<Vector3<Real>>;
}

/// Value across `face` as seen from `cell`.
#[inline]
fn across<M: MeshTopology + ?Sized>(
    mesh: &M,
    field: &[Real],
    boundary: &[Real],
    face: usize,
    cell: usize,
) -> Real {
    match mesh.face_ref(face) {
        FaceRef::Internal { owner, neighbour } => {
            if owner == cell {
                field[neighbour]
            } else {
                field[owner]
            }
        },
        _ => boundary[face - mesh.n_internal_faces()],
    }
}

/// ∇φ ≈ (1/V) Σ_f φ_f S_f with linear face interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenGaussGradient;

impl GreenGaussGradient {
    fn cell_gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cell: usize,
    ) -> Vector3<Real> {
        let volume = mesh.cell_volume(cell);
        if volume < VSMALL {
            return Vector3::zeros();
        }
        let mut sum = Vector3::zeros();
        for &f in mesh.cell_faces(cell) {
            let other = across(mesh, field, boundary, f, cell);
            let phi_f = match mesh.face_ref(f) {
                FaceRef::Boundary { .. } => other,
                _ => {
                    let w = mesh.face_weight(f);
                    // w is the owner-side weight
                    if mesh.face_owner(f) == cell {
                        w * field[cell] + (1.0 - w) * other
                    } else {
                        w * other + (1.0 - w) * field[cell]
                    }
                },
            };
            sum += mesh.outward_sign(f, cell) * phi_f * mesh.face_area_vector(f);
        }
        sum / volume
    }
}

impl GradientOperator for GreenGaussGradient {
    fn gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cells: &[usize],
    ) -> Vec<Vector3<Real>> {
        cells
            .iter()
            .map(|&c| self.cell_gradient(mesh, field, boundary, c))
            .collect()
    }
}

/// Weighted least squares over face neighbours, weights `1/|d|²`.
///
/// Physical boundary faces contribute a point at the face centre carrying the
/// boundary value. A singular normal matrix (too few independent directions)
/// falls back to the pseudo-inverse.
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresGradient {
    det_min: Real,
}

impl Default for LeastSquaresGradient {
    fn default() -> Self {
        Self { det_min: 1e-12 }
    }
}

impl LeastSquaresGradient {
    fn cell_gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cell: usize,
    ) -> Vector3<Real> {
        let cc = mesh.cell_centre(cell);
        let phi_c = field[cell];
        let mut m = Matrix3::zeros();
        let mut rhs = Vector3::zeros();

        for &f in mesh.cell_faces(cell) {
            let far = match mesh.face_ref(f) {
                FaceRef::Internal { owner, neighbour } => {
                    mesh.cell_centre(if owner == cell { neighbour } else { owner })
                },
                _ => mesh.neighbour_centre(f),
            };
            let d = far - cc;
            let dist_sq = d.norm_squared();
            if dist_sq < VSMALL {
                continue;
            }
            let w = 1.0 / dist_sq;
            m += w * d * d.transpose();
            rhs += w * d * (across(mesh, field, boundary, f, cell) - phi_c);
        }

        // normalise so the determinant check is scale free
        let scale = m.trace();
        if scale < VSMALL {
            return Vector3::zeros();
        }
        let m_n = m / scale;
        if m_n.determinant().abs() > self.det_min {
            if let Some(inv) = m_n.try_inverse() {
                return inv * rhs / scale;
            }
        }
        m_n.pseudo_inverse(self.det_min)
            .map(|pinv| pinv * rhs / scale)
            .unwrap_or_else(|_| Vector3::zeros())
    }
}

impl GradientOperator for LeastSquaresGradient {
    fn gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cells: &[usize],
    ) -> Vec<Vector3<Real>> {
        cells
            .iter()
            .map(|&c| self.cell_gradient(mesh, field, boundary, c))
            .collect()
    }
}

impl GradientOperator for GradientScheme {
    fn gradient<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        field: &[Real],
        boundary: &[Real],
        cells: &[usize],
    ) -> Vec<Vector3<Real>> {
        match self {
            GradientScheme::GreenGauss => GreenGaussGradient.gradient(mesh, field, boundary, cells),
            GradientScheme::LeastSquares => {
                LeastSquaresGradient::default().gradient(mesh, field, boundary, cells)
            },
        }
    }
}
