//! Inputs supplied by the flow solver for one timestep.

use crate::errors::{PlicError, Result};
use crate::float_types::Real;
use crate::mesh::MeshTopology;
use nalgebra::{Point3, Vector3};

/// Face fluxes and cell velocities of the current timestep.
#[derive(Debug, Clone, Copy)]
pub struct FlowFields<'a> {
    /// Signed volumetric flux per face, positive from owner to neighbour
    pub phi: &'a [Real],
    /// Cell-centred velocity
    pub u: &'a [Vector3<Real>],
}

impl<'a> FlowFields<'a> {
    pub const fn new(phi: &'a [Real], u: &'a [Vector3<Real>]) -> Self {
        FlowFields { phi, u }
    }

    pub fn validate<M: MeshTopology + ?Sized>(&self, mesh: &M) -> Result<()> {
        if self.phi.len() != mesh.n_faces() {
            return Err(PlicError::FieldSize {
                field: "phi",
                expected: mesh.n_faces(),
                found: self.phi.len(),
            });
        }
        if self.u.len() != mesh.n_cells() {
            return Err(PlicError::FieldSize {
                field: "U",
                expected: mesh.n_cells(),
                found: self.u.len(),
            });
        }
        Ok(())
    }
}

/// Fraction boundary condition of one patch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaBoundary {
    /// Boundary value equals the adjacent cell value
    #[default]
    ZeroGradient,
    /// Fixed boundary value, used for inflow
    FixedValue(Real),
}

/// One condition per patch. Processor patches are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryConditions {
    patches: Vec<AlphaBoundary>,
}

impl BoundaryConditions {
    /// Zero gradient everywhere.
    pub fn zero_gradient<M: MeshTopology + ?Sized>(mesh: &M) -> Self {
        BoundaryConditions {
            patches: vec![AlphaBoundary::ZeroGradient; mesh.patches().len()],
        }
    }

    pub fn with(mut self, patch: usize, condition: AlphaBoundary) -> Self {
        if self.patches.len() <= patch {
            self.patches.resize(patch + 1, AlphaBoundary::ZeroGradient);
        }
        self.patches[patch] = condition;
        self
    }

    pub fn get(&self, patch: usize) -> AlphaBoundary {
        self.patches.get(patch).copied().unwrap_or_default()
    }

    /// Boundary value of the fraction on a physical boundary face.
    pub fn face_value<M: MeshTopology + ?Sized>(&self, mesh: &M, alpha: &[Real], face: usize) -> Real {
        match mesh.boundary_patch(face).map(|p| self.get(p)) {
            Some(AlphaBoundary::FixedValue(v)) => v,
            _ => alpha[mesh.face_owner(face)],
        }
    }
}

/// Face fluxes `U(x_f)·S_f` of an analytic velocity field.
pub fn face_fluxes<M, F>(mesh: &M, velocity: F) -> Vec<Real>
where
    M: MeshTopology + ?Sized,
    F: Fn(&Point3<Real>) -> Vector3<Real>,
{
    (0..mesh.n_faces())
        .map(|f| velocity(&mesh.face_centre(f)).dot(&mesh.face_area_vector(f)))
        .collect()
}

/// Face fluxes of the planar flow `U = (∂ψ/∂y, -∂ψ/∂x, 0)` given by a stream
/// function `ψ(x, y)`.
///
/// The flux through a face is the circulation of `ψ ẑ` around its point
/// loop, so only edges with a `z` extent contribute. Every edge is shared
/// with opposite direction by the faces of a closed cell, which makes the
/// discrete divergence vanish to round-off.
pub fn stream_function_fluxes<M, F>(mesh: &M, psi: F) -> Vec<Real>
where
    M: MeshTopology + ?Sized,
    F: Fn(Real, Real) -> Real,
{
    let points = mesh.points();
    (0..mesh.n_faces())
        .map(|f| {
            let face = mesh.face_points(f);
            let n = face.len();
            (0..n)
                .map(|i| {
                    let p = points[face[i]];
                    let q = points[face[(i + 1) % n]];
                    let dz = q.z - p.z;
                    if dz == 0.0 {
                        0.0
                    } else {
                        psi(0.5 * (p.x + q.x), 0.5 * (p.y + q.y)) * dz
                    }
                })
                .sum()
        })
        .collect()
}

/// Cell velocities of an analytic velocity field.
pub fn cell_velocities<M, F>(mesh: &M, velocity: F) -> Vec<Vector3<Real>>
where
    M: MeshTopology + ?Sized,
    F: Fn(&Point3<Real>) -> Vector3<Real>,
{
    (0..mesh.n_cells())
        .map(|c| velocity(&mesh.cell_centre(c)))
        .collect()
}
