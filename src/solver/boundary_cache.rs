//! Interface data kept on boundary faces.
//!
//! When a mixed cell drains through a physical boundary it may become full
//! or empty part way through a timestep. The boundary faces then keep cutting
//! with the last plane of that cell, advanced with its normal velocity,
//! until the timestep ends.

use crate::float_types::Real;
use crate::mesh::MeshTopology;
use crate::plane::Plane;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundarySnapshot {
    pub plane: Plane,
    /// Normal interface velocity `U·n` of the owning cell
    pub un0: Real,
    /// Timestep the snapshot was taken in
    pub step: u64,
    /// Time at which `plane` was valid
    pub time: Real,
}

impl BoundarySnapshot {
    /// The plane moved to time `t`.
    pub fn plane_at(&self, t: Real) -> Plane {
        self.plane.translated(self.un0 * (t - self.time))
    }
}

/// One optional snapshot per boundary face.
#[derive(Debug, Clone, Default)]
pub struct BoundaryInterfaceCache {
    n_internal: usize,
    entries: Vec<Option<BoundarySnapshot>>,
}

impl BoundaryInterfaceCache {
    pub fn new<M: MeshTopology + ?Sized>(mesh: &M) -> Self {
        BoundaryInterfaceCache {
            n_internal: mesh.n_internal_faces(),
            entries: vec![None; mesh.n_boundary_faces()],
        }
    }

    /// Resize for `mesh` and forget everything.
    pub fn reset<M: MeshTopology + ?Sized>(&mut self, mesh: &M) {
        *self = Self::new(mesh);
    }

    pub fn store(&mut self, face: usize, snapshot: BoundarySnapshot) {
        if let Some(slot) = face
            .checked_sub(self.n_internal)
            .and_then(|b| self.entries.get_mut(b))
        {
            *slot = Some(snapshot);
        }
    }

    /// Snapshot of `face` taken during timestep `step`.
    pub fn lookup(&self, face: usize, step: u64) -> Option<&BoundarySnapshot> {
        face.checked_sub(self.n_internal)
            .and_then(|b| self.entries.get(b))
            .and_then(Option::as_ref)
            .filter(|s| s.step == step)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
