//! Mesh access for the advection engine.
//!
//! The engine never owns a mesh. It reads geometry and connectivity through
//! [`MeshTopology`], which follows the owner/neighbour convention: every face
//! has an owner cell, internal faces also have a neighbour, and the face area
//! vector points from owner to neighbour (out of the domain on boundaries).
//!
//! Faces live in one flat index space: `0..n_internal_faces()` are internal,
//! the rest are boundary faces grouped into contiguous [`Patch`]es.
//! [`MeshTopology::face_ref`] resolves an index back to its kind.

use crate::float_types::{Real, VSMALL};
use nalgebra::{Point3, Vector3};

pub mod poly_mesh;
pub mod shapes;

#[cfg(feature = "hashmap")]
pub mod decompose;

pub use poly_mesh::PolyMesh;

/// What lies beyond a group of boundary faces.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchKind {
    /// Generic boundary (inlet, outlet, open)
    Patch,
    /// Impermeable wall
    Wall,
    /// Decomposition boundary shared with another partition. `neighbour_centres`
    /// holds, per face of the patch, the centre of the cell on the other side.
    Processor {
        neighbour_rank: usize,
        neighbour_centres: Vec<Point3<Real>>,
    },
}

/// A contiguous run of boundary faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    /// First face (flat index)
    pub start: usize,
    pub size: usize,
    pub kind: PatchKind,
}

impl Patch {
    pub fn new(name: impl Into<String>, start: usize, size: usize, kind: PatchKind) -> Self {
        Patch {
            name: name.into(),
            start,
            size,
            kind,
        }
    }

    pub const fn faces(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size
    }

    pub const fn is_processor(&self) -> bool {
        matches!(self.kind, PatchKind::Processor { .. })
    }

    pub const fn neighbour_rank(&self) -> Option<usize> {
        match self.kind {
            PatchKind::Processor { neighbour_rank, .. } => Some(neighbour_rank),
            _ => None,
        }
    }
}

/// Reverse lookup of a flat face index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRef {
    Internal {
        owner: usize,
        neighbour: usize,
    },
    /// Physical boundary face, `local` is the position within the patch
    Boundary {
        owner: usize,
        patch: usize,
        local: usize,
    },
    /// Decomposition boundary face
    Processor {
        owner: usize,
        patch: usize,
        local: usize,
        neighbour_rank: usize,
    },
}

impl FaceRef {
    pub const fn owner(&self) -> usize {
        match *self {
            FaceRef::Internal { owner, .. }
            | FaceRef::Boundary { owner, .. }
            | FaceRef::Processor { owner, .. } => owner,
        }
    }
}

/// Narrow, read-only view of a polyhedral finite-volume mesh.
pub trait MeshTopology: Sync {
    fn n_cells(&self) -> usize;
    fn n_faces(&self) -> usize;
    fn n_internal_faces(&self) -> usize;

    fn points(&self) -> &[Point3<Real>];
    /// Point loop of a face, ordered so the right-hand rule gives the
    /// owner-to-neighbour normal.
    fn face_points(&self, face: usize) -> &[usize];
    fn face_owner(&self, face: usize) -> usize;
    /// `None` for boundary faces.
    fn face_neighbour(&self, face: usize) -> Option<usize>;
    fn face_area_vector(&self, face: usize) -> Vector3<Real>;
    fn face_centre(&self, face: usize) -> Point3<Real>;

    fn cell_centre(&self, cell: usize) -> Point3<Real>;
    fn cell_volume(&self, cell: usize) -> Real;
    fn cell_faces(&self, cell: usize) -> &[usize];

    fn patches(&self) -> &[Patch];
    /// Patch index of a boundary face.
    fn boundary_patch(&self, face: usize) -> Option<usize>;

    /// Centre of the cell across `face`: the neighbour cell for internal
    /// faces, the remote cell for processor faces, and the face centre on
    /// physical boundaries.
    fn neighbour_centre(&self, face: usize) -> Point3<Real>;

    /// Incremented by the mesh owner whenever connectivity changes.
    fn topology_version(&self) -> u64 {
        0
    }

    fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_internal_faces()
    }

    fn is_internal(&self, face: usize) -> bool {
        face < self.n_internal_faces()
    }

    fn mag_sf(&self, face: usize) -> Real {
        self.face_area_vector(face).norm()
    }

    fn face_ref(&self, face: usize) -> FaceRef {
        let owner = self.face_owner(face);
        if let Some(neighbour) = self.face_neighbour(face) {
            return FaceRef::Internal { owner, neighbour };
        }
        let patch = self.boundary_patch(face).unwrap_or(0);
        let local = face - self.patches().get(patch).map_or(face, |p| p.start);
        match self.patches().get(patch).and_then(Patch::neighbour_rank) {
            Some(neighbour_rank) => FaceRef::Processor {
                owner,
                patch,
                local,
                neighbour_rank,
            },
            None => FaceRef::Boundary {
                owner,
                patch,
                local,
            },
        }
    }

    /// Owner-side linear interpolation weight, `1` on physical boundaries.
    fn face_weight(&self, face: usize) -> Real {
        if let FaceRef::Boundary { .. } = self.face_ref(face) {
            return 1.0;
        }
        let sf = self.face_area_vector(face);
        let cf = self.face_centre(face);
        let d_own = sf.dot(&(cf - self.cell_centre(self.face_owner(face)))).abs();
        let d_nei = sf.dot(&(self.neighbour_centre(face) - cf)).abs();
        if d_own + d_nei < VSMALL {
            0.5
        } else {
            d_nei / (d_own + d_nei)
        }
    }

    /// `+1` if the area vector of `face` points out of `cell`, `-1` otherwise.
    fn outward_sign(&self, face: usize, cell: usize) -> Real {
        if self.face_owner(face) == cell { 1.0 } else { -1.0 }
    }
}
