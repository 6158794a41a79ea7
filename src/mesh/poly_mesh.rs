//! Owner/neighbour polyhedral mesh with precomputed geometry.

use super::{MeshTopology, Patch, PatchKind};
use crate::errors::MeshError;
use crate::float_types::{Real, VSMALL};
use crate::polygon;
use nalgebra::{Point3, Vector3};

/// Polyhedral mesh in owner/neighbour form.
///
/// Faces `0..neighbour.len()` are internal. The remaining faces belong to
/// `patches`, which must tile them in order without gaps.
#[derive(Debug, Clone)]
pub struct PolyMesh {
    points: Vec<Point3<Real>>,
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,

    n_cells: usize,
    cell_faces: Vec<Vec<usize>>,
    face_patch: Vec<usize>,

    face_centres: Vec<Point3<Real>>,
    face_areas: Vec<Vector3<Real>>,
    cell_centres: Vec<Point3<Real>>,
    cell_volumes: Vec<Real>,

    version: u64,
}

impl PolyMesh {
    /// Validate connectivity and compute geometry.
    pub fn new(
        points: Vec<Point3<Real>>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
    ) -> Result<Self, MeshError> {
        if owner.len() != faces.len() {
            return Err(MeshError::FaceCount(format!(
                "{} faces but {} owners",
                faces.len(),
                owner.len()
            )));
        }
        if neighbour.len() > faces.len() {
            return Err(MeshError::FaceCount(format!(
                "{} neighbours for {} faces",
                neighbour.len(),
                faces.len()
            )));
        }
        for (face, loop_) in faces.iter().enumerate() {
            if loop_.len() < 3 {
                return Err(MeshError::TooFewPoints { face });
            }
            if let Some(&index) = loop_.iter().find(|&&p| p >= points.len()) {
                return Err(MeshError::PointIndex { face, index });
            }
        }

        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map_or(0, |&c| c + 1);

        // owners and neighbours are in range by construction of n_cells, but a
        // face must not connect a cell to itself
        for (face, (&o, &n)) in owner.iter().zip(neighbour.iter()).enumerate() {
            if o == n {
                return Err(MeshError::NeighbourIndex { face, cell: n });
            }
        }

        let n_internal = neighbour.len();
        let mut expected = n_internal;
        let mut face_patch = vec![0; faces.len() - n_internal];
        for (pi, patch) in patches.iter().enumerate() {
            if patch.start != expected {
                return Err(MeshError::PatchRange {
                    name: patch.name.clone(),
                    start: patch.start,
                    end: patch.start + patch.size,
                    expected,
                });
            }
            if let PatchKind::Processor {
                neighbour_centres, ..
            } = &patch.kind
            {
                if neighbour_centres.len() != patch.size {
                    return Err(MeshError::FaceCount(format!(
                        "processor patch `{}` has {} faces but {} neighbour centres",
                        patch.name,
                        patch.size,
                        neighbour_centres.len()
                    )));
                }
            }
            expected += patch.size;
            if expected > faces.len() {
                return Err(MeshError::PatchRange {
                    name: patch.name.clone(),
                    start: patch.start,
                    end: expected,
                    expected: patch.start,
                });
            }
            for f in patch.faces() {
                face_patch[f - n_internal] = pi;
            }
        }
        if expected != faces.len() {
            return Err(MeshError::FaceCount(format!(
                "patches end at face {expected}, mesh has {} faces",
                faces.len()
            )));
        }

        let mut cell_faces = vec![Vec::new(); n_cells];
        for (f, &o) in owner.iter().enumerate() {
            cell_faces[o].push(f);
        }
        for (f, &n) in neighbour.iter().enumerate() {
            cell_faces[n].push(f);
        }
        for cf in &mut cell_faces {
            cf.sort_unstable();
        }

        let mut mesh = PolyMesh {
            points,
            faces,
            owner,
            neighbour,
            patches,
            n_cells,
            cell_faces,
            face_patch,
            face_centres: Vec::new(),
            face_areas: Vec::new(),
            cell_centres: Vec::new(),
            cell_volumes: Vec::new(),
            version: 0,
        };
        mesh.update_geometry();
        Ok(mesh)
    }

    fn update_geometry(&mut self) {
        let (centres, areas): (Vec<_>, Vec<_>) = self
            .faces
            .iter()
            .map(|f| {
                let loop_: Vec<Point3<Real>> = f.iter().map(|&p| self.points[p]).collect();
                polygon::centre_and_area(&loop_)
            })
            .unzip();
        self.face_centres = centres;
        self.face_areas = areas;

        // cell centre estimate from face centres
        let mut estimate = vec![Vector3::zeros(); self.n_cells];
        for (c, faces) in self.cell_faces.iter().enumerate() {
            for &f in faces {
                estimate[c] += self.face_centres[f].coords;
            }
            if !faces.is_empty() {
                estimate[c] /= faces.len() as Real;
            }
        }

        // pyramid decomposition about the estimate
        let mut vol3 = vec![0.0; self.n_cells];
        let mut ctr = vec![Vector3::zeros(); self.n_cells];
        for f in 0..self.faces.len() {
            let cf = self.face_centres[f].coords;
            let sf = self.face_areas[f];
            let o = self.owner[f];
            let pyr = sf.dot(&(cf - estimate[o]));
            vol3[o] += pyr;
            ctr[o] += pyr * (0.75 * cf + 0.25 * estimate[o]);

            if let Some(&n) = self.neighbour.get(f) {
                let pyr = sf.dot(&(estimate[n] - cf));
                vol3[n] += pyr;
                ctr[n] += pyr * (0.75 * cf + 0.25 * estimate[n]);
            }
        }

        self.cell_centres = (0..self.n_cells)
            .map(|c| {
                if vol3[c].abs() > VSMALL {
                    Point3::from(ctr[c] / vol3[c])
                } else {
                    Point3::from(estimate[c])
                }
            })
            .collect();
        self.cell_volumes = vol3.into_iter().map(|v| v / 3.0).collect();
    }

    /// Signal a connectivity change to solvers holding per-cell caches.
    pub const fn bump_topology(&mut self) {
        self.version += 1;
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    /// Index of the patch called `name`.
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// Sum of cell volumes.
    pub fn total_volume(&self) -> Real {
        self.cell_volumes.iter().sum()
    }
}

impl MeshTopology for PolyMesh {
    fn n_cells(&self) -> usize {
        self.n_cells
    }

    fn n_faces(&self) -> usize {
        self.faces.len()
    }

    fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    fn points(&self) -> &[Point3<Real>] {
        &self.points
    }

    fn face_points(&self, face: usize) -> &[usize] {
        &self.faces[face]
    }

    fn face_owner(&self, face: usize) -> usize {
        self.owner[face]
    }

    fn face_neighbour(&self, face: usize) -> Option<usize> {
        self.neighbour.get(face).copied()
    }

    fn face_area_vector(&self, face: usize) -> Vector3<Real> {
        self.face_areas[face]
    }

    fn face_centre(&self, face: usize) -> Point3<Real> {
        self.face_centres[face]
    }

    fn cell_centre(&self, cell: usize) -> Point3<Real> {
        self.cell_centres[cell]
    }

    fn cell_volume(&self, cell: usize) -> Real {
        self.cell_volumes[cell]
    }

    fn cell_faces(&self, cell: usize) -> &[usize] {
        &self.cell_faces[cell]
    }

    fn patches(&self) -> &[Patch] {
        &self.patches
    }

    fn boundary_patch(&self, face: usize) -> Option<usize> {
        face.checked_sub(self.neighbour.len())
            .and_then(|b| self.face_patch.get(b).copied())
    }

    fn neighbour_centre(&self, face: usize) -> Point3<Real> {
        if let Some(&n) = self.neighbour.get(face) {
            return self.cell_centres[n];
        }
        match self.boundary_patch(face).map(|p| &self.patches[p]) {
            Some(Patch {
                start,
                kind: PatchKind::Processor {
                    neighbour_centres, ..
                },
                ..
            }) => neighbour_centres[face - start],
            _ => self.face_centres[face],
        }
    }

    fn topology_version(&self) -> u64 {
        self.version
    }
}
