//! Splitting a [`PolyMesh`] into partitions joined by processor patches.
//!
//! Every internal face whose two cells land on different partitions becomes a
//! processor face on both sides. Both sides list their processor faces in
//! ascending global face order, so local face `k` of the patch `r -> q` and
//! local face `k` of the patch `q -> r` are the same global face. The side
//! that holds the global neighbour reverses the point loop and records a flip.

use super::{MeshTopology, Patch, PatchKind, PolyMesh};
use crate::errors::MeshError;
use crate::float_types::Real;
use hashbrown::HashMap;
use nalgebra::Point3;

/// One partition of a decomposed mesh.
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub rank: usize,
    pub mesh: PolyMesh,
    /// Global index of each local cell
    pub cell_map: Vec<usize>,
    /// Global index of each local face
    pub face_map: Vec<usize>,
    /// `true` where the local face is oriented against the global one
    pub face_flip: Vec<bool>,
}

/// Split `mesh` by `cell_partition` (one partition index per cell).
///
/// Partitions are numbered `0..=max(cell_partition)`; each must own at least
/// one cell. Physical patches are kept on every partition (possibly empty)
/// and processor patches follow them, one per neighbouring partition.
pub fn decompose(mesh: &PolyMesh, cell_partition: &[usize]) -> Result<Vec<SubMesh>, MeshError> {
    if cell_partition.len() != mesh.n_cells() {
        return Err(MeshError::Partition(format!(
            "{} partition entries for {} cells",
            cell_partition.len(),
            mesh.n_cells()
        )));
    }
    if mesh.patches().iter().any(Patch::is_processor) {
        return Err(MeshError::Partition(
            "mesh is already decomposed".to_string(),
        ));
    }
    let n_parts = cell_partition.iter().max().map_or(0, |&p| p + 1);
    (0..n_parts)
        .map(|rank| extract(mesh, cell_partition, n_parts, rank))
        .collect()
}

fn extract(
    mesh: &PolyMesh,
    cell_partition: &[usize],
    n_parts: usize,
    rank: usize,
) -> Result<SubMesh, MeshError> {
    let cell_map: Vec<usize> = (0..mesh.n_cells())
        .filter(|&c| cell_partition[c] == rank)
        .collect();
    if cell_map.is_empty() {
        return Err(MeshError::Partition(format!("partition {rank} has no cells")));
    }
    let local_cell: HashMap<usize, usize> = cell_map
        .iter()
        .enumerate()
        .map(|(l, &g)| (g, l))
        .collect();

    let mut local_point: HashMap<usize, usize> = HashMap::new();
    let mut points: Vec<Point3<Real>> = Vec::new();
    let mut faces = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::new();
    let mut face_map = Vec::new();
    let mut face_flip = Vec::new();

    let mut add_face = |global: usize, flip: bool, faces: &mut Vec<Vec<usize>>| {
        let mut loop_: Vec<usize> = mesh
            .face_points(global)
            .iter()
            .map(|&gp| {
                *local_point.entry(gp).or_insert_with(|| {
                    points.push(mesh.points()[gp]);
                    points.len() - 1
                })
            })
            .collect();
        if flip {
            loop_.reverse();
        }
        faces.push(loop_);
        face_map.push(global);
        face_flip.push(flip);
    };

    // internal faces
    for f in 0..mesh.n_internal_faces() {
        let (o, n) = (mesh.owner()[f], mesh.neighbour()[f]);
        if let (Some(&lo), Some(&ln)) = (local_cell.get(&o), local_cell.get(&n)) {
            add_face(f, false, &mut faces);
            owner.push(lo);
            neighbour.push(ln);
        }
    }

    // physical patches
    let mut patches = Vec::new();
    for patch in mesh.patches() {
        let start = faces.len();
        for f in patch.faces() {
            if let Some(&lo) = local_cell.get(&mesh.owner()[f]) {
                add_face(f, false, &mut faces);
                owner.push(lo);
            }
        }
        patches.push(Patch::new(
            patch.name.clone(),
            start,
            faces.len() - start,
            patch.kind.clone(),
        ));
    }

    // processor patches
    for other in (0..n_parts).filter(|&q| q != rank) {
        let start = faces.len();
        let mut neighbour_centres = Vec::new();
        for f in 0..mesh.n_internal_faces() {
            let (o, n) = (mesh.owner()[f], mesh.neighbour()[f]);
            let (po, pn) = (cell_partition[o], cell_partition[n]);
            if po == rank && pn == other {
                add_face(f, false, &mut faces);
                owner.push(local_cell[&o]);
                neighbour_centres.push(mesh.cell_centre(n));
            } else if pn == rank && po == other {
                add_face(f, true, &mut faces);
                owner.push(local_cell[&n]);
                neighbour_centres.push(mesh.cell_centre(o));
            }
        }
        if faces.len() > start {
            patches.push(Patch::new(
                format!("proc{rank}to{other}"),
                start,
                faces.len() - start,
                PatchKind::Processor {
                    neighbour_rank: other,
                    neighbour_centres,
                },
            ));
        }
    }

    let local = PolyMesh::new(points, faces, owner, neighbour, patches)?;
    if local.n_cells() != cell_map.len() {
        return Err(MeshError::Partition(format!(
            "partition {rank} has cells without faces"
        )));
    }
    Ok(SubMesh {
        rank,
        mesh: local,
        cell_map,
        face_map,
        face_flip,
    })
}

impl SubMesh {
    /// Local copy of a global per-cell field.
    pub fn scatter_cells<T: Clone>(&self, global: &[T]) -> Vec<T> {
        self.cell_map.iter().map(|&g| global[g].clone()).collect()
    }

    /// Write a local per-cell field back into the global one.
    pub fn gather_cells<T: Clone>(&self, local: &[T], global: &mut [T]) {
        for (l, &g) in self.cell_map.iter().enumerate() {
            global[g] = local[l].clone();
        }
    }

    /// Local copy of a global signed per-face field (fluxes, transport
    /// volumes). Flipped faces change sign.
    pub fn scatter_faces(&self, global: &[Real]) -> Vec<Real> {
        self.face_map
            .iter()
            .zip(&self.face_flip)
            .map(|(&g, &flip)| if flip { -global[g] } else { global[g] })
            .collect()
    }

    /// Write a local signed per-face field back into the global one.
    pub fn gather_faces(&self, local: &[Real], global: &mut [Real]) {
        for (l, (&g, &flip)) in self.face_map.iter().zip(&self.face_flip).enumerate() {
            global[g] = if flip { -local[l] } else { local[l] };
        }
    }
}
