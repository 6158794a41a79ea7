//! Reconciliation of shared faces and halo cell values across processor
//! patches.
//!
//! A processor face exists once on each side, oriented oppositely. The side
//! holding the upwind cell (local flux `phi > 0`) owns the transported volume
//! and sends it; the other side stores the negated value.

pub mod comm;

pub use comm::{Communicator, Message, ReduceOp, SerialComm, ThreadComm};

use crate::errors::{PlicError, Result};
use crate::float_types::Real;
use crate::mesh::{MeshTopology, Patch};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionSynchronizer;

fn processor_patches<M: MeshTopology + ?Sized>(mesh: &M) -> impl Iterator<Item = (&Patch, usize)> {
    mesh.patches()
        .iter()
        .filter_map(|p| p.neighbour_rank().map(|r| (p, r)))
}

impl PartitionSynchronizer {
    /// Make `dvf` agree on every processor face: the downwind side adopts the
    /// negated value of the upwind side.
    pub fn reconcile<M, C>(&self, mesh: &M, comm: &C, phi: &[Real], dvf: &mut [Real]) -> Result<()>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let mut outgoing = Vec::new();
        let mut starts = Vec::new();
        for (patch, rank) in processor_patches(mesh) {
            let mut msg = Message::default();
            for (local, f) in patch.faces().enumerate() {
                if phi[f] > 0.0 {
                    msg.labels.push(local);
                    msg.values.push(dvf[f]);
                }
            }
            outgoing.push((rank, msg));
            starts.push((patch.start, patch.size));
        }
        if outgoing.is_empty() {
            return Ok(());
        }

        let incoming = comm.exchange(outgoing)?;
        for ((_, msg), (start, size)) in incoming.into_iter().zip(starts) {
            if msg.labels.len() != msg.values.len() {
                return Err(PlicError::Communication(format!(
                    "flux message with {} labels and {} values",
                    msg.labels.len(),
                    msg.values.len()
                )));
            }
            for (local, value) in msg.labels.into_iter().zip(msg.values) {
                if local >= size {
                    return Err(PlicError::Communication(format!(
                        "face label {local} outside a patch of {size} faces"
                    )));
                }
                dvf[start + local] = -value;
            }
        }
        Ok(())
    }

    /// Fill the processor entries of `halo` (indexed by boundary face) with
    /// the remote owner's value of `field`.
    pub fn swap_cell_values<M, C>(&self, mesh: &M, comm: &C, field: &[Real], halo: &mut [Real]) -> Result<()>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let n_internal = mesh.n_internal_faces();
        self.swap(mesh, comm, 1, |f| vec![field[mesh.face_owner(f)]], |f, v| {
            halo[f - n_internal] = v[0];
        })
    }

    /// Vector version of [`swap_cell_values`](Self::swap_cell_values).
    pub fn swap_cell_vectors<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        field: &[Vector3<Real>],
        halo: &mut [Vector3<Real>],
    ) -> Result<()>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
    {
        let n_internal = mesh.n_internal_faces();
        self.swap(
            mesh,
            comm,
            3,
            |f| {
                let v = field[mesh.face_owner(f)];
                vec![v.x, v.y, v.z]
            },
            |f, v| {
                halo[f - n_internal] = Vector3::new(v[0], v[1], v[2]);
            },
        )
    }

    fn swap<M, C, G, S>(&self, mesh: &M, comm: &C, width: usize, get: G, mut set: S) -> Result<()>
    where
        M: MeshTopology + ?Sized,
        C: Communicator + ?Sized,
        G: Fn(usize) -> Vec<Real>,
        S: FnMut(usize, &[Real]),
    {
        let mut outgoing = Vec::new();
        let mut ranges = Vec::new();
        for (patch, rank) in processor_patches(mesh) {
            let msg = Message {
                labels: (0..patch.size).collect(),
                values: patch.faces().flat_map(&get).collect(),
            };
            outgoing.push((rank, msg));
            ranges.push(patch.faces());
        }
        if outgoing.is_empty() {
            return Ok(());
        }

        let incoming = comm.exchange(outgoing)?;
        for ((_, msg), faces) in incoming.into_iter().zip(ranges) {
            if msg.values.len() != faces.len() * width {
                return Err(PlicError::Communication(format!(
                    "halo message with {} values for {} faces",
                    msg.values.len(),
                    faces.len()
                )));
            }
            for (f, chunk) in faces.zip(msg.values.chunks(width)) {
                set(f, chunk);
            }
        }
        Ok(())
    }
}
