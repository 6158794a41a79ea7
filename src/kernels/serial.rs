//! Serial implementations of the kernels.

use super::traits::{CutJob, KernelOps};
use crate::cut_cell::{CellPolyhedron, PlaneFit, PlaneFitter};
use crate::cut_face::{FaceClipper, FacePolygon};
use crate::float_types::Real;
use crate::mesh::MeshTopology;
use nalgebra::Vector3;

/// Serial implementation of `KernelOps`.
#[derive(Debug, Clone, Copy)]
pub struct SerialKernelOps;

impl Default for SerialKernelOps {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialKernelOps {
    pub const fn new() -> Self {
        Self
    }
}

impl KernelOps for SerialKernelOps {
    fn fit_planes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        fitter: &PlaneFitter,
        cells: &[usize],
        normals: &[Vector3<Real>],
        alpha: &[Real],
    ) -> Vec<PlaneFit> {
        cells
            .iter()
            .zip(normals)
            .map(|(&c, n)| fitter.fit(&CellPolyhedron::from_mesh(mesh, c), *n, alpha[c]))
            .collect()
    }

    fn transport_volumes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        clipper: &FaceClipper,
        jobs: &[CutJob],
    ) -> Vec<Real> {
        jobs.iter()
            .map(|job| {
                let face = FacePolygon::from_mesh(mesh, job.face);
                clipper.integrate(&face, &job.plane, job.sweep, job.flux_volume)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PolyMesh;
    use crate::plane::Plane;
    use nalgebra::Point3;

    #[test]
    fn fits_every_requested_cell() {
        let mesh = PolyMesh::hex_block([2, 1, 1], Point3::origin(), Point3::new(2.0, 1.0, 1.0)).unwrap();
        let alpha = vec![0.25, 0.75];
        let fits = SerialKernelOps::new().fit_planes(
            &mesh,
            &PlaneFitter::default(),
            &[0, 1],
            &[Vector3::z(), Vector3::z()],
            &alpha,
        );
        assert!((fits[0].plane.w - 0.25).abs() < 1e-12);
        assert!((fits[1].plane.w - 0.75).abs() < 1e-12);
    }

    #[test]
    fn cuts_the_shared_face() {
        let mesh = PolyMesh::hex_block([2, 1, 1], Point3::origin(), Point3::new(2.0, 1.0, 1.0)).unwrap();
        let job = CutJob {
            face: 0,
            plane: Plane::from_normal(Vector3::z(), 0.5),
            sweep: 0.0,
            flux_volume: 0.4,
        };
        let v = SerialKernelOps::new().transport_volumes(&mesh, &FaceClipper, &[job]);
        assert!((v[0] - 0.2).abs() < 1e-14);
    }
}
