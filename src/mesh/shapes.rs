//! Structured box meshes.

use super::{Patch, PatchKind, PolyMesh};
use crate::errors::MeshError;
use crate::float_types::Real;
use nalgebra::Point3;

/// Names of the six patches of a [`PolyMesh::hex_block`], in face order.
pub const BLOCK_PATCHES: [&str; 6] = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];

/// Linear index of cell `(i, j, k)` in a block of `n` cells.
pub const fn block_cell(n: [usize; 3], i: usize, j: usize, k: usize) -> usize {
    i + n[0] * (j + n[1] * k)
}

impl PolyMesh {
    /// Axis-aligned block of `n[0] × n[1] × n[2]` hexahedra spanning
    /// `min..max`.
    ///
    /// Cell `(i, j, k)` has index [`block_cell`]. Internal faces come x-normal
    /// first, then y, then z, each oriented along the positive axis. All six
    /// boundary patches are walls.
    ///
    /// ```rust
    /// # use plicvof::mesh::{MeshTopology, PolyMesh};
    /// # use nalgebra::Point3;
    /// let mesh = PolyMesh::hex_block([4, 2, 1], Point3::origin(), Point3::new(2.0, 1.0, 0.5)).unwrap();
    /// assert_eq!(mesh.n_cells(), 8);
    /// assert!((mesh.cell_volume(0) - 0.125).abs() < 1e-14);
    /// ```
    pub fn hex_block(n: [usize; 3], min: Point3<Real>, max: Point3<Real>) -> Result<PolyMesh, MeshError> {
        let [nx, ny, nz] = n;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(MeshError::FaceCount(format!("block of {nx}x{ny}x{nz} cells")));
        }

        let p = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
        let c = |i: usize, j: usize, k: usize| block_cell(n, i, j, k);

        let span = max - min;
        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    points.push(Point3::new(
                        min.x + span.x * i as Real / nx as Real,
                        min.y + span.y * j as Real / ny as Real,
                        min.z + span.z * k as Real / nz as Real,
                    ));
                }
            }
        }

        // quads with +x, +y and +z normals at lattice point (i, j, k)
        let x_quad = |i: usize, j: usize, k: usize| vec![p(i, j, k), p(i, j + 1, k), p(i, j + 1, k + 1), p(i, j, k + 1)];
        let y_quad = |i: usize, j: usize, k: usize| vec![p(i, j, k), p(i, j, k + 1), p(i + 1, j, k + 1), p(i + 1, j, k)];
        let z_quad = |i: usize, j: usize, k: usize| vec![p(i, j, k), p(i + 1, j, k), p(i + 1, j + 1, k), p(i, j + 1, k)];
        let reversed = |mut f: Vec<usize>| {
            f.reverse();
            f
        };

        let mut faces = Vec::new();
        let mut owner = Vec::new();
        let mut neighbour = Vec::new();

        for k in 0..nz {
            for j in 0..ny {
                for i in 1..nx {
                    faces.push(x_quad(i, j, k));
                    owner.push(c(i - 1, j, k));
                    neighbour.push(c(i, j, k));
                }
            }
        }
        for k in 0..nz {
            for j in 1..ny {
                for i in 0..nx {
                    faces.push(y_quad(i, j, k));
                    owner.push(c(i, j - 1, k));
                    neighbour.push(c(i, j, k));
                }
            }
        }
        for k in 1..nz {
            for j in 0..ny {
                for i in 0..nx {
                    faces.push(z_quad(i, j, k));
                    owner.push(c(i, j, k - 1));
                    neighbour.push(c(i, j, k));
                }
            }
        }

        let mut patches = Vec::with_capacity(6);
        let wall = |name: usize, start: usize, end: usize| {
            Patch::new(BLOCK_PATCHES[name], start, end - start, PatchKind::Wall)
        };

        let mark = faces.len();
        for k in 0..nz {
            for j in 0..ny {
                faces.push(reversed(x_quad(0, j, k)));
                owner.push(c(0, j, k));
            }
        }
        patches.push(wall(0, mark, faces.len()));

        let mark = faces.len();
        for k in 0..nz {
            for j in 0..ny {
                faces.push(x_quad(nx, j, k));
                owner.push(c(nx - 1, j, k));
            }
        }
        patches.push(wall(1, mark, faces.len()));

        let mark = faces.len();
        for k in 0..nz {
            for i in 0..nx {
                faces.push(reversed(y_quad(i, 0, k)));
                owner.push(c(i, 0, k));
            }
        }
        patches.push(wall(2, mark, faces.len()));

        let mark = faces.len();
        for k in 0..nz {
            for i in 0..nx {
                faces.push(y_quad(i, ny, k));
                owner.push(c(i, ny - 1, k));
            }
        }
        patches.push(wall(3, mark, faces.len()));

        let mark = faces.len();
        for j in 0..ny {
            for i in 0..nx {
                faces.push(reversed(z_quad(i, j, 0)));
                owner.push(c(i, j, 0));
            }
        }
        patches.push(wall(4, mark, faces.len()));

        let mark = faces.len();
        for j in 0..ny {
            for i in 0..nx {
                faces.push(z_quad(i, j, nz));
                owner.push(c(i, j, nz - 1));
            }
        }
        patches.push(wall(5, mark, faces.len()));

        PolyMesh::new(points, faces, owner, neighbour, patches)
    }
}
