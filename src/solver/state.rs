//! Per-cell classification and mixed-cell storage.

use crate::float_types::Real;
use crate::plane::Plane;
use nalgebra::Vector3;
use serde::Serialize;

/// Where a solver instance is within a timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Stage {
    #[default]
    Idle,
    Classified,
    Oriented,
    Reconstructed,
    /// Inside the sub-cycle loop
    Advected,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CellStatus {
    #[default]
    Empty,
    Mixed,
    Full,
}

impl CellStatus {
    /// Status of a cell holding `alpha` with the mixed band
    /// `(tol, 1 - tol)`. Cells too small to cut go by `alpha >= 0.5`.
    pub fn classify(alpha: Real, tol: Real, degenerate: bool) -> Self {
        if degenerate {
            if alpha >= 0.5 {
                CellStatus::Full
            } else {
                CellStatus::Empty
            }
        } else if alpha <= tol {
            CellStatus::Empty
        } else if alpha >= 1.0 - tol {
            CellStatus::Full
        } else {
            CellStatus::Mixed
        }
    }
}

/// Dense per-mixed-cell arrays keyed by a compacted index.
#[derive(Debug, Clone, Default)]
pub struct MixedCells {
    pub cells: Vec<usize>,
    pub normals: Vec<Vector3<Real>>,
    pub planes: Vec<Plane>,
    pub degenerate: Vec<bool>,
    /// Cell to compacted index
    index: Vec<Option<usize>>,
}

impl MixedCells {
    pub fn from_status(status: &[CellStatus]) -> Self {
        let mut index = vec![None; status.len()];
        let cells: Vec<usize> = status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == CellStatus::Mixed)
            .map(|(c, _)| c)
            .collect();
        for (i, &c) in cells.iter().enumerate() {
            index[c] = Some(i);
        }
        MixedCells {
            cells,
            index,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index_of(&self, cell: usize) -> Option<usize> {
        self.index.get(cell).copied().flatten()
    }

    /// Reconstructed plane of `cell`, if it is mixed and reconstructed.
    pub fn plane_of(&self, cell: usize) -> Option<Plane> {
        self.index_of(cell).and_then(|i| self.planes.get(i).copied())
    }
}
