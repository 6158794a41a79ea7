//! Error types
//!
//! Nothing inside the numerical core is fatal: non-convergence, bounding
//! violations and degenerate geometry degrade to counters in
//! [`Diagnostics`](crate::solver::Diagnostics). The errors below are raised
//! only at the API boundary.

use crate::io::IoError;
use crate::solver::Stage;

/// Crate-level result type.
pub type Result<T> = std::result::Result<T, PlicError>;

/// Everything the public API can refuse.
#[derive(Debug, thiserror::Error)]
pub enum PlicError {
    /// (FieldSize) A supplied field does not match the mesh it is used with
    #[error("(FieldSize) field `{field}` has {found} entries, the mesh needs {expected}")]
    FieldSize {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    /// (InvalidMesh) The mesh description is inconsistent
    #[error("(InvalidMesh) {0}")]
    InvalidMesh(#[from] MeshError),
    /// (Communication) The exchange layer failed (peer hung up, bad message)
    #[error("(Communication) {0}")]
    Communication(String),
    /// (StageOrder) A step-wise call came before the stage it builds on
    #[error("(StageOrder) `{operation}` needs stage {expected:?}, the solver is at {found:?}")]
    StageOrder {
        operation: &'static str,
        expected: Stage,
        found: Stage,
    },
    /// (Io) Writing diagnostic output failed
    #[error("(Io) {0}")]
    Io(#[from] IoError),
}

/// Mesh construction issues
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// (TooFewPoints) A face has fewer than three points
    #[error("(TooFewPoints) face {face} has fewer than three points")]
    TooFewPoints { face: usize },
    /// (PointIndex) A face references a point that does not exist
    #[error("(PointIndex) face {face} references point {index} which is out of range")]
    PointIndex { face: usize, index: usize },
    /// (OwnerIndex) A face owner is not a valid cell
    #[error("(OwnerIndex) face {face} is owned by cell {cell} which is out of range")]
    OwnerIndex { face: usize, cell: usize },
    /// (NeighbourIndex) An internal face neighbour is not a valid cell
    #[error("(NeighbourIndex) face {face} has neighbour {cell} which is out of range")]
    NeighbourIndex { face: usize, cell: usize },
    /// (FaceCount) Owner/neighbour lists disagree with the face list
    #[error("(FaceCount) {0}")]
    FaceCount(String),
    /// (PatchRange) Patches do not tile the boundary faces exactly
    #[error("(PatchRange) patch `{name}` covers faces {start}..{end}, expected to start at {expected}")]
    PatchRange {
        name: String,
        start: usize,
        end: usize,
        expected: usize,
    },
    /// (Partition) The cell-to-partition map is unusable
    #[error("(Partition) {0}")]
    Partition(String),
}
