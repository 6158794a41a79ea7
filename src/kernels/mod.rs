//! Data-parallel loops of the reconstruction and advection stages.
//!
//! Plane fitting over mixed cells and face cutting over upwind-mixed faces
//! are independent per item. [`SerialKernelOps`] always exists;
//! [`ParallelKernelOps`] spreads the same loops over rayon when the
//! `parallel` feature is enabled. [`DefaultKernels`] picks one.

pub mod serial;
pub mod traits;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use serial::SerialKernelOps;
pub use traits::{CutJob, KernelOps};

#[cfg(feature = "parallel")]
pub use parallel::ParallelKernelOps;

#[cfg(not(feature = "parallel"))]
pub type DefaultKernels = SerialKernelOps;

#[cfg(feature = "parallel")]
pub type DefaultKernels = ParallelKernelOps;
