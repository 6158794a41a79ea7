//! Geometric **PLIC volume-of-fluid** advection on unstructured polyhedral meshes.
//!
//! Every mixed cell carries a planar interface (Piecewise Linear Interface
//! Calculation) whose orientation comes from the fraction gradient and whose
//! position encloses exactly the cell's volume fraction. Face transport
//! volumes are integrated geometrically from the upwind interface as it sweeps
//! over the face, then limited so the fraction stays within `[0, 1]`.
//!
//! The entry point is [`PlicVofSolver`], which advances the fraction field of
//! one mesh partition per call to [`PlicVofSolver::advect`]. Partitions talk
//! through a [`sync::Communicator`]; [`sync::SerialComm`] covers the
//! single-partition case and [`sync::ThreadComm`] runs partitions on threads.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//! - [**stl-io**](https://en.wikipedia.org/wiki/STL_(file_format)): `.stl` export of interface polygons
//! - **hashmap**: enables use of hashbrown for domain decomposition
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon for plane fitting and face cutting

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod config;
pub mod cut_cell;
pub mod cut_face;
pub mod errors;
pub mod fields;
pub mod float_types;
pub mod io;
pub mod kernels;
pub mod limiter;
pub mod mesh;
pub mod orientation;
pub mod plane;
pub mod polygon;
pub mod solver;
pub mod sync;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use config::{GradientScheme, PlicVofConfig};
pub use errors::{MeshError, PlicError, Result};
pub use plane::Plane;
pub use polygon::Polygon;
pub use solver::PlicVofSolver;
