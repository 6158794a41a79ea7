use core::str::FromStr;
use std::sync::OnceLock;

// Our Real scalar type:
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

/// Machine epsilon of the active `Real`.
#[cfg(feature = "f32")]
pub const EPSILON: Real = f32::EPSILON;
/// Machine epsilon of the active `Real`.
#[cfg(feature = "f64")]
pub const EPSILON: Real = f64::EPSILON;

// Pi
#[cfg(feature = "f32")]
pub const PI: Real = core::f32::consts::PI;
#[cfg(feature = "f64")]
pub const PI: Real = core::f64::consts::PI;

/// Smallest measure treated as non-degenerate (cell volumes, face areas,
/// gradient magnitudes scaled by cell size).
#[cfg(feature = "f32")]
pub const VSMALL: Real = 1e-30;
/// Smallest measure treated as non-degenerate (cell volumes, face areas,
/// gradient magnitudes scaled by cell size).
#[cfg(feature = "f64")]
pub const VSMALL: Real = 1e-300;

/// Lazily-initialized geometric tolerance used across the crate.
/// Defaults depend on precision (`f32` vs `f64`), but can be overridden:
///  1) **Build-time**: set env var `PLICVOF_TOLERANCE` (e.g. `PLICVOF_TOLERANCE=1e-10 cargo build`)
///  2) **Runtime**: call [`set_tolerance`] once before using the library
static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

#[inline]
fn default_tolerance() -> Real {
    #[cfg(feature = "f32")]
    {
        1e-5
    }
    #[cfg(feature = "f64")]
    {
        1e-12
    }
}

/// Returns the current geometric tolerance.
/// If not set yet, it tries `PLICVOF_TOLERANCE` (parsed as the active `Real`) and
/// falls back to a sensible default.
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        if let Some(environment_variable) = option_env!("PLICVOF_TOLERANCE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.max(Real::EPSILON);
            }
        }
        default_tolerance()
    })
}

/// Set the tolerance programmatically once (subsequent calls are ignored).
/// Call near program start: `plicvof::float_types::set_tolerance(1e-10);`
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}
