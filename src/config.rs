//! Solver controls.
//!
//! `PlicVofConfig` is plain data. Reading it from a dictionary or file is left
//! to the caller; every field has a default so partial documents deserialize.

use crate::float_types::Real;
use serde::{Deserialize, Serialize};

/// Gradient operator used for interface orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradientScheme {
    /// Linear face interpolation, Gauss divergence theorem
    #[default]
    GreenGauss,
    /// Inverse-distance-squared weighted least squares on face neighbours
    LeastSquares,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlicVofConfig {
    /// Cells with `surf_cell_tol < alpha < 1 - surf_cell_tol` are mixed.
    pub surf_cell_tol: Real,
    /// Limiter passes per sub-cycle.
    pub n_alpha_bounds: usize,
    /// Area-weighted averaging of raw normals with face neighbours.
    pub smoothed_alpha_grad: bool,
    /// Collect interface polygons after each reconstruction.
    pub write_plic_faces: bool,
    /// Largest cell Courant number allowed in one sub-cycle.
    pub max_courant: Real,
    pub max_sub_cycles: usize,
    /// Fractions this close to 0 or 1 are snapped after the update.
    /// `0` disables snapping.
    pub snap_tol: Real,
    /// Relative volume tolerance of the plane fit.
    pub fit_tolerance: Real,
    pub fit_max_iterations: usize,
    pub gradient: GradientScheme,
}

impl Default for PlicVofConfig {
    fn default() -> Self {
        PlicVofConfig {
            surf_cell_tol: 1e-8,
            n_alpha_bounds: 3,
            smoothed_alpha_grad: false,
            write_plic_faces: false,
            max_courant: 0.5,
            max_sub_cycles: 64,
            snap_tol: 0.0,
            fit_tolerance: 1e-10,
            fit_max_iterations: 100,
            gradient: GradientScheme::GreenGauss,
        }
    }
}

impl PlicVofConfig {
    pub const fn with_surf_cell_tol(mut self, tol: Real) -> Self {
        self.surf_cell_tol = tol;
        self
    }

    pub const fn with_n_alpha_bounds(mut self, n: usize) -> Self {
        self.n_alpha_bounds = n;
        self
    }

    pub const fn with_smoothed_alpha_grad(mut self, on: bool) -> Self {
        self.smoothed_alpha_grad = on;
        self
    }

    pub const fn with_write_plic_faces(mut self, on: bool) -> Self {
        self.write_plic_faces = on;
        self
    }

    pub const fn with_max_courant(mut self, co: Real) -> Self {
        self.max_courant = co;
        self
    }

    pub const fn with_max_sub_cycles(mut self, n: usize) -> Self {
        self.max_sub_cycles = n;
        self
    }

    pub const fn with_snap_tol(mut self, tol: Real) -> Self {
        self.snap_tol = tol;
        self
    }

    pub const fn with_fit_tolerance(mut self, tol: Real) -> Self {
        self.fit_tolerance = tol;
        self
    }

    pub const fn with_fit_max_iterations(mut self, n: usize) -> Self {
        self.fit_max_iterations = n;
        self
    }

    pub const fn with_gradient(mut self, scheme: GradientScheme) -> Self {
        self.gradient = scheme;
        self
    }

    /// Number of sub-cycles for a global maximum Courant number `co`.
    pub fn sub_cycles_for(&self, co: Real) -> usize {
        if !(co > 0.0) || !(self.max_courant > 0.0) {
            return 1;
        }
        let n = (co / self.max_courant).ceil();
        if n.is_finite() {
            (n as usize).clamp(1, self.max_sub_cycles.max(1))
        } else {
            self.max_sub_cycles.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_cycle_count_is_clamped() {
        let cfg = PlicVofConfig::default();
        assert_eq!(cfg.sub_cycles_for(0.0), 1);
        assert_eq!(cfg.sub_cycles_for(0.5), 1);
        assert_eq!(cfg.sub_cycles_for(0.51), 2);
        assert_eq!(cfg.sub_cycles_for(1.0), 2);
        assert_eq!(cfg.sub_cycles_for(1e9), 64);
        assert_eq!(cfg.with_max_sub_cycles(4).sub_cycles_for(1e9), 4);
    }

    #[test]
    fn builders_chain() {
        let cfg = PlicVofConfig::default()
            .with_n_alpha_bounds(5)
            .with_gradient(GradientScheme::LeastSquares)
            .with_smoothed_alpha_grad(true);
        assert_eq!(cfg.n_alpha_bounds, 5);
        assert_eq!(cfg.gradient, GradientScheme::LeastSquares);
        assert!(cfg.smoothed_alpha_grad);
    }
}
