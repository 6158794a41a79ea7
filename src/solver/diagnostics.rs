//! Cumulative counters and timers of a solver instance.

use crate::float_types::Real;
use serde::Serialize;
use std::time::Duration;

/// Reset only when the solver is rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub orientation_time: Duration,
    pub reconstruction_time: Duration,
    pub advection_time: Duration,
    /// Global reference-fluid volume at construction
    pub mass_total_ini: Real,
    /// Global volume created or destroyed by clamping and snapping
    pub mass_conservation_error: Real,
    pub plane_fit_failures: usize,
    pub limiter_unconverged: usize,
    pub clamp_events: usize,
    pub snapped_cells: usize,
    pub degenerate_normals: usize,
    pub time_steps: usize,
    pub sub_cycles: usize,
}

impl Diagnostics {
    pub fn vof_solving_time(&self) -> Duration {
        self.orientation_time + self.reconstruction_time + self.advection_time
    }

    /// Conservation error relative to the initial volume.
    pub fn relative_mass_error(&self) -> Real {
        if self.mass_total_ini > 0.0 {
            self.mass_conservation_error / self.mass_total_ini
        } else {
            self.mass_conservation_error
        }
    }
}

/// What one call to `advect` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdvectionReport {
    /// Global maximum cell Courant number
    pub courant: Real,
    pub sub_cycles: usize,
    /// Mixed cells of this partition at the last reconstruction
    pub mixed_cells: usize,
    pub limiter_passes: usize,
    pub clamp_events: usize,
    /// Global volume change from clamping during this timestep
    pub mass_change: Real,
}
