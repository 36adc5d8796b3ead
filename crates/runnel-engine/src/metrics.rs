//! Run-level water balance and step counters.
//!
//! [`MassBalance`] accumulates the volumes exchanged by every committed
//! step so that the continuity error can be reported at teardown.

use crate::subcatch::StepFlux;

/// Cumulative volumes over the run, in ft³ or m³.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MassBalance {
    /// Rainfall over all subcatchments.
    pub rainfall: f64,
    /// Infiltration into pervious subareas.
    pub infiltration: f64,
    /// Runoff delivered to outlets.
    pub runoff: f64,
    /// Surface storage when the run started.
    pub initial_storage: f64,
    /// Surface storage after the last committed step.
    pub final_storage: f64,
}

impl MassBalance {
    /// Balance of a run starting with `initial_storage` on the surface.
    pub fn starting_with(initial_storage: f64) -> Self {
        Self {
            initial_storage,
            final_storage: initial_storage,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, flux: &StepFlux, storage: f64) {
        self.rainfall += flux.rainfall;
        self.infiltration += flux.infiltration;
        self.runoff += flux.runoff;
        self.final_storage = storage;
    }

    /// Inflow minus outflow minus storage change, as a percentage of
    /// inflow. Zero when nothing has entered the system.
    pub fn continuity_error_percent(&self) -> f64 {
        let inflow = self.rainfall + self.initial_storage;
        if inflow <= 0.0 {
            return 0.0;
        }
        let outflow = self.infiltration + self.runoff + self.final_storage;
        100.0 * (inflow - outflow) / inflow
    }
}

/// Committed and rejected step counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepCounters {
    /// Steps committed.
    pub committed: u64,
    /// Steps rejected and rolled back.
    pub rolled_back: u64,
}
