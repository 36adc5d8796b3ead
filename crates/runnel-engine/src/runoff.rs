//! The runoff engine: all subcatchments advanced in lockstep.
//!
//! Each call to [`RunoffEngine::step`] is atomic. New state is computed
//! into a preallocated staging buffer and only swapped in when every
//! subcatchment stepped cleanly; a rejected step leaves the engine exactly
//! as it was, including its clock. The step path performs no heap
//! allocation except when building an error.

use runnel_core::StepError;
use runnel_model::Model;

use crate::config::{ConfigError, EngineConfig};
use crate::metrics::{MassBalance, StepCounters};
use crate::subcatch::{StepFlux, SubcatchState, SubcatchmentRunoff};
use crate::units::Units;

/// Remaining time below which the horizon counts as reached (seconds).
const HORIZON_EPSILON: f64 = 1e-6;

/// A nonlinear-reservoir runoff simulation over every subcatchment of a
/// model, driven by a single rainfall forcing applied to all rain gages.
#[derive(Debug)]
pub struct RunoffEngine {
    config: EngineConfig,
    subcatchments: Vec<SubcatchmentRunoff>,
    snow_catch: Vec<f64>,
    state: Vec<SubcatchState>,
    staged: Vec<SubcatchState>,
    elapsed: f64,
    mass: MassBalance,
    counters: StepCounters,
}

impl RunoffEngine {
    /// Build an engine for `model`, dry and at time zero.
    pub fn new(model: &Model) -> Result<Self, ConfigError> {
        let config = EngineConfig::from_model(model)?;
        let subcatchments: Vec<_> = model
            .subcatchments
            .iter()
            .map(|s| SubcatchmentRunoff::new(s, config.units))
            .collect();
        let snow_catch = subcatchments
            .iter()
            .map(|s| model.gages[s.gage()].snow_catch_factor)
            .collect();
        let state: Vec<_> = subcatchments.iter().map(|s| s.initial_state()).collect();
        let staged = state.clone();
        Ok(Self {
            config,
            subcatchments,
            snow_catch,
            state,
            staged,
            elapsed: 0.0,
            mass: MassBalance::starting_with(0.0),
            counters: StepCounters::default(),
        })
    }

    /// Advance one step under `rainfall` (in/hr or mm/hr) on every gage.
    ///
    /// The step is `step_seconds` long, shortened to land exactly on the
    /// end of the horizon if less than a full step remains.
    pub fn step(&mut self, rainfall: f64) -> Result<(), StepError> {
        let result = self.try_step(rainfall);
        match &result {
            Ok(()) => self.counters.committed += 1,
            Err(_) => self.counters.rolled_back += 1,
        }
        result
    }

    fn try_step(&mut self, rainfall: f64) -> Result<(), StepError> {
        if !(rainfall.is_finite() && rainfall >= 0.0) {
            return Err(StepError::InvalidForcing { value: rainfall });
        }
        let remaining = self.config.duration_seconds - self.elapsed;
        if remaining <= HORIZON_EPSILON {
            return Err(StepError::HorizonReached {
                elapsed_seconds: self.elapsed,
                duration_seconds: self.config.duration_seconds,
            });
        }
        let dt = self.config.step_seconds.min(remaining);
        let rain = self.config.units.rate_to_internal(rainfall);

        self.staged.copy_from_slice(&self.state);
        let mut flux = StepFlux::default();
        let mut storage = 0.0;
        for ((sub, staged), scf) in self
            .subcatchments
            .iter()
            .zip(self.staged.iter_mut())
            .zip(&self.snow_catch)
        {
            flux += sub.step(staged, rain * scf, dt);
            if !staged.is_finite() {
                return Err(StepError::NonFinite {
                    element: sub.name().to_string(),
                    quantity: "surface state",
                });
            }
            storage += sub.stored_volume(staged);
        }

        std::mem::swap(&mut self.state, &mut self.staged);
        self.elapsed += dt;
        self.mass.record(&flux, storage);
        tracing::trace!(
            elapsed_s = self.elapsed,
            rainfall,
            runoff = flux.runoff,
            "step committed"
        );
        Ok(())
    }

    /// Validated configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Unit conversions in effect.
    pub fn units(&self) -> Units {
        self.config.units
    }

    /// Simulated time since the start, in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Whether no further step is possible.
    pub fn horizon_reached(&self) -> bool {
        self.config.duration_seconds - self.elapsed <= HORIZON_EPSILON
    }

    /// Number of subcatchments.
    pub fn subcatchment_count(&self) -> usize {
        self.subcatchments.len()
    }

    /// Name of subcatchment `index`.
    pub fn subcatchment_name(&self, index: usize) -> Option<&str> {
        self.subcatchments.get(index).map(SubcatchmentRunoff::name)
    }

    /// Index of the subcatchment named `name`.
    pub fn subcatchment_index(&self, name: &str) -> Option<usize> {
        self.subcatchments.iter().position(|s| s.name() == name)
    }

    /// Outlet flow of subcatchment `index` in the model's flow units.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn runoff(&self, index: usize) -> f64 {
        self.config.units.flow_from_internal(self.state[index].runoff)
    }

    /// Mean ponded depth of subcatchment `index` (in or mm).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn depth(&self, index: usize) -> f64 {
        let d = self.subcatchments[index].mean_depth(&self.state[index]);
        self.config.units.depth_from_internal(d)
    }

    /// Infiltration rate over the pervious part of subcatchment `index`
    /// during the last step (in/hr or mm/hr).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn infiltration_rate(&self, index: usize) -> f64 {
        self.config
            .units
            .rate_from_internal(self.state[index].infil_rate)
    }

    /// Sum of all subcatchment outlet flows in the model's flow units.
    pub fn total_runoff(&self) -> f64 {
        let total: f64 = self.state.iter().map(|s| s.runoff).sum();
        self.config.units.flow_from_internal(total)
    }

    /// Cumulative water balance of the committed steps.
    pub fn mass_balance(&self) -> &MassBalance {
        &self.mass
    }

    /// Committed and rolled-back step counts.
    pub fn counters(&self) -> &StepCounters {
        &self.counters
    }
}
