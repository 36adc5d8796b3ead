//! Horton infiltration.
//!
//! Infiltration capacity decays exponentially from `max_rate` toward
//! `min_rate` while water is available at the surface, and recovers toward
//! `max_rate` while the surface is dry. The recovery constant is chosen so
//! that a fully saturated soil regains 98 % of its capacity deficit in
//! `dry_time_days`.

use runnel_model::HortonParams;

use crate::units::Units;

/// Fraction of the capacity deficit left after one full drying period.
const DRY_RESIDUAL: f64 = 0.02;

/// Horton parameters in internal units.
#[derive(Clone, Debug, PartialEq)]
pub struct Horton {
    /// Maximum capacity (ft/s or m/s).
    max_rate: f64,
    /// Minimum capacity (ft/s or m/s).
    min_rate: f64,
    /// Wetting decay constant (1/s).
    decay: f64,
    /// Drying recovery constant (1/s).
    regen: f64,
    /// Cumulative infiltration limit (ft or m); zero means unlimited.
    max_volume: f64,
}

/// Per-subcatchment infiltration state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HortonState {
    /// Current capacity (ft/s or m/s).
    pub capacity: f64,
    /// Infiltrated depth counted against the volume limit (ft or m).
    pub cumulative: f64,
}

impl Horton {
    /// Convert file parameters into internal units.
    pub fn new(params: &HortonParams, units: Units) -> Self {
        Self {
            max_rate: units.rate_to_internal(params.max_rate),
            min_rate: units.rate_to_internal(params.min_rate),
            decay: params.decay / 3600.0,
            regen: -DRY_RESIDUAL.ln() / (params.dry_time_days * 86_400.0),
            max_volume: units.depth_to_internal(params.max_infil),
        }
    }

    /// Dry soil at full capacity.
    pub fn initial_state(&self) -> HortonState {
        HortonState {
            capacity: self.max_rate,
            cumulative: 0.0,
        }
    }

    /// Infiltrate over `dt` seconds given the rate at which water is
    /// available at the surface. Returns the actual infiltration rate,
    /// never more than `supply`, and advances `state`.
    pub fn infiltrate(&self, state: &mut HortonState, supply: f64, dt: f64) -> f64 {
        let mut rate = if supply > 0.0 {
            state.capacity.min(supply)
        } else {
            0.0
        };
        if self.max_volume > 0.0 {
            let room = (self.max_volume - state.cumulative).max(0.0);
            rate = rate.min(room / dt);
        }

        if supply > 0.0 {
            state.capacity =
                self.min_rate + (state.capacity - self.min_rate) * (-self.decay * dt).exp();
        } else {
            let keep = (-self.regen * dt).exp();
            state.capacity = self.max_rate - (self.max_rate - state.capacity) * keep;
            state.cumulative *= keep;
        }
        state.cumulative += rate * dt;
        rate
    }
}
