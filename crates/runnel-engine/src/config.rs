//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is derived from a loaded [`Model`] and checked once at
//! construction; the step path never re-validates it.

use std::error::Error;
use std::fmt;

use runnel_model::Model;

use crate::units::Units;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::from_model`] and [`EngineConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The model has no subcatchments to simulate.
    NoSubcatchments,
    /// The step size is NaN, infinite, zero, or negative.
    InvalidStep {
        /// The invalid value.
        value: f64,
    },
    /// The simulation duration is NaN, infinite, zero, or negative.
    InvalidDuration {
        /// The invalid value.
        value: f64,
    },
    /// A subcatchment refers to a rain gage index the model does not have.
    UnknownGage {
        /// Subcatchment name.
        subcatchment: String,
        /// The dangling gage index.
        gage: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubcatchments => write!(f, "engine has no subcatchments to simulate"),
            Self::InvalidStep { value } => {
                write!(f, "routing step must be finite and positive, got {value}")
            }
            Self::InvalidDuration { value } => {
                write!(f, "simulation duration must be finite and positive, got {value}")
            }
            Self::UnknownGage { subcatchment, gage } => {
                write!(f, "subcatchment '{subcatchment}' refers to missing rain gage #{gage}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── EngineConfig ───────────────────────────────────────────────────

/// Settings the runoff engine needs beyond the per-subcatchment data.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Unit system and flow units.
    pub units: Units,
    /// Step size in seconds. The orchestrator must advance with the same step.
    pub step_seconds: f64,
    /// Length of the simulation in seconds.
    pub duration_seconds: f64,
}

impl EngineConfig {
    /// Derive and validate the configuration for `model`.
    pub fn from_model(model: &Model) -> Result<Self, ConfigError> {
        if model.subcatchments.is_empty() {
            return Err(ConfigError::NoSubcatchments);
        }
        if let Some(sub) = model.subcatchments.iter().find(|s| s.gage >= model.gages.len()) {
            return Err(ConfigError::UnknownGage {
                subcatchment: sub.name.clone(),
                gage: sub.gage,
            });
        }
        let config = Self {
            units: Units::new(model.options.flow_units),
            step_seconds: model.options.routing_step_seconds,
            duration_seconds: model.options.duration_seconds(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the scalar settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_seconds.is_finite() && self.step_seconds > 0.0) {
            return Err(ConfigError::InvalidStep {
                value: self.step_seconds,
            });
        }
        if !(self.duration_seconds.is_finite() && self.duration_seconds > 0.0) {
            return Err(ConfigError::InvalidDuration {
                value: self.duration_seconds,
            });
        }
        Ok(())
    }

    /// Number of steps that fit in the horizon, counting a final partial step.
    pub fn step_count(&self) -> u64 {
        (self.duration_seconds / self.step_seconds).ceil() as u64
    }
}
