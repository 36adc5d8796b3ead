//! Nonlinear-reservoir runoff engine for the Runnel bridge.
//!
//! [`RunoffEngine`] advances every subcatchment of a loaded model one step
//! at a time under a single rainfall forcing: Horton infiltration on the
//! pervious subarea, Manning outflow from each subarea reservoir, and
//! optional routing between subareas. Steps are atomic: a rejected step
//! leaves the engine unchanged.
//!
//! [`RunoffAdapter`] exposes the engine through the
//! [`EngineAdapter`](runnel_core::EngineAdapter) contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod horton;
pub mod metrics;
pub mod runoff;
pub mod subcatch;
pub mod units;

pub use adapter::{
    AdapterConfig, BindingError, OutputBinding, RunoffAdapter, RunoffSession,
    SubcatchmentSelector,
};
pub use config::{ConfigError, EngineConfig};
pub use metrics::{MassBalance, StepCounters};
pub use runoff::RunoffEngine;
pub use units::Units;
