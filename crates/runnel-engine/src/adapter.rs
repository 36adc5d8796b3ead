//! [`EngineAdapter`] implementation backed by [`RunoffEngine`].
//!
//! [`RunoffAdapter`] loads the model named in its [`AdapterConfig`] at
//! construction, binds the configured output list to subcatchment indices
//! once, and then writes those values straight into the caller's output
//! slots on every step.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use runnel_core::{Diagnostic, EngineAdapter, EngineMetadata, StepError};
use runnel_model::load_model;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::runoff::RunoffEngine;

/// Version number reported through `ReportVersion`.
pub const ADAPTER_VERSION: f64 = 1.0;

/// Number of input slots `Calculate` reads: the rainfall forcing.
pub const INPUT_ARITY: usize = 1;

/// Environment variable naming the model file.
pub const ENV_MODEL: &str = "RUNNEL_MODEL";
/// Environment variable selecting the bound subcatchment by name or index.
pub const ENV_SUBCATCHMENT: &str = "RUNNEL_SUBCATCHMENT";
/// Environment variable holding a comma-separated output list.
pub const ENV_OUTPUTS: &str = "RUNNEL_OUTPUTS";

/// Model path used when none is configured.
pub const DEFAULT_MODEL_PATH: &str = "model.inp";

/// Continuity error above which teardown logs a warning (percent).
const CONTINUITY_WARN_PERCENT: f64 = 1.0;

// ── BindingError ───────────────────────────────────────────────────

/// Errors binding configuration to the subcatchments of a loaded model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingError {
    /// A subcatchment index is not below the subcatchment count.
    IndexOutOfRange {
        /// The configured index.
        index: usize,
        /// Number of subcatchments in the model.
        count: usize,
    },
    /// No subcatchment has the configured name.
    UnknownSubcatchment {
        /// The configured name.
        name: String,
    },
    /// An output binding could not be parsed.
    UnknownOutput {
        /// The unparsable text.
        text: String,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, count } => write!(
                f,
                "subcatchment index {index} is out of range (valid range: 0-{})",
                count.saturating_sub(1)
            ),
            Self::UnknownSubcatchment { name } => {
                write!(f, "subcatchment '{name}' not found in model")
            }
            Self::UnknownOutput { text } => write!(
                f,
                "unknown output '{text}': expected runoff[:SUB], depth[:SUB], \
                 infiltration[:SUB], total_runoff or elapsed"
            ),
        }
    }
}

impl Error for BindingError {}

// ── SubcatchmentSelector ───────────────────────────────────────────

/// Chooses a subcatchment by position or by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubcatchmentSelector {
    /// 0-based position in `[SUBCATCHMENTS]`.
    Index(usize),
    /// Subcatchment name.
    Name(String),
}

impl Default for SubcatchmentSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl SubcatchmentSelector {
    /// Resolve against a constructed engine.
    pub fn resolve(&self, engine: &RunoffEngine) -> Result<usize, BindingError> {
        match self {
            Self::Index(index) => {
                let count = engine.subcatchment_count();
                if *index < count {
                    Ok(*index)
                } else {
                    Err(BindingError::IndexOutOfRange {
                        index: *index,
                        count,
                    })
                }
            }
            Self::Name(name) => engine
                .subcatchment_index(name)
                .ok_or_else(|| BindingError::UnknownSubcatchment { name: name.clone() }),
        }
    }
}

impl FromStr for SubcatchmentSelector {
    type Err = std::convert::Infallible;

    /// All-digit text is an index; anything else is a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(index) if s.bytes().all(|b| b.is_ascii_digit()) => Self::Index(index),
            _ => Self::Name(s.to_string()),
        })
    }
}

impl fmt::Display for SubcatchmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

// ── OutputBinding ──────────────────────────────────────────────────

/// One value written to an output slot by `Calculate`.
///
/// Per-subcatchment bindings without a subject refer to the adapter's
/// bound subcatchment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputBinding {
    /// Outlet flow in the model's flow units.
    Runoff(Option<SubcatchmentSelector>),
    /// Mean ponded depth (in or mm).
    Depth(Option<SubcatchmentSelector>),
    /// Pervious infiltration rate (in/hr or mm/hr).
    Infiltration(Option<SubcatchmentSelector>),
    /// Sum of every subcatchment's outlet flow.
    TotalRunoff,
    /// Simulated seconds since the start.
    Elapsed,
}

impl FromStr for OutputBinding {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (kind, subject) = match text.split_once(':') {
            Some((k, sub)) => (k.trim(), Some(sub.trim())),
            None => (text, None),
        };
        let unknown = || BindingError::UnknownOutput {
            text: text.to_string(),
        };
        let selector = match subject {
            Some("") => return Err(unknown()),
            Some(sub) => Some(sub.parse::<SubcatchmentSelector>().map_err(|_| unknown())?),
            None => None,
        };
        match (kind.to_ascii_lowercase().as_str(), selector) {
            ("runoff", sel) => Ok(Self::Runoff(sel)),
            ("depth", sel) => Ok(Self::Depth(sel)),
            ("infiltration", sel) => Ok(Self::Infiltration(sel)),
            ("total_runoff", None) => Ok(Self::TotalRunoff),
            ("elapsed", None) => Ok(Self::Elapsed),
            _ => Err(unknown()),
        }
    }
}

/// Parse a comma-separated output list, skipping empty items.
pub fn parse_output_list(text: &str) -> Result<SmallVec<[OutputBinding; 4]>, BindingError> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ResolvedOutput {
    Runoff(usize),
    Depth(usize),
    Infiltration(usize),
    TotalRunoff,
    Elapsed,
}

impl ResolvedOutput {
    fn value(self, engine: &RunoffEngine) -> f64 {
        match self {
            Self::Runoff(i) => engine.runoff(i),
            Self::Depth(i) => engine.depth(i),
            Self::Infiltration(i) => engine.infiltration_rate(i),
            Self::TotalRunoff => engine.total_runoff(),
            Self::Elapsed => engine.elapsed_seconds(),
        }
    }
}

// ── AdapterConfig ──────────────────────────────────────────────────

/// What the adapter loads and which values it reports.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterConfig {
    /// Model description file.
    pub model_path: PathBuf,
    /// Subcatchment that subject-less output bindings refer to.
    pub subcatchment: SubcatchmentSelector,
    /// Output slots in order. Empty means `[runoff]`.
    pub outputs: SmallVec<[OutputBinding; 4]>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl AdapterConfig {
    /// Runoff of subcatchment 0 in the model at `model_path`.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            subcatchment: SubcatchmentSelector::default(),
            outputs: SmallVec::new(),
        }
    }

    /// Bind a different subcatchment.
    pub fn with_subcatchment(mut self, selector: SubcatchmentSelector) -> Self {
        self.subcatchment = selector;
        self
    }

    /// Append an output slot.
    pub fn with_output(mut self, output: OutputBinding) -> Self {
        self.outputs.push(output);
        self
    }

    /// Read `RUNNEL_MODEL`, `RUNNEL_SUBCATCHMENT` and `RUNNEL_OUTPUTS`.
    pub fn from_env() -> Result<Self, BindingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BindingError> {
        let model_path = lookup(ENV_MODEL)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
        let mut config = Self::new(model_path);
        if let Some(sel) = lookup(ENV_SUBCATCHMENT).filter(|s| !s.trim().is_empty()) {
            // Infallible.
            if let Ok(selector) = sel.parse() {
                config.subcatchment = selector;
            }
        }
        if let Some(list) = lookup(ENV_OUTPUTS) {
            config.outputs = parse_output_list(&list)?;
        }
        Ok(config)
    }

    /// Number of output slots `Calculate` writes.
    pub fn output_arity(&self) -> usize {
        self.outputs.len().max(1)
    }
}

// ── RunoffAdapter ──────────────────────────────────────────────────

/// A constructed engine with its outputs bound.
#[derive(Debug)]
pub struct RunoffSession {
    engine: RunoffEngine,
    bound: usize,
    outputs: SmallVec<[ResolvedOutput; 4]>,
}

impl RunoffSession {
    /// The running engine.
    pub fn engine(&self) -> &RunoffEngine {
        &self.engine
    }

    /// Index of the bound subcatchment.
    pub fn bound_subcatchment(&self) -> usize {
        self.bound
    }
}

/// Drives a [`RunoffEngine`] through the bridge protocol.
#[derive(Clone, Debug, Default)]
pub struct RunoffAdapter {
    config: AdapterConfig,
    rejected: Option<BindingError>,
}

impl RunoffAdapter {
    /// Adapter for `config`. Nothing is loaded until `construct`.
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            rejected: None,
        }
    }

    /// Adapter for a configuration that may have failed to parse.
    ///
    /// On `Err`, metadata is answered from the default configuration and
    /// every `construct` reports the error.
    pub fn from_config(config: Result<AdapterConfig, BindingError>) -> Self {
        match config {
            Ok(config) => Self::new(config),
            Err(e) => Self {
                config: AdapterConfig::default(),
                rejected: Some(e),
            },
        }
    }

    /// The configuration error `construct` will report, if any.
    pub fn rejected(&self) -> Option<&BindingError> {
        self.rejected.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn bind(&self, engine: &RunoffEngine) -> Result<(usize, SmallVec<[ResolvedOutput; 4]>), BindingError> {
        let bound = self.config.subcatchment.resolve(engine)?;
        let pick = |sel: &Option<SubcatchmentSelector>| match sel {
            Some(sel) => sel.resolve(engine),
            None => Ok(bound),
        };
        let mut outputs = SmallVec::new();
        if self.config.outputs.is_empty() {
            outputs.push(ResolvedOutput::Runoff(bound));
        }
        for binding in &self.config.outputs {
            outputs.push(match binding {
                OutputBinding::Runoff(sel) => ResolvedOutput::Runoff(pick(sel)?),
                OutputBinding::Depth(sel) => ResolvedOutput::Depth(pick(sel)?),
                OutputBinding::Infiltration(sel) => ResolvedOutput::Infiltration(pick(sel)?),
                OutputBinding::TotalRunoff => ResolvedOutput::TotalRunoff,
                OutputBinding::Elapsed => ResolvedOutput::Elapsed,
            });
        }
        Ok((bound, outputs))
    }
}

impl EngineAdapter for RunoffAdapter {
    type Engine = RunoffSession;

    fn construct(&mut self) -> Result<RunoffSession, Diagnostic> {
        if let Some(e) = &self.rejected {
            error!(error = %e, "configuration rejected");
            return Err(Diagnostic::from_error(e));
        }
        let path = &self.config.model_path;
        let model = load_model(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "model load failed");
            Diagnostic::from_error(&e)
        })?;
        let engine = RunoffEngine::new(&model).map_err(|e| {
            error!(error = %e, "engine construction failed");
            Diagnostic::from_error(&e)
        })?;
        let (bound, outputs) = self.bind(&engine).map_err(|e| {
            error!(error = %e, "output binding failed");
            Diagnostic::from_error(&e)
        })?;
        let config = engine.config();
        info!(
            path = %path.display(),
            subcatchments = engine.subcatchment_count(),
            bound = engine.subcatchment_name(bound).unwrap_or_default(),
            step_seconds = config.step_seconds,
            duration_seconds = config.duration_seconds,
            flow_units = %config.units.flow_units(),
            outputs = outputs.len(),
            "engine constructed"
        );
        Ok(RunoffSession {
            engine,
            bound,
            outputs,
        })
    }

    fn step(
        &mut self,
        session: &mut RunoffSession,
        inputs: &[f64],
        outputs: &mut [f64],
    ) -> Result<(), Diagnostic> {
        let Some(&rainfall) = inputs.first() else {
            return Err(StepError::ArityMismatch {
                expected: INPUT_ARITY,
                actual: 0,
            }
            .into());
        };
        if outputs.len() < session.outputs.len() {
            return Err(StepError::ArityMismatch {
                expected: session.outputs.len(),
                actual: outputs.len(),
            }
            .into());
        }
        session.engine.step(rainfall).map_err(|e| {
            warn!(error = %e, elapsed_s = session.engine.elapsed_seconds(), "step rejected");
            Diagnostic::from(e)
        })?;
        for (slot, output) in outputs.iter_mut().zip(&session.outputs) {
            *slot = output.value(&session.engine);
        }
        debug!(
            rainfall,
            elapsed_s = session.engine.elapsed_seconds(),
            out0 = outputs[0],
            "calculate"
        );
        Ok(())
    }

    fn metadata(&self, _engine: Option<&RunoffSession>) -> EngineMetadata {
        EngineMetadata {
            version: ADAPTER_VERSION,
            input_arity: INPUT_ARITY,
            output_arity: self.config.output_arity(),
        }
    }

    fn destroy(&mut self, session: RunoffSession) -> Result<(), Diagnostic> {
        let engine = session.engine;
        let balance = engine.mass_balance();
        let continuity = balance.continuity_error_percent();
        info!(
            steps = engine.counters().committed,
            rejected = engine.counters().rolled_back,
            elapsed_s = engine.elapsed_seconds(),
            rainfall = balance.rainfall,
            infiltration = balance.infiltration,
            runoff = balance.runoff,
            final_storage = balance.final_storage,
            continuity_error_pct = continuity,
            "engine destroyed"
        );
        if continuity.abs() > CONTINUITY_WARN_PERCENT {
            warn!(continuity_error_pct = continuity, "runoff continuity error is high");
        }
        Ok(())
    }
}
