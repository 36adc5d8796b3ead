//! The engine adapter contract driven by the bridge dispatcher.

use crate::error::Diagnostic;

/// Metadata the bridge reports without stepping the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineMetadata {
    /// Version number reported by `ReportVersion`.
    pub version: f64,
    /// Number of input slots `step` reads.
    pub input_arity: usize,
    /// Number of output slots `step` writes.
    pub output_arity: usize,
}

/// Translates bridge calls into an opaque solver's API.
///
/// The bridge owns exactly one adapter and at most one live
/// [`Engine`](EngineAdapter::Engine) at a time. Every failure mode of the
/// solver must come back as a [`Diagnostic`]; the bridge additionally
/// catches panics, but an adapter should not rely on that.
///
/// # Contract
///
/// - `construct` is only called while no engine is live; after it
///   succeeds it is never called again on the same bridge instance.
/// - `step` receives slices at least as long as the negotiated capacity.
///   It must write exactly `output_arity` leading slots on success, write
///   nothing on failure, and must not allocate on the success path.
/// - `metadata(None)` must answer from configuration alone, and repeated
///   calls must return identical values.
/// - `destroy` consumes the engine; resources are released even if it
///   returns an error.
pub trait EngineAdapter {
    /// The live engine handle produced by [`construct`](EngineAdapter::construct).
    type Engine;

    /// Build an engine from the adapter's configuration.
    fn construct(&mut self) -> Result<Self::Engine, Diagnostic>;

    /// Advance the engine one step, reading forcing values from `inputs`
    /// and writing response values into `outputs`.
    fn step(
        &mut self,
        engine: &mut Self::Engine,
        inputs: &[f64],
        outputs: &mut [f64],
    ) -> Result<(), Diagnostic>;

    /// Report version and argument arity.
    fn metadata(&self, engine: Option<&Self::Engine>) -> EngineMetadata;

    /// Tear the engine down.
    fn destroy(&mut self, engine: Self::Engine) -> Result<(), Diagnostic>;
}
