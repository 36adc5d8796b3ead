//! The method dispatcher.
//!
//! [`BridgeInstance`] owns one adapter, at most one live engine, the
//! lifecycle state and the current error message. [`dispatch`] is the
//! fixed-signature surface: raw method code in, status out, all values
//! through the two argument buffers. [`call`] is the typed core it wraps.
//!
//! [`dispatch`]: BridgeInstance::dispatch
//! [`call`]: BridgeInstance::call

use std::any::Any;
use std::error::Error;
use std::ffi::CStr;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use runnel_core::{Diagnostic, EngineAdapter, EngineMetadata};
use tracing::{debug, error, info, warn};

use crate::buffer::{check_buffers, Reply, DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::message::ErrorMessage;
use crate::method::MethodCode;
use crate::state::{ProtocolError, SimulationState};
use crate::status::StatusCode;

// ── BridgeOptions ──────────────────────────────────────────────────

/// Per-instance settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Minimum length of both argument buffers. Values below
    /// [`MIN_CAPACITY`] are raised to it. Default: [`DEFAULT_CAPACITY`].
    pub capacity: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

// ── DispatchError ──────────────────────────────────────────────────

/// Why a typed call failed.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchError {
    /// Rejected by the protocol layer; reported as `Failure`.
    Protocol(ProtocolError),
    /// Reported by the adapter or engine; reported as `FailureWithMessage`.
    Engine(Diagnostic),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Engine(d) => write!(f, "engine: {d}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::Engine(d) => Some(d),
        }
    }
}

impl From<ProtocolError> for DispatchError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<Diagnostic> for DispatchError {
    fn from(d: Diagnostic) -> Self {
        Self::Engine(d)
    }
}

/// Text of a caught panic payload.
fn panic_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Run adapter code, converting a panic into a diagnostic.
fn guarded<T>(f: impl FnOnce() -> Result<T, Diagnostic>) -> Result<T, Diagnostic> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Diagnostic::new(format!(
            "engine panicked: {}",
            panic_text(payload.as_ref())
        ))),
    }
}

// ── BridgeInstance ─────────────────────────────────────────────────

/// One simulation driven through the bridge protocol.
pub struct BridgeInstance<A: EngineAdapter> {
    adapter: A,
    engine: Option<A::Engine>,
    state: SimulationState,
    message: ErrorMessage,
    capacity: usize,
}

impl<A: EngineAdapter> BridgeInstance<A> {
    /// An uninitialized instance with default options.
    pub fn new(adapter: A) -> Self {
        Self::with_options(adapter, BridgeOptions::default())
    }

    /// An uninitialized instance with explicit options.
    pub fn with_options(adapter: A, options: BridgeOptions) -> Self {
        Self {
            adapter,
            engine: None,
            state: SimulationState::Uninitialized,
            message: ErrorMessage::default(),
            capacity: options.capacity.max(MIN_CAPACITY),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Negotiated buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The live engine, if any.
    pub fn engine(&self) -> Option<&A::Engine> {
        self.engine.as_ref()
    }

    /// The adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The message most recently reported through `FailureWithMessage`.
    pub fn last_message(&self) -> Option<&CStr> {
        self.message.get()
    }

    /// Handle one call from the fixed-signature entry point.
    ///
    /// Unknown codes, undersized buffers and illegal transitions return
    /// `Failure` without touching `outputs`. Engine failures store a
    /// message, encode its address into `outputs[0]` and return
    /// `FailureWithMessage`. On success the method's slots are written.
    ///
    /// Both buffers always span the full capacity, even for methods that
    /// read no inputs: a host example written as `dispatch(Initialize, [],
    /// out)` passes a capacity-sized input buffer whose contents are unused.
    pub fn dispatch(&mut self, raw_code: i32, inputs: &[f64], outputs: &mut [f64]) -> StatusCode {
        let result = match MethodCode::from_raw(raw_code) {
            None => Err(DispatchError::Protocol(ProtocolError::UnknownMethod {
                code: raw_code,
            })),
            Some(method) => check_buffers(inputs, outputs, self.capacity)
                .map_err(DispatchError::from)
                .and_then(|()| self.call(method, inputs, outputs)),
        };
        match result {
            Ok(reply) => {
                reply.write_into(outputs);
                StatusCode::Success
            }
            Err(e) => {
                let status = StatusCode::from(&e);
                match e {
                    DispatchError::Protocol(p) => {
                        warn!(code = raw_code, state = %self.state, error = %p, "call rejected");
                    }
                    DispatchError::Engine(d) => {
                        error!(code = raw_code, state = %self.state, error = %d, "engine failure");
                        self.message.set(d);
                        self.message.encode_into(outputs);
                    }
                }
                status
            }
        }
    }

    /// Run `method` against the state machine and the adapter.
    ///
    /// `Calculate` writes the adapter's output slots into `outputs`
    /// directly; the other methods describe their slots in the returned
    /// [`Reply`]. Buffer capacity is not checked here.
    pub fn call(
        &mut self,
        method: MethodCode,
        inputs: &[f64],
        outputs: &mut [f64],
    ) -> Result<Reply, DispatchError> {
        self.state.admits(method)?;
        match method {
            MethodCode::Initialize => self.initialize(),
            MethodCode::Calculate => self.calculate(inputs, outputs),
            MethodCode::ReportVersion => Ok(Reply::Version(self.metadata()?.version)),
            MethodCode::ReportArguments => {
                let m = self.metadata()?;
                Ok(Reply::Arguments {
                    inputs: m.input_arity,
                    outputs: m.output_arity,
                })
            }
            MethodCode::Cleanup => self.cleanup(),
        }
    }

    fn metadata(&self) -> Result<EngineMetadata, DispatchError> {
        let (adapter, engine) = (&self.adapter, self.engine.as_ref());
        guarded(|| Ok(adapter.metadata(engine))).map_err(DispatchError::Engine)
    }

    fn initialize(&mut self) -> Result<Reply, DispatchError> {
        let meta = self.metadata()?;
        if meta.input_arity > self.capacity || meta.output_arity > self.capacity {
            return Err(Diagnostic::new(format!(
                "engine needs {} inputs and {} outputs but the argument capacity is {}",
                meta.input_arity, meta.output_arity, self.capacity
            ))
            .into());
        }
        let adapter = &mut self.adapter;
        let engine = guarded(|| adapter.construct())?;
        self.engine = Some(engine);
        self.state = SimulationState::Ready;
        info!(
            version = meta.version,
            inputs = meta.input_arity,
            outputs = meta.output_arity,
            "initialized"
        );
        Ok(Reply::Initialized)
    }

    fn calculate(&mut self, inputs: &[f64], outputs: &mut [f64]) -> Result<Reply, DispatchError> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(ProtocolError::NotInitialized {
                method: MethodCode::Calculate,
            }
            .into());
        };
        let adapter = &mut self.adapter;
        guarded(|| adapter.step(engine, inputs, outputs))?;
        debug!(input0 = ?inputs.first(), "calculated");
        Ok(Reply::Calculated)
    }

    fn cleanup(&mut self) -> Result<Reply, DispatchError> {
        self.state = SimulationState::Finalized;
        self.message.clear();
        let Some(engine) = self.engine.take() else {
            return Ok(Reply::CleanedUp);
        };
        let adapter = &mut self.adapter;
        guarded(|| adapter.destroy(engine))?;
        info!("cleaned up");
        Ok(Reply::CleanedUp)
    }
}

impl<A: EngineAdapter> Drop for BridgeInstance<A> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            warn!(state = %self.state, "bridge dropped with a live engine; destroying it");
            let adapter = &mut self.adapter;
            if let Err(d) = guarded(|| adapter.destroy(engine)) {
                error!(error = %d, "engine teardown failed during drop");
            }
        }
    }
}

impl<A: EngineAdapter> fmt::Debug for BridgeInstance<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeInstance")
            .field("state", &self.state)
            .field("capacity", &self.capacity)
            .field("has_engine", &self.engine.is_some())
            .field("message", &self.message.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::decode_address;
    use runnel_test_utils::ScriptedAdapter;

    fn buffers() -> ([f64; DEFAULT_CAPACITY], [f64; DEFAULT_CAPACITY]) {
        ([0.0; DEFAULT_CAPACITY], [0.0; DEFAULT_CAPACITY])
    }

    #[test]
    fn lifecycle_happy_path() {
        let adapter = ScriptedAdapter::new();
        let counts = adapter.counts();
        let mut bridge = BridgeInstance::new(adapter);
        let (mut inp, mut out) = buffers();

        assert_eq!(bridge.dispatch(0, &inp, &mut out), StatusCode::Success);
        assert_eq!(bridge.state(), SimulationState::Ready);
        inp[0] = 2.5;
        assert_eq!(bridge.dispatch(1, &inp, &mut out), StatusCode::Success);
        assert_eq!(out[0], 5.0);
        assert_eq!(bridge.engine().map(|e| e.steps), Some(1));
        assert_eq!(bridge.dispatch(99, &inp, &mut out), StatusCode::Success);
        assert_eq!(bridge.state(), SimulationState::Finalized);
        assert_eq!(counts.destroy(), 1);
        assert_eq!(counts.live_engines(), 0);
    }

    #[test]
    fn step_failure_encodes_message() {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new().fail_step_at(0, "rain gage offline"));
        let (inp, mut out) = buffers();
        bridge.dispatch(0, &inp, &mut out);
        out[1] = 42.0;
        assert_eq!(bridge.dispatch(1, &inp, &mut out), StatusCode::FailureWithMessage);
        let msg = bridge.last_message().unwrap();
        assert_eq!(decode_address(out[0]), msg.as_ptr() as usize);
        assert_eq!(msg.to_str().unwrap(), "rain gage offline");
        assert_eq!(out[1], 42.0);
        assert_eq!(bridge.state(), SimulationState::Ready);
        assert_eq!(bridge.dispatch(1, &inp, &mut out), StatusCode::Success);
    }

    #[test]
    fn adapter_panic_becomes_message() {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new().panic_step_at(0, "index out of bounds"));
        let (inp, mut out) = buffers();
        bridge.dispatch(0, &inp, &mut out);
        assert_eq!(bridge.dispatch(1, &inp, &mut out), StatusCode::FailureWithMessage);
        let text = bridge.last_message().unwrap().to_str().unwrap();
        assert_eq!(text, "engine panicked: index out of bounds");
        assert_eq!(bridge.state(), SimulationState::Ready);
    }

    #[test]
    fn arity_above_capacity_fails_initialize() {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new().with_arity(1, 11));
        let (inp, mut out) = buffers();
        assert_eq!(bridge.dispatch(0, &inp, &mut out), StatusCode::FailureWithMessage);
        assert_eq!(bridge.state(), SimulationState::Uninitialized);
        assert!(bridge
            .last_message()
            .unwrap()
            .to_str()
            .unwrap()
            .contains("argument capacity is 10"));
    }

    #[test]
    fn capacity_has_a_floor() {
        let bridge = BridgeInstance::with_options(ScriptedAdapter::new(), BridgeOptions { capacity: 0 });
        assert_eq!(bridge.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn drop_destroys_live_engine() {
        let adapter = ScriptedAdapter::new();
        let counts = adapter.counts();
        {
            let mut bridge = BridgeInstance::new(adapter);
            let (inp, mut out) = buffers();
            bridge.dispatch(0, &inp, &mut out);
            assert_eq!(counts.live_engines(), 1);
        }
        assert_eq!(counts.destroy(), 1);
        assert_eq!(counts.live_engines(), 0);
    }

    #[test]
    fn typed_call_reports_protocol_errors() {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new());
        let err = bridge
            .call(MethodCode::Cleanup, &[], &mut [])
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Protocol(ProtocolError::NotInitialized {
                method: MethodCode::Cleanup
            })
        );
        assert_eq!(
            bridge.call(MethodCode::ReportVersion, &[], &mut []),
            Ok(Reply::Version(1.0))
        );
    }
}
