//! Scripted engine adapter for dispatcher tests.
//!
//! [`ScriptedAdapter`] behaves like a trivial solver: each step writes
//! `2 * inputs[0]` to output 0 and the number of completed steps to the
//! remaining outputs. Failures and panics can be scheduled for any
//! operation, and every call is counted in a shared [`CallCounts`] that
//! stays readable after the adapter has been moved into a bridge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use runnel_core::{Diagnostic, EngineAdapter, EngineMetadata};

/// Shared call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    construct: AtomicUsize,
    step: AtomicUsize,
    metadata: AtomicUsize,
    destroy: AtomicUsize,
    live: AtomicUsize,
}

impl CallCounts {
    pub fn construct(&self) -> usize {
        self.construct.load(Ordering::SeqCst)
    }

    pub fn step(&self) -> usize {
        self.step.load(Ordering::SeqCst)
    }

    pub fn metadata(&self) -> usize {
        self.metadata.load(Ordering::SeqCst)
    }

    pub fn destroy(&self) -> usize {
        self.destroy.load(Ordering::SeqCst)
    }

    /// Engines constructed and not yet destroyed or dropped.
    pub fn live_engines(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Engine produced by [`ScriptedAdapter`].
#[derive(Debug)]
pub struct MockEngine {
    pub steps: usize,
    counts: Arc<CallCounts>,
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A scheduled misbehaviour.
#[derive(Clone, Debug, PartialEq)]
enum Fault {
    None,
    Fail(String),
    Panic(String),
}

/// An [`EngineAdapter`] with configurable arity and scheduled faults.
#[derive(Debug)]
pub struct ScriptedAdapter {
    version: f64,
    input_arity: usize,
    output_arity: usize,
    construct_fault: Fault,
    destroy_fault: Fault,
    step_fault_at: Option<(usize, Fault)>,
    counts: Arc<CallCounts>,
}

impl ScriptedAdapter {
    /// Version 1.0, one input, one output, no faults.
    pub fn new() -> Self {
        Self {
            version: 1.0,
            input_arity: 1,
            output_arity: 1,
            construct_fault: Fault::None,
            destroy_fault: Fault::None,
            step_fault_at: None,
            counts: Arc::new(CallCounts::default()),
        }
    }

    pub fn with_version(mut self, version: f64) -> Self {
        self.version = version;
        self
    }

    pub fn with_arity(mut self, inputs: usize, outputs: usize) -> Self {
        self.input_arity = inputs;
        self.output_arity = outputs;
        self
    }

    pub fn fail_construct(mut self, message: impl Into<String>) -> Self {
        self.construct_fault = Fault::Fail(message.into());
        self
    }

    pub fn panic_construct(mut self, message: impl Into<String>) -> Self {
        self.construct_fault = Fault::Panic(message.into());
        self
    }

    /// Fail the step whose 0-based index is `index`.
    pub fn fail_step_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.step_fault_at = Some((index, Fault::Fail(message.into())));
        self
    }

    /// Panic in the step whose 0-based index is `index`.
    pub fn panic_step_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.step_fault_at = Some((index, Fault::Panic(message.into())));
        self
    }

    pub fn fail_destroy(mut self, message: impl Into<String>) -> Self {
        self.destroy_fault = Fault::Fail(message.into());
        self
    }

    /// Handle to the call counters.
    pub fn counts(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }

    fn fire(fault: &Fault) -> Result<(), Diagnostic> {
        match fault {
            Fault::None => Ok(()),
            Fault::Fail(message) => Err(Diagnostic::new(message.clone())),
            Fault::Panic(message) => panic!("{message}"),
        }
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineAdapter for ScriptedAdapter {
    type Engine = MockEngine;

    fn construct(&mut self) -> Result<MockEngine, Diagnostic> {
        self.counts.construct.fetch_add(1, Ordering::SeqCst);
        Self::fire(&self.construct_fault)?;
        self.counts.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockEngine {
            steps: 0,
            counts: Arc::clone(&self.counts),
        })
    }

    fn step(
        &mut self,
        engine: &mut MockEngine,
        inputs: &[f64],
        outputs: &mut [f64],
    ) -> Result<(), Diagnostic> {
        let index = self.counts.step.fetch_add(1, Ordering::SeqCst);
        if let Some((at, fault)) = &self.step_fault_at {
            if *at == index {
                Self::fire(fault)?;
            }
        }
        engine.steps += 1;
        let forcing = inputs.first().copied().unwrap_or(0.0);
        for (i, slot) in outputs.iter_mut().take(self.output_arity).enumerate() {
            *slot = if i == 0 {
                2.0 * forcing
            } else {
                engine.steps as f64
            };
        }
        Ok(())
    }

    fn metadata(&self, _engine: Option<&MockEngine>) -> EngineMetadata {
        self.counts.metadata.fetch_add(1, Ordering::SeqCst);
        EngineMetadata {
            version: self.version,
            input_arity: self.input_arity,
            output_arity: self.output_arity,
        }
    }

    fn destroy(&mut self, engine: MockEngine) -> Result<(), Diagnostic> {
        self.counts.destroy.fetch_add(1, Ordering::SeqCst);
        drop(engine);
        Self::fire(&self.destroy_fault)
    }
}
