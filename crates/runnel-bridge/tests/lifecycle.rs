//! Integration test: the lifecycle protocol driven through `dispatch`.
//!
//! Uses the scripted adapter so every engine call can be counted and
//! every failure mode scheduled.

use runnel_bridge::message::decode_address;
use runnel_bridge::{BridgeInstance, BridgeOptions, SimulationState, StatusCode, DEFAULT_CAPACITY};
use runnel_test_utils::ScriptedAdapter;

const INITIALIZE: i32 = 0;
const CALCULATE: i32 = 1;
const REPORT_VERSION: i32 = 2;
const REPORT_ARGUMENTS: i32 = 3;
const CLEANUP: i32 = 99;

struct Harness {
    bridge: BridgeInstance<ScriptedAdapter>,
    inputs: [f64; DEFAULT_CAPACITY],
    outputs: [f64; DEFAULT_CAPACITY],
}

impl Harness {
    fn new(adapter: ScriptedAdapter) -> Self {
        Self {
            bridge: BridgeInstance::new(adapter),
            inputs: [0.0; DEFAULT_CAPACITY],
            outputs: [0.0; DEFAULT_CAPACITY],
        }
    }

    fn call(&mut self, code: i32) -> StatusCode {
        self.bridge.dispatch(code, &self.inputs, &mut self.outputs)
    }

    fn message(&self) -> String {
        let msg = self.bridge.last_message().expect("message stored");
        assert_eq!(
            decode_address(self.outputs[0]),
            msg.as_ptr() as usize,
            "outputs[0] must carry the address of the stored message"
        );
        msg.to_str().unwrap().to_string()
    }
}

#[test]
fn calculate_before_initialize_fails_without_engine_calls() {
    let adapter = ScriptedAdapter::new();
    let counts = adapter.counts();
    let mut h = Harness::new(adapter);
    h.outputs = [3.0; DEFAULT_CAPACITY];
    assert_eq!(h.call(CALCULATE), StatusCode::Failure);
    assert_eq!(h.call(CLEANUP), StatusCode::Failure);
    assert_eq!(h.outputs, [3.0; DEFAULT_CAPACITY]);
    assert_eq!(counts.construct(), 0);
    assert_eq!(counts.step(), 0);
    assert_eq!(counts.destroy(), 0);
    assert_eq!(h.bridge.state(), SimulationState::Uninitialized);
}

#[test]
fn full_lifecycle_then_only_metadata() {
    let adapter = ScriptedAdapter::new().with_arity(1, 2);
    let counts = adapter.counts();
    let mut h = Harness::new(adapter);
    assert_eq!(h.call(INITIALIZE), StatusCode::Success);
    for n in 1..=25 {
        h.inputs[0] = n as f64;
        assert_eq!(h.call(CALCULATE), StatusCode::Success);
        assert_eq!(h.outputs[0], 2.0 * n as f64);
        assert_eq!(h.outputs[1], n as f64);
    }
    assert_eq!(h.call(CLEANUP), StatusCode::Success);
    assert_eq!(h.bridge.state(), SimulationState::Finalized);
    assert!(h.bridge.engine().is_none());

    for code in [INITIALIZE, CALCULATE, CLEANUP] {
        assert_eq!(h.call(code), StatusCode::Failure);
    }
    assert_eq!(h.call(REPORT_VERSION), StatusCode::Success);
    assert_eq!(h.call(REPORT_ARGUMENTS), StatusCode::Success);
    assert_eq!(&h.outputs[..2], &[1.0, 2.0]);
    assert_eq!(counts.construct(), 1);
    assert_eq!(counts.step(), 25);
    assert_eq!(counts.destroy(), 1);
}

#[test]
fn metadata_is_identical_in_every_state() {
    let mut h = Harness::new(ScriptedAdapter::new().with_version(4.1).with_arity(1, 3));
    let mut answers = Vec::new();
    let mut record = |h: &mut Harness| {
        for _ in 0..2 {
            assert_eq!(h.call(REPORT_VERSION), StatusCode::Success);
            let version = h.outputs[0];
            assert_eq!(h.call(REPORT_ARGUMENTS), StatusCode::Success);
            answers.push((version, h.outputs[0], h.outputs[1]));
        }
    };
    record(&mut h);
    h.call(INITIALIZE);
    record(&mut h);
    h.call(CLEANUP);
    record(&mut h);
    assert_eq!(answers.len(), 6);
    assert!(answers.iter().all(|a| *a == (4.1, 1.0, 3.0)));
}

#[test]
fn failed_calculate_keeps_ready() {
    let mut h = Harness::new(ScriptedAdapter::new().fail_step_at(2, "solver diverged"));
    h.call(INITIALIZE);
    assert_eq!(h.call(CALCULATE), StatusCode::Success);
    assert_eq!(h.call(CALCULATE), StatusCode::Success);
    assert_eq!(h.call(CALCULATE), StatusCode::FailureWithMessage);
    assert_eq!(h.message(), "solver diverged");
    assert_eq!(h.bridge.state(), SimulationState::Ready);
    h.inputs[0] = 1.0;
    assert_eq!(h.call(CALCULATE), StatusCode::Success);
    assert_eq!(h.outputs[0], 2.0);
}

#[test]
fn cleanup_twice() {
    let mut h = Harness::new(ScriptedAdapter::new());
    h.call(INITIALIZE);
    assert_eq!(h.call(CLEANUP), StatusCode::Success);
    assert_eq!(h.call(CLEANUP), StatusCode::Failure);
}

#[test]
fn initialize_twice_keeps_first_engine() {
    let adapter = ScriptedAdapter::new();
    let counts = adapter.counts();
    let mut h = Harness::new(adapter);
    assert_eq!(h.call(INITIALIZE), StatusCode::Success);
    assert_eq!(h.call(INITIALIZE), StatusCode::Failure);
    assert_eq!(counts.construct(), 1);
    assert_eq!(counts.live_engines(), 1);
}

#[test]
fn construct_failure_reports_message_and_allows_retry() {
    let mut h = Harness::new(ScriptedAdapter::new().fail_construct("input file does not exist: x.inp"));
    assert_eq!(h.call(INITIALIZE), StatusCode::FailureWithMessage);
    assert_eq!(h.message(), "input file does not exist: x.inp");
    assert_eq!(h.bridge.state(), SimulationState::Uninitialized);
    assert_eq!(h.call(CALCULATE), StatusCode::Failure);
    assert_eq!(h.call(INITIALIZE), StatusCode::FailureWithMessage);
}

#[test]
fn construct_panic_is_contained() {
    let mut h = Harness::new(ScriptedAdapter::new().panic_construct("bad model"));
    assert_eq!(h.call(INITIALIZE), StatusCode::FailureWithMessage);
    assert_eq!(h.message(), "engine panicked: bad model");
    assert_eq!(h.bridge.state(), SimulationState::Uninitialized);
}

#[test]
fn destroy_failure_still_finalizes() {
    let adapter = ScriptedAdapter::new().fail_destroy("could not close output");
    let counts = adapter.counts();
    let mut h = Harness::new(adapter);
    h.call(INITIALIZE);
    assert_eq!(h.call(CLEANUP), StatusCode::FailureWithMessage);
    assert_eq!(h.message(), "could not close output");
    assert_eq!(h.bridge.state(), SimulationState::Finalized);
    assert_eq!(counts.live_engines(), 0);
    assert_eq!(h.call(CLEANUP), StatusCode::Failure);
}

#[test]
fn message_persists_until_replaced() {
    let mut h = Harness::new(ScriptedAdapter::new().fail_step_at(0, "first"));
    h.call(INITIALIZE);
    h.call(CALCULATE);
    let address = h.outputs[0].to_bits();
    assert_eq!(h.call(REPORT_VERSION), StatusCode::Success);
    assert_eq!(h.call(CALCULATE), StatusCode::Success);
    let stored = h.bridge.last_message().unwrap();
    assert_eq!(stored.as_ptr() as usize as u64, address);
    assert_eq!(stored.to_str().unwrap(), "first");
}

#[test]
fn undersized_buffers_fail_before_anything_runs() {
    let adapter = ScriptedAdapter::new();
    let counts = adapter.counts();
    let mut bridge = BridgeInstance::new(adapter);
    let inputs = [0.0; 4];
    let mut outputs = [9.0; 4];
    for code in [INITIALIZE, CALCULATE, REPORT_VERSION, REPORT_ARGUMENTS, CLEANUP] {
        assert_eq!(bridge.dispatch(code, &inputs, &mut outputs), StatusCode::Failure);
    }
    assert_eq!(outputs, [9.0; 4]);
    let mut full = [9.0; DEFAULT_CAPACITY];
    assert_eq!(bridge.dispatch(INITIALIZE, &[], &mut full), StatusCode::Failure);
    assert_eq!(full, [9.0; DEFAULT_CAPACITY]);
    assert_eq!(counts.construct(), 0);
    assert_eq!(counts.metadata(), 0);
}

#[test]
fn custom_capacity_accepts_smaller_buffers() {
    let mut bridge =
        BridgeInstance::with_options(ScriptedAdapter::new(), BridgeOptions { capacity: 2 });
    let inputs = [1.0, 0.0];
    let mut outputs = [0.0; 2];
    assert_eq!(bridge.dispatch(INITIALIZE, &inputs, &mut outputs), StatusCode::Success);
    assert_eq!(bridge.dispatch(CALCULATE, &inputs, &mut outputs), StatusCode::Success);
    assert_eq!(outputs[0], 2.0);
}
