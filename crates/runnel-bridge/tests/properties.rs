//! Property tests: the dispatcher against a reference state model.

use proptest::prelude::*;
use runnel_bridge::{BridgeInstance, MethodCode, SimulationState, StatusCode, DEFAULT_CAPACITY};
use runnel_test_utils::ScriptedAdapter;

/// Codes the dispatcher does not recognize.
fn unknown_code() -> impl Strategy<Value = i32> {
    any::<i32>().prop_filter("known method code", |c| MethodCode::from_raw(*c).is_none())
}

/// Mostly known codes, with the odd unknown one mixed in.
fn any_code() -> impl Strategy<Value = i32> {
    prop_oneof![
        4 => prop::sample::select(vec![0, 1, 2, 3, 99]),
        1 => unknown_code(),
    ]
}

/// What the protocol says should happen, ignoring engine faults.
fn expected(state: SimulationState, code: i32) -> (StatusCode, SimulationState) {
    use SimulationState::*;
    match (state, MethodCode::from_raw(code)) {
        (_, None) => (StatusCode::Failure, state),
        (_, Some(MethodCode::ReportVersion | MethodCode::ReportArguments)) => {
            (StatusCode::Success, state)
        }
        (Uninitialized, Some(MethodCode::Initialize)) => (StatusCode::Success, Ready),
        (Ready, Some(MethodCode::Calculate)) => (StatusCode::Success, Ready),
        (Ready, Some(MethodCode::Cleanup)) => (StatusCode::Success, Finalized),
        _ => (StatusCode::Failure, state),
    }
}

proptest! {
    #[test]
    fn unknown_codes_fail_without_writing(
        code in unknown_code(),
        prefix in prop::collection::vec(prop::sample::select(vec![0, 1, 99]), 0..4),
        fill in -1.0e6f64..1.0e6,
    ) {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new());
        let inputs = [0.0; DEFAULT_CAPACITY];
        let mut outputs = [0.0; DEFAULT_CAPACITY];
        for c in prefix {
            bridge.dispatch(c, &inputs, &mut outputs);
        }
        let before = bridge.state();
        outputs = [fill; DEFAULT_CAPACITY];
        prop_assert_eq!(bridge.dispatch(code, &inputs, &mut outputs), StatusCode::Failure);
        prop_assert_eq!(outputs, [fill; DEFAULT_CAPACITY]);
        prop_assert_eq!(bridge.state(), before);
    }

    #[test]
    fn call_sequences_follow_the_state_table(
        codes in prop::collection::vec(any_code(), 1..40),
    ) {
        let adapter = ScriptedAdapter::new();
        let counts = adapter.counts();
        let mut bridge = BridgeInstance::new(adapter);
        let mut inputs = [0.0; DEFAULT_CAPACITY];
        let mut outputs = [0.0; DEFAULT_CAPACITY];
        let mut model = SimulationState::Uninitialized;
        let mut steps = 0usize;

        for (i, code) in codes.into_iter().enumerate() {
            inputs[0] = i as f64;
            let (status, next) = expected(model, code);
            prop_assert_eq!(bridge.dispatch(code, &inputs, &mut outputs), status, "code {}", code);
            if status == StatusCode::Success && code == 1 {
                steps += 1;
                prop_assert_eq!(outputs[0], 2.0 * i as f64);
            }
            model = next;
            prop_assert_eq!(bridge.state(), model);
            prop_assert_eq!(counts.live_engines(), usize::from(model == SimulationState::Ready));
        }
        prop_assert_eq!(counts.step(), steps);
        prop_assert!(counts.construct() <= 1);
    }

    #[test]
    fn step_failures_never_leave_ready(
        fail_at in 0usize..10,
        calls in 1usize..20,
    ) {
        let mut bridge = BridgeInstance::new(ScriptedAdapter::new().fail_step_at(fail_at, "diverged"));
        let inputs = [1.0; DEFAULT_CAPACITY];
        let mut outputs = [0.0; DEFAULT_CAPACITY];
        prop_assert_eq!(bridge.dispatch(0, &inputs, &mut outputs), StatusCode::Success);
        for n in 0..calls {
            let status = bridge.dispatch(1, &inputs, &mut outputs);
            let want = if n == fail_at { StatusCode::FailureWithMessage } else { StatusCode::Success };
            prop_assert_eq!(status, want);
            prop_assert_eq!(bridge.state(), SimulationState::Ready);
        }
    }
}
