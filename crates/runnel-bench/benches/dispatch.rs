//! Criterion micro-benchmarks for the bridge dispatch path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use runnel_bench::catchment_text;
use runnel_bridge::{BridgeInstance, StatusCode, DEFAULT_CAPACITY};
use runnel_engine::{AdapterConfig, OutputBinding, RunoffAdapter};
use runnel_test_utils::{ModelFile, ScriptedAdapter};

/// Benchmark: Calculate through the dispatcher with the real engine.
fn bench_dispatch_calculate(c: &mut Criterion) {
    let file = ModelFile::new(&catchment_text(10));
    let config = AdapterConfig::new(file.path())
        .with_output(OutputBinding::Runoff(None))
        .with_output(OutputBinding::TotalRunoff)
        .with_output(OutputBinding::Elapsed);
    let make = || {
        let mut bridge = BridgeInstance::new(RunoffAdapter::new(config.clone()));
        let mut out = [0.0; DEFAULT_CAPACITY];
        assert_eq!(bridge.dispatch(0, &[0.0; DEFAULT_CAPACITY], &mut out), StatusCode::Success);
        bridge
    };
    let mut bridge = make();
    let mut inputs = [0.0; DEFAULT_CAPACITY];
    inputs[0] = 1.5;
    let mut outputs = [0.0; DEFAULT_CAPACITY];

    c.bench_function("dispatch_calculate_runoff", |b| {
        b.iter(|| {
            let status = bridge.dispatch(1, black_box(&inputs), &mut outputs);
            if status != StatusCode::Success {
                // Horizon reached: start a new realization.
                bridge = make();
            }
            black_box(outputs[0]);
        });
    });
}

/// Benchmark: protocol overhead alone, against the scripted adapter.
fn bench_dispatch_overhead(c: &mut Criterion) {
    let mut bridge = BridgeInstance::new(ScriptedAdapter::new());
    let inputs = [1.0; DEFAULT_CAPACITY];
    let mut outputs = [0.0; DEFAULT_CAPACITY];
    bridge.dispatch(0, &inputs, &mut outputs);

    c.bench_function("dispatch_calculate_mock", |b| {
        b.iter(|| black_box(bridge.dispatch(1, black_box(&inputs), &mut outputs)));
    });
    c.bench_function("dispatch_report_version", |b| {
        b.iter(|| black_box(bridge.dispatch(2, &inputs, &mut outputs)));
    });
    c.bench_function("dispatch_unknown_code", |b| {
        b.iter(|| black_box(bridge.dispatch(black_box(7), &inputs, &mut outputs)));
    });
}

criterion_group!(benches, bench_dispatch_calculate, bench_dispatch_overhead);
criterion_main!(benches);
