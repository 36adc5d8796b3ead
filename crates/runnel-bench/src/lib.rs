//! Benchmark profiles for the Runnel bridge.
//!
//! - [`catchment_model`]: a model of `n` subcatchments with varied area,
//!   imperviousness and slope, so the nonlinear solve sees a spread of
//!   states rather than `n` copies of one.
//! - [`design_storm`]: a triangular hyetograph to drive the engine with.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::Write as _;

use runnel_model::{Model, ModelError};

/// Model text for `n` subcatchments over a six hour, 30 s step horizon.
pub fn catchment_text(n: usize) -> String {
    let mut text = String::from(
        "[TITLE]\nBenchmark catchment\n\n[OPTIONS]\nFLOW_UNITS CFS\nINFILTRATION HORTON\n\
         START_DATE 01/01/2024\nSTART_TIME 00:00:00\nEND_DATE 01/01/2024\nEND_TIME 06:00:00\n\
         ROUTING_STEP 0:00:30\n\n[RAINGAGES]\nRG1 INTENSITY 0:05 1.0 TIMESERIES TS1\n\
         RG2 INTENSITY 0:05 1.1 TIMESERIES TS1\n\n[SUBCATCHMENTS]\n",
    );
    for i in 0..n {
        let gage = if i % 2 == 0 { "RG1" } else { "RG2" };
        let area = 1.0 + (i % 7) as f64;
        let imperv = 10 + (i * 13) % 80;
        let width = 200.0 + 50.0 * (i % 5) as f64;
        let slope = 0.2 + 0.1 * (i % 9) as f64;
        let _ = writeln!(text, "S{i} {gage} OUT {area} {imperv} {width} {slope} 0");
    }
    text.push_str("\n[SUBAREAS]\n");
    for i in 0..n {
        let route = match i % 3 {
            0 => "OUTLET",
            1 => "IMPERVIOUS 40",
            _ => "PERVIOUS 60",
        };
        let _ = writeln!(text, "S{i} 0.012 0.15 0.06 0.2 25 {route}");
    }
    text.push_str("\n[INFILTRATION]\n");
    for i in 0..n {
        let _ = writeln!(text, "S{i} 3.0 0.5 4 7 0");
    }
    text
}

/// Parsed [`catchment_text`].
pub fn catchment_model(n: usize) -> Result<Model, ModelError> {
    Model::parse(&catchment_text(n))
}

/// Rainfall intensities for `steps` steps: zero, rising linearly to
/// `peak` at one third of the storm, then falling back to zero.
pub fn design_storm(steps: usize, peak: f64) -> Vec<f64> {
    let rise = (steps / 3).max(1) as f64;
    let fall = steps.saturating_sub(steps / 3).max(1) as f64;
    (0..steps)
        .map(|i| {
            let t = i as f64;
            if t <= rise {
                peak * t / rise
            } else {
                (peak * (1.0 - (t - rise) / fall)).max(0.0)
            }
        })
        .collect()
}
