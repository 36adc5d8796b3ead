//! Model text fixtures.
//!
//! - [`treatment_train_model`]: one subcatchment draining a storage train,
//!   with the full set of hydraulic sections the loader must tolerate.
//! - [`ModelTextBuilder`]: minimal models with N identical subcatchments,
//!   configurable units, horizon and step.
//! - [`zero_subcatchment_model`]: a model whose `[SUBCATCHMENTS]` is empty.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// One subcatchment `S1` (5 ac, 50 % impervious) on gage `RG1`, six hour
/// horizon, 30 s routing step, CFS.
pub fn treatment_train_model() -> String {
    "\
[TITLE]
Treatment Train Test Model

[OPTIONS]
FLOW_UNITS           CFS
INFILTRATION         HORTON
FLOW_ROUTING         DYNWAVE
START_DATE           01/01/2024
START_TIME           00:00:00
REPORT_START_DATE    01/01/2024
REPORT_START_TIME    00:00:00
END_DATE             01/01/2024
END_TIME             06:00:00
REPORT_STEP          00:01:00
WET_STEP             00:01:00
DRY_STEP             01:00:00
ROUTING_STEP         0:00:30
ALLOW_PONDING        NO

[RAINGAGES]
;;Name           Type      Intrvl Catch  Source
RG1              INTENSITY 1:00   1.0    TIMESERIES TS1

[SUBCATCHMENTS]
;;Name           Raingage         Outlet           Area     Imperv   Width   Slope    Length
S1               RG1              ST1              5.0      50       500     0.5      0

[SUBAREAS]
;;Subcatchment   N-Imperv   N-Perv     S-Imperv   S-Perv     PctZero    RouteTo
S1               0.01       0.1        0.05       0.05       25         OUTLET

[INFILTRATION]
;;Subcatchment   MaxRate    MinRate    Decay      DryTime    MaxInfil
S1               3.0        0.5        4          7          0

[JUNCTIONS]
J1               95         5          0          0          0

[OUTFALLS]
J2               90         FREE                          NO

[STORAGE]
ST1              100      8        0        FUNCTIONAL 1000    0        0        0        0
ST2              98       10       0        FUNCTIONAL 2000    0        0        0        0
ST3              96       12       0        FUNCTIONAL 3000    0        0        0        0

[CONDUITS]
C1               ST1              ST2              100        0.01       0          0          0          0
C2               ST2              ST3              100        0.01       0          0          0          0
C3               ST3              J2               100        0.01       0          0          0          0

[XSECTIONS]
C1               CIRCULAR     2                0          0          0          1
C2               CIRCULAR     2                0          0          0          1
C3               CIRCULAR     2                0          0          0          1

[TIMESERIES]
TS1                         0:00       0.0
TS1                         1:00       0.5
TS1                         2:00       1.0

[REPORT]
SUBCATCHMENTS ALL
NODES ALL
"
    .to_string()
}

/// A model whose `[SUBCATCHMENTS]` section has no rows.
pub fn zero_subcatchment_model() -> String {
    ModelTextBuilder::new().subcatchments(0).build()
}

/// Builder for minimal models of identical subcatchments named
/// `SUB0`, `SUB1`, ...
#[derive(Clone, Debug)]
pub struct ModelTextBuilder {
    subcatchments: usize,
    flow_units: &'static str,
    duration_seconds: u64,
    routing_step: String,
    max_infil: f64,
}

impl ModelTextBuilder {
    /// One subcatchment, CFS, one hour, 30 s step, unlimited infiltration.
    pub fn new() -> Self {
        Self {
            subcatchments: 1,
            flow_units: "CFS",
            duration_seconds: 3600,
            routing_step: "0:00:30".to_string(),
            max_infil: 0.0,
        }
    }

    pub fn subcatchments(mut self, n: usize) -> Self {
        self.subcatchments = n;
        self
    }

    pub fn flow_units(mut self, units: &'static str) -> Self {
        self.flow_units = units;
        self
    }

    /// Simulation horizon in whole seconds.
    pub fn duration_seconds(mut self, seconds: u64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// `ROUTING_STEP` value exactly as written to the file.
    pub fn routing_step(mut self, text: impl Into<String>) -> Self {
        self.routing_step = text.into();
        self
    }

    pub fn max_infil(mut self, depth: f64) -> Self {
        self.max_infil = depth;
        self
    }

    pub fn build(&self) -> String {
        let d = self.duration_seconds;
        let end_time = format!("{}:{:02}:{:02}", d / 3600, (d % 3600) / 60, d % 60);
        let mut text = String::new();
        let _ = writeln!(text, "[TITLE]\nTest Model with {} Subcatchments\n", self.subcatchments);
        let _ = writeln!(
            text,
            "[OPTIONS]\nFLOW_UNITS {}\nINFILTRATION HORTON\nSTART_DATE 01/01/2024\n\
             START_TIME 00:00:00\nEND_DATE 01/01/2024\nEND_TIME {end_time}\nROUTING_STEP {}\n",
            self.flow_units, self.routing_step
        );
        let _ = writeln!(text, "[RAINGAGES]\nRG1 INTENSITY 1:00 1.0 TIMESERIES TS1\n");
        text.push_str("[SUBCATCHMENTS]\n");
        for i in 0..self.subcatchments {
            let _ = writeln!(text, "SUB{i} RG1 J2 1.0 50 100 0.5 0");
        }
        text.push_str("\n[SUBAREAS]\n");
        for i in 0..self.subcatchments {
            let _ = writeln!(text, "SUB{i} 0.01 0.1 0.05 0.05 25 OUTLET");
        }
        text.push_str("\n[INFILTRATION]\n");
        for i in 0..self.subcatchments {
            let _ = writeln!(text, "SUB{i} 3.0 0.5 4 7 {}", self.max_infil);
        }
        text.push_str("\n[OUTFALLS]\nJ2 90 FREE NO\n");
        text
    }
}

impl Default for ModelTextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A model file written into a private temporary directory.
///
/// The directory and file are removed when the value is dropped.
pub struct ModelFile {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl ModelFile {
    /// Write `text` to `model.inp` in a fresh temporary directory.
    pub fn new(text: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("model.inp");
        fs::write(&path, text).expect("write model file");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The containing directory (itself not a valid model path).
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// A path in the same directory that does not exist.
    pub fn missing_sibling(&self) -> PathBuf {
        self.dir.path().join("does_not_exist.inp")
    }
}
