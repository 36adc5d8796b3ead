//! Method codes understood by the dispatcher.

use std::fmt;

/// A bridge method, parsed from the caller's integer code.
///
/// Values are ABI-stable. Integer codes exist only at the outer layer;
/// everything past [`from_raw`](MethodCode::from_raw) dispatches on this
/// enum.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MethodCode {
    /// Load the configuration and construct the engine.
    Initialize = 0,
    /// Advance the engine one step.
    Calculate = 1,
    /// Report the version number.
    ReportVersion = 2,
    /// Report input and output arity.
    ReportArguments = 3,
    /// Tear the engine down.
    Cleanup = 99,
}

impl MethodCode {
    /// Every method, in code order.
    pub const ALL: [MethodCode; 5] = [
        Self::Initialize,
        Self::Calculate,
        Self::ReportVersion,
        Self::ReportArguments,
        Self::Cleanup,
    ];

    /// Parse a raw code. Unrecognized codes return `None`.
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Initialize),
            1 => Some(Self::Calculate),
            2 => Some(Self::ReportVersion),
            3 => Some(Self::ReportArguments),
            99 => Some(Self::Cleanup),
            _ => None,
        }
    }

    /// The raw code.
    pub fn raw(self) -> i32 {
        self as i32
    }

    /// Whether the method only reports metadata and never changes state.
    pub fn is_metadata(self) -> bool {
        matches!(self, Self::ReportVersion | Self::ReportArguments)
    }
}

impl fmt::Display for MethodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialize => "Initialize",
            Self::Calculate => "Calculate",
            Self::ReportVersion => "ReportVersion",
            Self::ReportArguments => "ReportArguments",
            Self::Cleanup => "Cleanup",
        };
        f.write_str(name)
    }
}
