//! Simulation lifecycle state machine.
//!
//! ```text
//!  Uninitialized ──Initialize ok──▶ Ready ──Cleanup──▶ Finalized
//!        │  ▲                        │  ▲
//!        └──┘ Initialize err         └──┘ Calculate (ok or err)
//! ```
//!
//! Metadata methods are admitted in every state. The state never moves
//! backward; a driver that needs a fresh simulation creates a new bridge
//! instance.

use std::error::Error;
use std::fmt;

use crate::method::MethodCode;

/// Errors rejected before any engine code runs. All map to `Failure`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The method code is not recognized.
    UnknownMethod {
        /// The raw code.
        code: i32,
    },
    /// An argument buffer is shorter than the negotiated capacity.
    BufferTooSmall {
        /// Length of the input buffer.
        inputs: usize,
        /// Length of the output buffer.
        outputs: usize,
        /// Negotiated capacity.
        capacity: usize,
    },
    /// `Calculate` or `Cleanup` before a successful `Initialize`.
    NotInitialized {
        /// The rejected method.
        method: MethodCode,
    },
    /// `Initialize` while an engine is live.
    AlreadyInitialized,
    /// A lifecycle method after `Cleanup`.
    Finalized {
        /// The rejected method.
        method: MethodCode,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { code } => write!(f, "unknown method code {code}"),
            Self::BufferTooSmall {
                inputs,
                outputs,
                capacity,
            } => write!(
                f,
                "argument buffers too small: {inputs} inputs and {outputs} outputs, \
                 capacity is {capacity}"
            ),
            Self::NotInitialized { method } => {
                write!(f, "{method} called before Initialize")
            }
            Self::AlreadyInitialized => write!(f, "Initialize called twice"),
            Self::Finalized { method } => write!(f, "{method} called after Cleanup"),
        }
    }
}

impl Error for ProtocolError {}

/// Where a bridge instance is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SimulationState {
    /// No engine exists yet.
    #[default]
    Uninitialized,
    /// An engine is live and can be stepped.
    Ready,
    /// The engine was torn down; only metadata calls are admitted.
    Finalized,
}

impl SimulationState {
    /// Whether `method` may run in this state.
    pub fn admits(self, method: MethodCode) -> Result<(), ProtocolError> {
        use crate::method::MethodCode::*;
        use SimulationState::*;
        match (self, method) {
            (_, ReportVersion | ReportArguments) => Ok(()),
            (Uninitialized, Initialize) => Ok(()),
            (Uninitialized, Calculate | Cleanup) => Err(ProtocolError::NotInitialized { method }),
            (Ready, Initialize) => Err(ProtocolError::AlreadyInitialized),
            (Ready, Calculate | Cleanup) => Ok(()),
            (Finalized, Initialize | Calculate | Cleanup) => {
                Err(ProtocolError::Finalized { method })
            }
        }
    }

    /// Whether an engine is live.
    pub fn has_engine(self) -> bool {
        self == SimulationState::Ready
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Ready => "Ready",
            Self::Finalized => "Finalized",
        };
        f.write_str(name)
    }
}
