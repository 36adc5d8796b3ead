//! Argument buffer capacity and slot layout.
//!
//! Both buffers must hold at least the negotiated capacity. The check runs
//! before any slot is read or written.

use crate::state::ProtocolError;

/// Slots per buffer when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Smallest usable capacity: `ReportArguments` writes two slots.
pub const MIN_CAPACITY: usize = 2;

/// Reject buffers shorter than `capacity`.
pub fn check_buffers(inputs: &[f64], outputs: &[f64], capacity: usize) -> Result<(), ProtocolError> {
    if inputs.len() < capacity || outputs.len() < capacity {
        return Err(ProtocolError::BufferTooSmall {
            inputs: inputs.len(),
            outputs: outputs.len(),
            capacity,
        });
    }
    Ok(())
}

/// Values a successful method writes into the output buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reply {
    /// `Initialize`: no slots.
    Initialized,
    /// `Calculate`: the adapter already wrote its slots.
    Calculated,
    /// `ReportVersion`: `outputs[0]`.
    Version(f64),
    /// `ReportArguments`: `outputs[0]` inputs, `outputs[1]` outputs.
    Arguments {
        /// Input arity.
        inputs: usize,
        /// Output arity.
        outputs: usize,
    },
    /// `Cleanup`: no slots.
    CleanedUp,
}

impl Reply {
    /// Write the reply's slots. `outputs` must hold at least [`MIN_CAPACITY`] slots.
    pub fn write_into(self, outputs: &mut [f64]) {
        match self {
            Reply::Version(v) => outputs[0] = v,
            Reply::Arguments { inputs, outputs: n } => {
                outputs[0] = inputs as f64;
                outputs[1] = n as f64;
            }
            Reply::Initialized | Reply::Calculated | Reply::CleanedUp => {}
        }
    }
}
