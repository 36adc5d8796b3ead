//! C-compatible status codes.
//!
//! [`StatusCode`] is the only outcome channel of a dispatch. Conversions
//! from the bridge's internal error types are provided.

use crate::bridge::DispatchError;
use crate::state::ProtocolError;

/// Outcome of one dispatch.
///
/// Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The method completed; its output slots are populated.
    Success = 0,
    /// The method failed; no further information is available.
    Failure = 1,
    /// The method failed; `outputs[0]` holds the address of a message.
    FailureWithMessage = -1,
}

impl StatusCode {
    /// The raw value written to the caller's status slot.
    pub fn raw(self) -> i32 {
        self as i32
    }

    /// Parse a raw status. Unrecognized values return `None`.
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Failure),
            -1 => Some(Self::FailureWithMessage),
            _ => None,
        }
    }
}

impl From<&ProtocolError> for StatusCode {
    fn from(_e: &ProtocolError) -> Self {
        StatusCode::Failure
    }
}

impl From<&DispatchError> for StatusCode {
    fn from(e: &DispatchError) -> Self {
        match e {
            DispatchError::Protocol(p) => StatusCode::from(p),
            DispatchError::Engine(_) => StatusCode::FailureWithMessage,
        }
    }
}
