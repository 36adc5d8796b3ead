//! Status codes of the handle API.
//!
//! The fixed-signature entry point reports through the protocol's
//! [`StatusCode`](runnel_bridge::StatusCode) (0, 1, -1). The handle API
//! functions return a [`RunnelStatus`] instead and pass the protocol
//! status through an out-parameter, so the two channels never mix.

use runnel_engine::BindingError;

/// C-compatible status returned by every handle API function.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnelStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -2,
    /// An argument is null, not UTF-8, or otherwise invalid.
    InvalidArgument = -3,
    /// A configuration value was rejected.
    ConfigError = -4,
    /// The process-default instance has a live engine.
    InUse = -5,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -20,
    /// A Rust panic was caught at the C boundary.
    Panicked = -128,
}

impl From<&BindingError> for RunnelStatus {
    fn from(_e: &BindingError) -> Self {
        RunnelStatus::ConfigError
    }
}
