//! Error types shared across the Runnel workspace.
//!
//! [`Diagnostic`] is the only error shape allowed to cross the engine
//! adapter boundary: a human-readable message destined for the bridge's
//! out-of-band error channel. [`StepError`] covers engine failures during a
//! single simulation step.

use std::error::Error;
use std::fmt;

/// A human-readable failure description produced by an engine adapter.
///
/// The bridge converts a `Diagnostic` into the NUL-terminated error message
/// whose address is returned to the caller. Interior NUL bytes are replaced
/// at construction so the message is always representable as a C string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
}

impl Diagnostic {
    /// Create a diagnostic from a message.
    ///
    /// An empty message is replaced by `"unspecified engine failure"`; the
    /// error channel never carries empty text.
    pub fn new(message: impl Into<String>) -> Self {
        let mut message: String = message.into();
        if message.contains('\0') {
            message = message.replace('\0', " ");
        }
        if message.trim().is_empty() {
            message = String::from("unspecified engine failure");
        }
        Self { message }
    }

    /// Build a diagnostic from an error and its full `source()` chain.
    ///
    /// Each cause is appended after `": "`, outermost first.
    pub fn from_error(err: &dyn Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        Self::new(message)
    }

    /// Prefix the message with context, e.g. the operation that failed.
    pub fn context(self, context: &str) -> Self {
        Self::new(format!("{context}: {}", self.message))
    }

    /// The message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consume the diagnostic, returning the message text.
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Diagnostic {}

impl From<StepError> for Diagnostic {
    fn from(e: StepError) -> Self {
        Diagnostic::from_error(&e)
    }
}

/// Errors raised by an engine while advancing one step.
///
/// A step that fails with any of these is not committed: the engine's
/// state, including its simulated clock, is exactly what it was before
/// the call.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// The forcing value is NaN, infinite, or negative.
    InvalidForcing {
        /// The rejected value.
        value: f64,
    },
    /// The simulation has already reached its configured end time.
    HorizonReached {
        /// Elapsed simulated time when the step was requested, in seconds.
        elapsed_seconds: f64,
        /// Configured simulation duration, in seconds.
        duration_seconds: f64,
    },
    /// A state variable became NaN or infinite during the step.
    NonFinite {
        /// Name of the element whose state diverged.
        element: String,
        /// Which quantity diverged.
        quantity: &'static str,
    },
    /// The caller supplied fewer input or output slots than the engine needs.
    ArityMismatch {
        /// Slots required by the engine.
        expected: usize,
        /// Slots supplied by the caller.
        actual: usize,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidForcing { value } => {
                write!(f, "forcing value must be finite and non-negative, got {value}")
            }
            Self::HorizonReached {
                elapsed_seconds,
                duration_seconds,
            } => write!(
                f,
                "simulation horizon reached: elapsed {elapsed_seconds} s of {duration_seconds} s"
            ),
            Self::NonFinite { element, quantity } => {
                write!(f, "{quantity} of '{element}' became non-finite")
            }
            Self::ArityMismatch { expected, actual } => {
                write!(f, "engine needs {expected} argument slots, caller supplied {actual}")
            }
        }
    }
}

impl Error for StepError {}
