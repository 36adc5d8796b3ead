//! Core types and traits for the Runnel simulation bridge.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the bridge dispatcher and the engines it drives:
//! the [`Diagnostic`] message type that crosses the adapter boundary, the
//! engine-level error enums, and the [`EngineAdapter`] contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{Diagnostic, StepError};
pub use traits::{EngineAdapter, EngineMetadata};
