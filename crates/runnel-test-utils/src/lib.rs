//! Test utilities and mock types for Runnel development.
//!
//! Provides model text fixtures ([`fixtures`]), on-disk model files
//! ([`ModelFile`]) and a scripted [`EngineAdapter`] implementation
//! ([`ScriptedAdapter`]) for exercising the bridge dispatcher without a
//! real solver.
//!
//! [`EngineAdapter`]: runnel_core::EngineAdapter

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mock;

pub use fixtures::{ModelFile, ModelTextBuilder};
pub use mock::{CallCounts, MockEngine, ScriptedAdapter};
