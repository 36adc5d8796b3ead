//! Host-callable simulation bridge protocol.
//!
//! A caller that knows only an integer method code and two fixed-length
//! numeric buffers can initialize a stateful simulation, advance it one
//! step at a time, query its metadata and tear it down. Every call yields
//! exactly one [`StatusCode`]; failures that carry text return the address
//! of a NUL-terminated message through the first output slot.
//!
//! The protocol is engine-agnostic: a [`BridgeInstance`] drives any
//! [`EngineAdapter`](runnel_core::EngineAdapter). This crate contains no
//! `unsafe` code; the C ABI lives in `runnel-ffi`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod buffer;
pub mod message;
pub mod method;
pub mod state;
pub mod status;

pub use bridge::{BridgeInstance, BridgeOptions, DispatchError};
pub use buffer::{Reply, DEFAULT_CAPACITY};
pub use message::ErrorMessage;
pub use method::MethodCode;
pub use state::{ProtocolError, SimulationState};
pub use status::StatusCode;
