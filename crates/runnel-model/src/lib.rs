//! Model description loader for the Runnel runoff engine.
//!
//! Reads the plain-text model format organized into bracketed sections
//! (`[OPTIONS]`, `[RAINGAGES]`, `[SUBCATCHMENTS]`, `[SUBAREAS]`,
//! `[INFILTRATION]`, ...) into a validated [`Model`]. Sections that
//! describe hydraulic routing, water quality and other processes the
//! runoff engine does not simulate are accepted and ignored.
//!
//! Every failure is a [`ModelError`] naming the section, line and value
//! at fault, suitable for display to the person editing the file.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod load;
pub mod model;
pub mod options;
pub mod section;

mod parse;

pub use error::ModelError;
pub use load::load_model;
pub use model::{HortonParams, Model, RainFormat, RainGage, RouteTo, Subarea, Subcatchment};
pub use options::{FlowUnits, Options, Timestamp};
pub use section::{Row, Section, SectionMap};
