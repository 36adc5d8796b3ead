//! Loader and validation errors.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Errors detected while loading or validating a model description.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// No model file path was configured.
    EmptyPath,
    /// The model file does not exist.
    FileNotFound {
        /// The configured path.
        path: PathBuf,
    },
    /// The model path names a directory.
    IsDirectory {
        /// The configured path.
        path: PathBuf,
    },
    /// The model file exists but could not be read.
    Io {
        /// The configured path.
        path: PathBuf,
        /// Operating system error text.
        reason: String,
    },
    /// A `[` header line is not closed or names nothing.
    MalformedHeader {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },
    /// A data line appears before the first section header.
    DataOutsideSection {
        /// 1-based line number.
        line: usize,
    },
    /// A section the engine requires is absent.
    MissingSection {
        /// Section name.
        section: &'static str,
    },
    /// `[SUBCATCHMENTS]` is missing or has no rows.
    NoSubcatchments,
    /// A row ends before a required field.
    MissingField {
        /// Section name.
        section: &'static str,
        /// 1-based line number.
        line: usize,
        /// Name of the missing column.
        field: &'static str,
    },
    /// A numeric column could not be parsed.
    InvalidNumber {
        /// Section name.
        section: &'static str,
        /// 1-based line number.
        line: usize,
        /// Column name.
        field: &'static str,
        /// The unparsable text.
        value: String,
    },
    /// A column parsed but violates a physical or structural constraint.
    InvalidValue {
        /// Section name.
        section: &'static str,
        /// 1-based line number.
        line: usize,
        /// Column name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// An option keyword is recognized but its value is not supported.
    UnsupportedOption {
        /// 1-based line number.
        line: usize,
        /// Option keyword.
        key: String,
        /// The unsupported value.
        value: String,
    },
    /// A row names an element that is not defined.
    UnknownReference {
        /// Section containing the reference.
        section: &'static str,
        /// 1-based line number.
        line: usize,
        /// Kind of element referenced (e.g. "rain gage").
        kind: &'static str,
        /// The undefined name.
        name: String,
    },
    /// Two rows of a section define the same element.
    DuplicateName {
        /// Section name.
        section: &'static str,
        /// 1-based line number of the second definition.
        line: usize,
        /// The repeated name.
        name: String,
    },
    /// A subcatchment lacks its row in a companion section.
    MissingEntry {
        /// Companion section (e.g. `SUBAREAS`).
        section: &'static str,
        /// Subcatchment name.
        name: String,
    },
    /// The end of the simulation is not after its start.
    EmptyHorizon {
        /// Start, as written in the file.
        start: String,
        /// End, as written in the file.
        end: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "input file path is not provided"),
            Self::FileNotFound { path } => {
                write!(f, "input file does not exist: {}", path.display())
            }
            Self::IsDirectory { path } => {
                write!(f, "input file path is a directory: {}", path.display())
            }
            Self::Io { path, reason } => {
                write!(f, "cannot read input file {}: {reason}", path.display())
            }
            Self::MalformedHeader { line, text } => {
                write!(f, "line {line}: malformed section header '{text}'")
            }
            Self::DataOutsideSection { line } => {
                write!(f, "line {line}: data appears before the first section header")
            }
            Self::MissingSection { section } => {
                write!(f, "required section [{section}] is missing")
            }
            Self::NoSubcatchments => write!(
                f,
                "model has no subcatchments: [SUBCATCHMENTS] is missing or empty"
            ),
            Self::MissingField {
                section,
                line,
                field,
            } => write!(f, "[{section}] line {line}: missing {field}"),
            Self::InvalidNumber {
                section,
                line,
                field,
                value,
            } => write!(f, "[{section}] line {line}: {field} '{value}' is not a number"),
            Self::InvalidValue {
                section,
                line,
                field,
                reason,
            } => write!(f, "[{section}] line {line}: {field} {reason}"),
            Self::UnsupportedOption { line, key, value } => {
                write!(f, "[OPTIONS] line {line}: {key} {value} is not supported")
            }
            Self::UnknownReference {
                section,
                line,
                kind,
                name,
            } => write!(f, "[{section}] line {line}: unknown {kind} '{name}'"),
            Self::DuplicateName {
                section,
                line,
                name,
            } => write!(f, "[{section}] line {line}: '{name}' is defined twice"),
            Self::MissingEntry { section, name } => {
                write!(f, "subcatchment '{name}' has no entry in [{section}]")
            }
            Self::EmptyHorizon { start, end } => {
                write!(f, "simulation end {end} is not after start {start}")
            }
        }
    }
}

impl Error for ModelError {}
