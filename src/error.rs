//! Error types for the library
//!
//! Each file format gets its own enum so callers can tell a bad mesh from a
//! bad checkpoint. [`OptimizerError`] wraps all of them for code that
//! touches several formats at once.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reading or writing an STL mesh failed
#[derive(Debug, Error)]
pub enum StlError {
    #[error("STL i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("binary STL is {actual} bytes but its header declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("binary STL is too short to hold a header ({0} bytes)")]
    Truncated(u64),

    #[error("ASCII STL line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// A genome record could not be parsed or stored
#[derive(Debug, Error)]
pub enum GenomeError {
    #[error("genome i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("genome record is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("genome field `{field}` is not a number: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("genome declares {expected} values but the record holds {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },

    #[error("genome bounds [{min}, {max}] are not a finite, ordered range")]
    InvalidBounds { min: f64, max: f64 },

    #[error("genome value {index} is {value}, outside [{min}, {max}]")]
    ValueOutOfBounds {
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("genome bounds [{actual_min}, {actual_max}] differ from the run's [{expected_min}, {expected_max}]")]
    BoundsMismatch {
        expected_min: f64,
        expected_max: f64,
        actual_min: f64,
        actual_max: f64,
    },
}

/// The run configuration file is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration line {line}: {text:?}")]
    InvalidLine { line: usize, text: String },

    #[error("missing configuration key `{0}`")]
    MissingKey(&'static str),

    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{0}")]
    Validation(String),
}

/// Any error the optimizer library can produce
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Stl(#[from] StlError),

    #[error(transparent)]
    Genome(#[from] GenomeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = OptimizerError> = std::result::Result<T, E>;
