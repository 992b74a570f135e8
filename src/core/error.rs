//! Error handling for the binned dataset core.
//!
//! Contract violations (length mismatches, row-count disagreements, malformed
//! binary payloads) surface as `Err` values through the crate-wide [`Result`]
//! alias. Recoverable conditions are reported through the logging facility
//! instead and leave state unchanged.

use std::io;
use thiserror::Error;

/// Main error type for the binned dataset core.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Dataset-level contract violations
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Binary serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Type alias for Results using DatasetError
pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        DatasetError::Config {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        DatasetError::Dataset {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        DatasetError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        DatasetError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        DatasetError::Serialization {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DatasetError::Config { .. } => "config",
            DatasetError::Dataset { .. } => "dataset",
            DatasetError::DimensionMismatch { .. } => "dimension_mismatch",
            DatasetError::InvalidParameter { .. } => "invalid_parameter",
            DatasetError::Serialization { .. } => "serialization",
            DatasetError::Io { .. } => "io",
        }
    }
}
