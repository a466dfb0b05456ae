//! Error types for regsearch

use crate::data::Formula;
use thiserror::Error;

/// Result type alias for regsearch operations
pub type Result<T> = std::result::Result<T, RegsearchError>;

/// Main error type
#[derive(Error, Debug)]
pub enum RegsearchError {
    /// Invalid split fraction, neighborhood size, grid, fold count...
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Mismatched lengths, non-finite values, schema mismatch
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    /// The linear fitter could not produce a solution for `formula`
    #[error("Fit failed for [{formula}]: {reason}")]
    FitFailure { formula: Formula, reason: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Search cancelled before any candidate was evaluated")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RegsearchError {
    /// Build a fit failure for `formula`
    pub fn fit_failure(formula: &Formula, reason: impl Into<String>) -> Self {
        RegsearchError::FitFailure {
            formula: formula.clone(),
            reason: reason.into(),
        }
    }

    /// True for errors that must stop a run before any search starts
    pub fn is_fail_fast(&self) -> bool {
        matches!(
            self,
            RegsearchError::ConfigError(_)
                | RegsearchError::DataError(_)
                | RegsearchError::FeatureNotFound(_)
                | RegsearchError::ShapeError { .. }
        )
    }
}

impl From<polars::error::PolarsError> for RegsearchError {
    fn from(err: polars::error::PolarsError) -> Self {
        RegsearchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RegsearchError {
    fn from(err: serde_json::Error) -> Self {
        RegsearchError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RegsearchError {
    fn from(err: ndarray::ShapeError) -> Self {
        RegsearchError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
