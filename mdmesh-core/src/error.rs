//! Error types for mdmesh-core.

use thiserror::Error;

/// Result type alias for mdmesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for mdmesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid dimension or geometry configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed geometry XML.
    #[error("geometry XML error: {0}")]
    GeometryXml(String),

    /// Index outside the workspace extents.
    #[error("index {index:?} is outside the workspace shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    /// Array length does not match the workspace shape.
    #[error("expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Threshold range error.
    #[error("threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// Metadata (de)serialization error.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors raised by threshold range policies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    /// The maximum is below the minimum.
    #[error("invalid threshold range: maximum {max} is less than minimum {min}")]
    InvalidRange { min: f64, max: f64 },

    /// Bounds were requested before `calculate()` established them.
    #[error("{0} threshold range has not been calculated")]
    NotCalculated(&'static str),

    /// `calculate()` needs a workspace that was never set.
    #[error("{0} threshold range has no workspace to calculate from")]
    NoWorkspace(&'static str),
}
