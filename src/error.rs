//! Error types for gazeflux
//!
//! Only ingestion, configuration and encoding can fail. The analysis core
//! degrades to undefined or empty outputs instead of returning errors.

use thiserror::Error;

/// Errors that can occur outside the analysis core
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse sample input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
