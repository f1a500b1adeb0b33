//! gaze.sample.v1 record definition
//!
//! One record per eye-tracker sample as exported by the acquisition software.
//! Numeric fields may be missing; the adapter coerces them to 0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current schema version
pub const SCHEMA_VERSION: &str = "gaze.sample.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Unit of the raw `timestamp` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
    /// Native unit of the acquisition software export
    #[default]
    Microseconds,
}

impl TimestampUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampUnit::Seconds => "seconds",
            TimestampUnit::Milliseconds => "milliseconds",
            TimestampUnit::Microseconds => "microseconds",
        }
    }

    /// Convert a raw timestamp to seconds
    pub fn to_seconds(&self, raw: f64) -> f64 {
        match self {
            TimestampUnit::Seconds => raw,
            TimestampUnit::Milliseconds => raw / 1e3,
            TimestampUnit::Microseconds => raw / 1e6,
        }
    }
}

/// A raw gaze sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Falls back to the adapter's default subject when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(alias = "stimulus", alias = "stimuli")]
    pub stimulus_id: String,
    /// Raw timestamp in the adapter's unit
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    /// Answer key pressed (0 = none)
    #[serde(default, alias = "key")]
    pub response_code: Option<i32>,
}

impl SampleRecord {
    pub fn new(subject_id: &str, stimulus_id: &str, timestamp: f64, x: f64, y: f64, key: i32) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            subject_id: Some(subject_id.to_string()),
            stimulus_id: stimulus_id.to_string(),
            timestamp: Some(timestamp),
            x: Some(x),
            y: Some(y),
            response_code: Some(key),
        }
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }
        if self.subject_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ValidationError::EmptySubject);
        }
        if self.stimulus_id.trim().is_empty() {
            return Err(ValidationError::EmptyStimulus);
        }
        for (field, value) in [("timestamp", self.timestamp), ("x", self.x), ("y", self.y)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ValidationError::NonFinite(field));
            }
        }
        Ok(())
    }
}

/// Validation errors for sample records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Empty subject_id")]
    EmptySubject,

    #[error("Empty stimulus_id")]
    EmptyStimulus,

    #[error("Non-finite value in field {0}")]
    NonFinite(&'static str),
}
