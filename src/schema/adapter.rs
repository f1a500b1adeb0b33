//! Adapter for converting gaze.sample.v1 records into canonical samples

use crate::error::ComputeError;
use crate::schema::record::{SampleRecord, TimestampUnit, ValidationError};
use crate::types::{Sample, NO_RESPONSE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Case-insensitive `prefix*suffix` pattern for accepted stimulus ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusPattern {
    prefix: String,
    suffix: String,
}

impl StimulusPattern {
    /// Parse a pattern with at most one `*` wildcard, e.g. `trog*.png`
    pub fn parse(pattern: &str) -> Result<Self, ComputeError> {
        let (prefix, suffix) = match pattern.split_once('*') {
            Some((prefix, suffix)) if !suffix.contains('*') => (prefix, suffix),
            Some(_) => {
                return Err(ComputeError::InvalidConfig(format!(
                    "stimulus pattern may contain one '*': {}",
                    pattern
                )))
            }
            None => (pattern, ""),
        };
        Ok(Self {
            prefix: prefix.to_lowercase(),
            suffix: suffix.to_lowercase(),
        })
    }

    pub fn matches(&self, stimulus_id: &str) -> bool {
        let id = stimulus_id.trim().to_lowercase();
        id.len() >= self.prefix.len() + self.suffix.len()
            && id.starts_with(&self.prefix)
            && id.ends_with(&self.suffix)
    }
}

/// Subject id derived from an export file name: the part of the stem after
/// the first `_` (`control_24_trog.ndjson` -> `24_trog`), or the whole stem.
pub fn subject_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(match stem.split_once('_') {
        Some((_, rest)) => rest.to_string(),
        None => stem.to_string(),
    })
}

/// Adapter for converting sample records to canonical samples
#[derive(Debug, Clone, Default)]
pub struct SampleAdapter {
    unit: TimestampUnit,
    default_subject: Option<String>,
    stimulus_pattern: Option<StimulusPattern>,
}

impl SampleAdapter {
    pub fn new(unit: TimestampUnit) -> Self {
        Self {
            unit,
            ..Default::default()
        }
    }

    /// Subject id for records that do not carry one
    pub fn with_default_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.default_subject = Some(subject_id.into());
        self
    }

    /// Drop records whose stimulus id does not match `pattern`
    pub fn with_stimulus_pattern(mut self, pattern: StimulusPattern) -> Self {
        self.stimulus_pattern = Some(pattern);
        self
    }

    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SampleRecord>, ComputeError> {
        let records: Vec<SampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to canonical samples.
    ///
    /// Missing numeric fields become 0, so a record without coordinates is a
    /// dropout for the cleaning stage. Records outside the stimulus pattern are
    /// skipped. An invalid record, or one with no subject id when the adapter
    /// has no default, fails the whole input.
    pub fn to_samples(&self, records: &[SampleRecord]) -> Result<Vec<Sample>, ComputeError> {
        let mut samples = Vec::with_capacity(records.len());
        let mut rejected = 0usize;

        for (idx, record) in records.iter().enumerate() {
            record.validate().map_err(|e| {
                ComputeError::InvalidSample(format!("record {}: {}", idx, e))
            })?;

            let stimulus_id = record.stimulus_id.trim();
            if let Some(pattern) = &self.stimulus_pattern {
                if !pattern.matches(stimulus_id) {
                    rejected += 1;
                    continue;
                }
            }

            let subject_id = record
                .subject_id
                .as_deref()
                .or(self.default_subject.as_deref())
                .ok_or_else(|| ComputeError::MissingField(format!("record {}: subject_id", idx)))?;

            samples.push(Sample::new(
                subject_id.trim(),
                stimulus_id,
                self.unit.to_seconds(record.timestamp.unwrap_or(0.0)),
                record.x.unwrap_or(0.0),
                record.y.unwrap_or(0.0),
                record.response_code.unwrap_or(NO_RESPONSE),
            ));
        }

        if rejected > 0 {
            info!(rejected, "records dropped by stimulus pattern");
        }
        Ok(samples)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[SampleRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    subject_id: record.subject_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// An input left out of a batch, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInput {
    pub source: String,
    pub error: String,
}

/// Samples gathered from several independent inputs.
///
/// Each input is one unit: a failure skips that input and the rest of the
/// batch still loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchLoad {
    pub samples: Vec<Sample>,
    pub loaded: usize,
    pub skipped: Vec<SkippedInput>,
}

impl BatchLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the outcome of loading one input
    pub fn absorb<E: fmt::Display>(
        &mut self,
        source: impl Into<String>,
        result: Result<Vec<Sample>, E>,
    ) {
        let source = source.into();
        match result {
            Ok(samples) => {
                debug!(source = %source, samples = samples.len(), "loaded input");
                self.loaded += 1;
                self.samples.extend(samples);
            }
            Err(e) => {
                warn!(source = %source, error = %e, "skipping input");
                self.skipped.push(SkippedInput {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub subject_id: Option<String>,
    pub error: ValidationError,
}
