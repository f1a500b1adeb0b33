//! Analysis configuration
//!
//! All algorithm constants live here. They are fixed per run: nothing in the
//! pipeline learns or adapts them.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default percentile of the speed distribution used as the adaptive threshold
pub const DEFAULT_VELOCITY_PERCENTILE: f64 = 85.0;

/// Default minimum velocity threshold (normalized units per second)
pub const DEFAULT_VELOCITY_FLOOR: f64 = 0.5;

/// Default minimum fixation duration counted by the metric calculator (seconds)
pub const DEFAULT_MIN_FIXATION_DURATION_SEC: f64 = 0.100;

/// Default Tukey fence multiplier for the IQR outlier filter
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Default replacement for non-positive time deltas (seconds)
pub const DEFAULT_TIME_EPSILON_SEC: f64 = 1e-6;

/// Coordinate ranges at or below this are treated as having no variance
pub const DEFAULT_ZERO_RANGE_EPSILON: f64 = 1e-10;

/// Which per-sample speeds feed the adaptive percentile threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSampling {
    /// Every sample of the exploration window, including those whose time
    /// delta was clamped to the epsilon (the first sample always is)
    #[default]
    AllSamples,
    /// Only samples whose time delta was strictly positive
    ExcludeClampedDeltas,
}

/// Configuration for cleaning, normalization and I-VT classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvtConfig {
    /// Percentile (0-100) of sample speeds used as the adaptive threshold
    pub velocity_percentile: f64,
    /// Lower bound of the velocity threshold
    pub velocity_floor: f64,
    /// Fixation segments shorter than this are excluded from fixation metrics
    pub min_fixation_duration_sec: f64,
    /// IQR multiplier for the outlier fences
    pub iqr_multiplier: f64,
    /// Replacement for time deltas <= 0
    pub time_epsilon_sec: f64,
    /// Coordinate ranges at or below this normalize to the constant 0.5
    pub zero_range_epsilon: f64,
    /// Scale coordinates to [0, 1] per subject before analysis
    pub normalize_coordinates: bool,
    /// Speed population used for the percentile threshold
    pub threshold_sampling: ThresholdSampling,
}

impl Default for IvtConfig {
    fn default() -> Self {
        Self {
            velocity_percentile: DEFAULT_VELOCITY_PERCENTILE,
            velocity_floor: DEFAULT_VELOCITY_FLOOR,
            min_fixation_duration_sec: DEFAULT_MIN_FIXATION_DURATION_SEC,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            time_epsilon_sec: DEFAULT_TIME_EPSILON_SEC,
            zero_range_epsilon: DEFAULT_ZERO_RANGE_EPSILON,
            normalize_coordinates: true,
            threshold_sampling: ThresholdSampling::AllSamples,
        }
    }
}

impl IvtConfig {
    /// Check every constant is finite and in range.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !self.velocity_percentile.is_finite()
            || !(0.0..=100.0).contains(&self.velocity_percentile)
        {
            return Err(ComputeError::InvalidConfig(format!(
                "velocity_percentile must be within 0..=100, got {}",
                self.velocity_percentile
            )));
        }
        if !self.velocity_floor.is_finite() || self.velocity_floor <= 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "velocity_floor must be positive, got {}",
                self.velocity_floor
            )));
        }
        if !self.min_fixation_duration_sec.is_finite() || self.min_fixation_duration_sec < 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "min_fixation_duration_sec must be non-negative, got {}",
                self.min_fixation_duration_sec
            )));
        }
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "iqr_multiplier must be non-negative, got {}",
                self.iqr_multiplier
            )));
        }
        if !self.time_epsilon_sec.is_finite() || self.time_epsilon_sec <= 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "time_epsilon_sec must be positive, got {}",
                self.time_epsilon_sec
            )));
        }
        if !self.zero_range_epsilon.is_finite() || self.zero_range_epsilon < 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "zero_range_epsilon must be non-negative, got {}",
                self.zero_range_epsilon
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: IvtConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IvtConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.velocity_percentile, 85.0);
        assert_eq!(config.velocity_floor, 0.5);
        assert_eq!(config.min_fixation_duration_sec, 0.1);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.threshold_sampling, ThresholdSampling::AllSamples);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = IvtConfig::from_json(r#"{"velocity_floor": 1.25}"#).unwrap();
        assert_eq!(config.velocity_floor, 1.25);
        assert_eq!(config.velocity_percentile, DEFAULT_VELOCITY_PERCENTILE);
        assert_eq!(config.time_epsilon_sec, DEFAULT_TIME_EPSILON_SEC);
    }

    #[test]
    fn test_threshold_sampling_from_json() {
        let config =
            IvtConfig::from_json(r#"{"threshold_sampling": "exclude_clamped_deltas"}"#).unwrap();
        assert_eq!(
            config.threshold_sampling,
            ThresholdSampling::ExcludeClampedDeltas
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(IvtConfig::from_json(r#"{"velocity_percentile": 120}"#).is_err());
        assert!(IvtConfig::from_json(r#"{"velocity_floor": 0}"#).is_err());
        assert!(IvtConfig::from_json(r#"{"time_epsilon_sec": -1e-6}"#).is_err());
        assert!(IvtConfig::from_json(r#"{"min_fixation_duration_sec": -0.1}"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = IvtConfig {
            time_epsilon_sec: 1e-4,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(IvtConfig::from_json(&json).unwrap(), config);
    }
}
