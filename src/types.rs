//! Core types for the gazeflux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples, the exploration window, labeled samples, segments and
//! the per-stimulus metrics that downstream consumers read.
//!
//! Undefined values are `None` and serialize as `null`; they are never folded
//! into a numeric default.

use serde::{Deserialize, Serialize};

/// Response code meaning "no answer registered yet"
pub const NO_RESPONSE: i32 = 0;

/// A single gaze sample from the canonical sample table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Subject (participant) identifier
    pub subject_id: String,
    /// Stimulus identifier
    pub stimulus_id: String,
    /// Sample time in seconds
    pub time_sec: f64,
    /// Horizontal gaze coordinate
    pub x: f64,
    /// Vertical gaze coordinate
    pub y: f64,
    /// 0 = no response, 1..=4 = answer given
    pub response_code: i32,
}

impl Sample {
    pub fn new(
        subject_id: impl Into<String>,
        stimulus_id: impl Into<String>,
        time_sec: f64,
        x: f64,
        y: f64,
        response_code: i32,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            stimulus_id: stimulus_id.into(),
            time_sec,
            x,
            y,
            response_code,
        }
    }

    /// Both coordinates exactly zero (sensor dropout)
    pub fn is_dropout(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn has_response(&self) -> bool {
        self.response_code != NO_RESPONSE
    }
}

/// Pre-response portion of one subject-stimulus trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationWindow {
    /// Samples with no response strictly before the first response, time-sorted
    pub samples: Vec<Sample>,
    /// Time of the first sample of the trial
    pub t0: Option<f64>,
    /// Time of the first response, or of the last sample when none was given
    pub t_response: Option<f64>,
    /// `t_response - t0`
    pub response_time: Option<f64>,
    /// Code of the first response, if any
    pub response_code: Option<i32>,
}

impl ExplorationWindow {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Velocity classification of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeLabel {
    Fixation,
    Saccade,
}

impl GazeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeLabel::Fixation => "fixation",
            GazeLabel::Saccade => "saccade",
        }
    }
}

/// A sample annotated by the velocity classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    #[serde(flatten)]
    pub sample: Sample,
    /// x delta to the previous sample (0 for the first)
    pub dx: f64,
    /// y delta to the previous sample (0 for the first)
    pub dy: f64,
    /// Time delta to the previous sample after epsilon clamping
    pub dt: f64,
    /// Whether `dt` was replaced by the epsilon
    pub dt_clamped: bool,
    /// Instantaneous speed, always finite and >= 0
    pub speed: f64,
    pub label: GazeLabel,
    /// Contiguous run id, starting at 1
    pub segment_id: u32,
}

/// Output of the velocity classifier for one exploration window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub samples: Vec<LabeledSample>,
    /// Velocity threshold actually applied (never below the floor)
    pub threshold: f64,
}

/// A contiguous run of same-label samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: u32,
    pub label: GazeLabel,
    pub t_start: f64,
    pub t_end: f64,
    /// `t_end - t_start`
    pub duration: f64,
    pub sample_count: usize,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

/// Scalar metrics for one subject on one stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusMetrics {
    pub subject_id: String,
    pub stimulus_id: String,
    pub response_code: Option<i32>,
    pub response_time: Option<f64>,
    pub saccade_count: usize,
    pub mean_saccade_duration: Option<f64>,
    /// Fixation segments at or above the minimum duration only
    pub fixation_count: usize,
    pub mean_fixation_duration: Option<f64>,
    /// Bounding-box area of the exploration window
    pub dispersion_area: f64,
    pub velocity_threshold_used: Option<f64>,
}

/// Consolidated metrics for one subject across all of its stimuli
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject_id: String,
    /// Stimuli with a defined response time
    pub stimulus_count: usize,
    pub mean_response_time: Option<f64>,
    pub total_saccades: usize,
    /// Saccade-count weighted mean of per-stimulus means
    pub mean_saccade_duration: Option<f64>,
    pub total_fixations: usize,
    /// Fixation-count weighted mean of per-stimulus means
    pub mean_fixation_duration: Option<f64>,
    pub mean_dispersion: Option<f64>,
}

/// Everything computed for one subject-stimulus unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusAnalysis {
    pub window: ExplorationWindow,
    /// Absent when the exploration window is empty
    pub classification: Option<Classification>,
    pub segments: Vec<Segment>,
    pub metrics: StimulusMetrics,
}
