//! Group-level row accumulation
//!
//! The orchestrating caller owns a `GroupAccumulator` per group and feeds it
//! every analyzed unit. Nothing is accumulated implicitly or globally. The
//! accumulator can be persisted as JSON between runs.

use crate::summary::summarize_subjects;
use crate::types::{Segment, StimulusAnalysis, StimulusMetrics, SubjectSummary};
use serde::{Deserialize, Serialize};

/// A segment tagged with the unit it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub subject_id: String,
    pub stimulus_id: String,
    #[serde(flatten)]
    pub segment: Segment,
}

/// All rows produced so far for one group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAccumulator {
    /// Group label (e.g. "control")
    group: String,
    metrics: Vec<StimulusMetrics>,
    segments: Vec<SegmentRecord>,
}

impl GroupAccumulator {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Default::default()
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Record one analyzed subject-stimulus unit
    pub fn push(&mut self, analysis: &StimulusAnalysis) {
        let metrics = &analysis.metrics;
        self.segments
            .extend(analysis.segments.iter().map(|segment| SegmentRecord {
                subject_id: metrics.subject_id.clone(),
                stimulus_id: metrics.stimulus_id.clone(),
                segment: segment.clone(),
            }));
        self.metrics.push(metrics.clone());
    }

    pub fn extend<'a>(&mut self, analyses: impl IntoIterator<Item = &'a StimulusAnalysis>) {
        for analysis in analyses {
            self.push(analysis);
        }
    }

    pub fn metrics(&self) -> &[StimulusMetrics] {
        &self.metrics
    }

    pub fn segments(&self) -> &[SegmentRecord] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Per-subject summaries of everything accumulated
    pub fn subject_summaries(&self) -> Vec<SubjectSummary> {
        summarize_subjects(&self.metrics)
    }

    /// Load an accumulator from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the accumulator to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
