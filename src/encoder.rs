//! Report encoding
//!
//! This module wraps the metric and comparison tables into JSON reports that
//! carry producer and provenance metadata, so a persisted table can be traced
//! back to the configuration and build that computed it.

use crate::accumulator::{GroupAccumulator, SegmentRecord};
use crate::cleaning::CleaningReport;
use crate::config::IvtConfig;
use crate::error::ComputeError;
use crate::schema::SkippedInput;
use crate::stats::{
    pairwise_differences, summarize_differences, ComparisonRow, DifferenceSummary, GroupComparator,
    PairwiseDifference, RankTest,
};
use crate::types::{StimulusMetrics, SubjectSummary};
use crate::{GAZEFLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "gaze.report.v1";

/// Who computed a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Per-group metrics report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub group: String,
    pub config: IvtConfig,
    pub cleaning: CleaningReport,
    pub metrics: Vec<StimulusMetrics>,
    pub segments: Vec<SegmentRecord>,
    pub subjects: Vec<SubjectSummary>,
    /// Inputs left out of this run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_inputs: Vec<SkippedInput>,
}

impl MetricsReport {
    pub fn with_skipped_inputs(mut self, skipped: Vec<SkippedInput>) -> Self {
        self.skipped_inputs = skipped;
        self
    }
}

/// Two-group comparison report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub group_a: String,
    pub group_b: String,
    pub rank_test: RankTest,
    pub by_stimulus: Vec<ComparisonRow>,
    pub consolidated: Vec<ComparisonRow>,
    pub pairwise: Vec<PairwiseDifference>,
    pub pairwise_summary: Vec<DifferenceSummary>,
}

/// Encoder for metrics and comparison reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: GAZEFLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Build the metrics report of one group
    pub fn encode_metrics(
        &self,
        group: &GroupAccumulator,
        config: &IvtConfig,
        cleaning: CleaningReport,
    ) -> MetricsReport {
        MetricsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            group: group.group().to_string(),
            config: config.clone(),
            cleaning,
            metrics: group.metrics().to_vec(),
            segments: group.segments().to_vec(),
            subjects: group.subject_summaries(),
            skipped_inputs: Vec::new(),
        }
    }

    /// Build the comparison report of two groups
    pub fn encode_comparison(
        &self,
        group_a: &GroupAccumulator,
        group_b: &GroupAccumulator,
        comparator: &GroupComparator,
    ) -> ComparisonReport {
        let pairwise = pairwise_differences(group_a.metrics(), group_b.metrics());
        let pairwise_summary = summarize_differences(&pairwise);

        ComparisonReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            group_a: group_a.group().to_string(),
            group_b: group_b.group().to_string(),
            rank_test: comparator.rank_test(),
            by_stimulus: comparator.compare_by_stimulus(group_a.metrics(), group_b.metrics()),
            consolidated: comparator
                .compare_summaries(&group_a.subject_summaries(), &group_b.subject_summaries()),
            pairwise,
            pairwise_summary,
        }
    }

    /// Encode any report to a JSON string
    pub fn encode_to_json<T: Serialize>(&self, report: &T, pretty: bool) -> Result<String, ComputeError> {
        let result = if pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        result.map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GazeProcessor;
    use crate::types::Sample;

    fn trial(subject: &str, stimulus: &str, jump: f64, answer_at: usize) -> Vec<Sample> {
        (0..12)
            .map(|i| {
                let x = if i >= 6 { 0.2 + jump } else { 0.2 };
                let code = if i >= answer_at { 2 } else { 0 };
                Sample::new(subject, stimulus, i as f64 * 0.02, x, 0.4 + i as f64 * 0.01, code)
            })
            .collect()
    }

    fn group(name: &str, subjects: &[&str], jump: f64) -> (GroupAccumulator, CleaningReport) {
        let samples: Vec<Sample> = subjects
            .iter()
            .flat_map(|s| trial(s, "trog1.png", jump, 10))
            .collect();
        let processed = GazeProcessor::default().process_table(&samples);
        let mut acc = GroupAccumulator::new(name);
        acc.extend(&processed.analyses);
        (acc, processed.cleaning)
    }

    #[test]
    fn test_encode_metrics_report() {
        let (acc, cleaning) = group("control", &["c1", "c2"], 0.3);
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode_metrics(&acc, &IvtConfig::default(), cleaning);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, GAZEFLUX_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.group, "control");
        assert_eq!(report.metrics.len(), 2);
        assert_eq!(report.subjects.len(), 2);
        assert_eq!(report.cleaning.input, 24);
    }

    #[test]
    fn test_skipped_inputs_are_reported() {
        let (acc, cleaning) = group("control", &["c1"], 0.3);
        let encoder = ReportEncoder::new();
        let report = encoder.encode_metrics(&acc, &IvtConfig::default(), cleaning);
        let json = encoder.encode_to_json(&report, false).unwrap();
        assert!(!json.contains("skipped_inputs"));

        let report = report.with_skipped_inputs(vec![SkippedInput {
            source: "control_02.ndjson".to_string(),
            error: "Failed to parse line 2".to_string(),
        }]);
        let parsed: serde_json::Value =
            serde_json::from_str(&encoder.encode_to_json(&report, false).unwrap()).unwrap();
        assert_eq!(parsed["skipped_inputs"][0]["source"], "control_02.ndjson");
        assert_eq!(parsed["metrics"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_encode_comparison_with_empty_group() {
        let (a, _) = group("control", &["c1", "c2"], 0.3);
        let b = GroupAccumulator::new("aphasic");
        let report = ReportEncoder::new().encode_comparison(&a, &b, &GroupComparator::default());

        assert!(!report.by_stimulus.is_empty());
        assert!(report.by_stimulus.iter().all(|r| r.group_b.n == 0 && r.p_value.is_none()));
        assert!(report.pairwise.is_empty());
        assert!(report.pairwise_summary.is_empty());
    }

    #[test]
    fn test_encode_to_json() {
        let (a, _) = group("control", &["c1"], 0.3);
        let (b, _) = group("aphasic", &["a1"], 0.1);
        let encoder = ReportEncoder::new();
        let report = encoder.encode_comparison(&a, &b, &GroupComparator::default());
        let json = encoder.encode_to_json(&report, false).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("computed_at_utc").is_some());
        assert_eq!(parsed["pairwise"].as_array().unwrap().len(), 1);
    }
}
