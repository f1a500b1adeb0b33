//! Cross-group statistics
//!
//! Consumes metric tables produced by the pipeline for two groups and compares
//! them: descriptive statistics per side plus a two-sample rank test, either
//! per stimulus or over subject summaries. A group with no rows is tolerated;
//! its statistics come out undefined rather than failing the comparison.

mod differences;
mod rank;

pub use differences::{pairwise_differences, summarize_differences, DifferenceSummary, PairwiseDifference};
pub use rank::{RankTest, RankTestOutcome, EXACT_MAX_SMALLER_SAMPLE};

use crate::numeric::{mean, std_dev};
use crate::types::{StimulusMetrics, SubjectSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Per-stimulus metric compared between groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusMetric {
    ResponseTime,
    SaccadeCount,
    MeanSaccadeDuration,
    FixationCount,
    MeanFixationDuration,
    DispersionArea,
}

impl StimulusMetric {
    pub const ALL: [StimulusMetric; 6] = [
        StimulusMetric::ResponseTime,
        StimulusMetric::SaccadeCount,
        StimulusMetric::MeanSaccadeDuration,
        StimulusMetric::FixationCount,
        StimulusMetric::MeanFixationDuration,
        StimulusMetric::DispersionArea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StimulusMetric::ResponseTime => "response_time",
            StimulusMetric::SaccadeCount => "saccade_count",
            StimulusMetric::MeanSaccadeDuration => "mean_saccade_duration",
            StimulusMetric::FixationCount => "fixation_count",
            StimulusMetric::MeanFixationDuration => "mean_fixation_duration",
            StimulusMetric::DispersionArea => "dispersion_area",
        }
    }

    pub fn value(&self, row: &StimulusMetrics) -> Option<f64> {
        match self {
            StimulusMetric::ResponseTime => row.response_time,
            StimulusMetric::SaccadeCount => Some(row.saccade_count as f64),
            StimulusMetric::MeanSaccadeDuration => row.mean_saccade_duration,
            StimulusMetric::FixationCount => Some(row.fixation_count as f64),
            StimulusMetric::MeanFixationDuration => row.mean_fixation_duration,
            StimulusMetric::DispersionArea => Some(row.dispersion_area),
        }
    }
}

/// Subject-summary metric compared between groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMetric {
    MeanResponseTime,
    TotalSaccades,
    MeanSaccadeDuration,
    TotalFixations,
    MeanFixationDuration,
    MeanDispersion,
}

impl SummaryMetric {
    pub const ALL: [SummaryMetric; 6] = [
        SummaryMetric::MeanResponseTime,
        SummaryMetric::TotalSaccades,
        SummaryMetric::MeanSaccadeDuration,
        SummaryMetric::TotalFixations,
        SummaryMetric::MeanFixationDuration,
        SummaryMetric::MeanDispersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMetric::MeanResponseTime => "mean_response_time",
            SummaryMetric::TotalSaccades => "total_saccades",
            SummaryMetric::MeanSaccadeDuration => "mean_saccade_duration",
            SummaryMetric::TotalFixations => "total_fixations",
            SummaryMetric::MeanFixationDuration => "mean_fixation_duration",
            SummaryMetric::MeanDispersion => "mean_dispersion",
        }
    }

    pub fn value(&self, row: &SubjectSummary) -> Option<f64> {
        match self {
            SummaryMetric::MeanResponseTime => row.mean_response_time,
            SummaryMetric::TotalSaccades => Some(row.total_saccades as f64),
            SummaryMetric::MeanSaccadeDuration => row.mean_saccade_duration,
            SummaryMetric::TotalFixations => Some(row.total_fixations as f64),
            SummaryMetric::MeanFixationDuration => row.mean_fixation_duration,
            SummaryMetric::MeanDispersion => row.mean_dispersion,
        }
    }
}

/// Count, mean and sample standard deviation of the defined values of one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    pub n: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1), undefined below two values
    pub std_dev: Option<f64>,
}

impl Descriptive {
    pub fn of(values: &[f64]) -> Self {
        Self {
            n: values.len(),
            mean: mean(values),
            std_dev: std_dev(values),
        }
    }
}

/// One group comparison for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// `None` for comparisons over subject summaries
    pub stimulus_id: Option<String>,
    pub metric: String,
    pub group_a: Descriptive,
    pub group_b: Descriptive,
    pub u_statistic: Option<f64>,
    pub p_value: Option<f64>,
}

/// Two-group comparator
#[derive(Debug, Clone, Copy)]
pub struct GroupComparator {
    rank_test: RankTest,
}

impl Default for GroupComparator {
    fn default() -> Self {
        Self::new(RankTest::detect())
    }
}

impl GroupComparator {
    pub fn new(rank_test: RankTest) -> Self {
        Self { rank_test }
    }

    pub fn rank_test(&self) -> RankTest {
        self.rank_test
    }

    /// Compare every metric on every stimulus seen in either group.
    ///
    /// Rows are sorted by (stimulus, metric name). A (stimulus, metric) pair is
    /// skipped only when neither group has a defined value for it.
    pub fn compare_by_stimulus(
        &self,
        group_a: &[StimulusMetrics],
        group_b: &[StimulusMetrics],
    ) -> Vec<ComparisonRow> {
        let stimuli: BTreeSet<&str> = group_a
            .iter()
            .chain(group_b.iter())
            .map(|row| row.stimulus_id.as_str())
            .collect();

        let mut rows = Vec::new();
        for stimulus in stimuli {
            for metric in StimulusMetric::ALL {
                let collect = |table: &[StimulusMetrics]| -> Vec<f64> {
                    table
                        .iter()
                        .filter(|row| row.stimulus_id == stimulus)
                        .filter_map(|row| metric.value(row))
                        .filter(|v| v.is_finite())
                        .collect()
                };
                if let Some(row) =
                    self.compare_values(Some(stimulus), metric.as_str(), &collect(group_a), &collect(group_b))
                {
                    rows.push(row);
                }
            }
        }

        rows.sort_by(|a, b| (&a.stimulus_id, &a.metric).cmp(&(&b.stimulus_id, &b.metric)));
        debug!(rows = rows.len(), "per-stimulus comparison complete");
        rows
    }

    /// Compare subject summaries, one row per summary metric in declaration order
    pub fn compare_summaries(
        &self,
        group_a: &[SubjectSummary],
        group_b: &[SubjectSummary],
    ) -> Vec<ComparisonRow> {
        SummaryMetric::ALL
            .iter()
            .filter_map(|metric| {
                let collect = |table: &[SubjectSummary]| -> Vec<f64> {
                    table
                        .iter()
                        .filter_map(|row| metric.value(row))
                        .filter(|v| v.is_finite())
                        .collect()
                };
                self.compare_values(None, metric.as_str(), &collect(group_a), &collect(group_b))
            })
            .collect()
    }

    fn compare_values(
        &self,
        stimulus_id: Option<&str>,
        metric: &str,
        a: &[f64],
        b: &[f64],
    ) -> Option<ComparisonRow> {
        if a.is_empty() && b.is_empty() {
            return None;
        }
        let outcome = self.rank_test.compare(a, b);
        Some(ComparisonRow {
            stimulus_id: stimulus_id.map(str::to_string),
            metric: metric.to_string(),
            group_a: Descriptive::of(a),
            group_b: Descriptive::of(b),
            u_statistic: outcome.u_statistic,
            p_value: outcome.p_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(subject: &str, stimulus: &str, rt: Option<f64>, fixations: usize) -> StimulusMetrics {
        StimulusMetrics {
            subject_id: subject.to_string(),
            stimulus_id: stimulus.to_string(),
            response_code: Some(1),
            response_time: rt,
            saccade_count: 2,
            mean_saccade_duration: Some(0.03),
            fixation_count: fixations,
            mean_fixation_duration: (fixations > 0).then_some(0.2),
            dispersion_area: 0.1,
            velocity_threshold_used: Some(0.5),
        }
    }

    #[test]
    fn test_descriptive() {
        let d = Descriptive::of(&[1.0, 2.0, 3.0]);
        assert_eq!(d.n, 3);
        assert_eq!(d.mean, Some(2.0));
        assert_eq!(d.std_dev, Some(1.0));

        let single = Descriptive::of(&[4.0]);
        assert_eq!(single.std_dev, None);
        assert_eq!(Descriptive::of(&[]), Descriptive::default());
    }

    #[test]
    fn test_empty_group_still_emits_rows() {
        let group_a = vec![
            row("p1", "trog1.png", Some(1.0), 1),
            row("p2", "trog1.png", Some(2.0), 3),
        ];
        let rows = GroupComparator::default().compare_by_stimulus(&group_a, &[]);

        assert_eq!(rows.len(), StimulusMetric::ALL.len());
        for r in &rows {
            assert_eq!(r.group_b, Descriptive::default());
            assert_eq!(r.u_statistic, None);
            assert_eq!(r.p_value, None);
        }
        let rt = rows.iter().find(|r| r.metric == "response_time").unwrap();
        assert_eq!(rt.group_a.mean, Some(1.5));
    }

    #[test]
    fn test_rows_sorted_and_undefined_skipped() {
        let group_a = vec![row("p1", "trog2.png", None, 0), row("p1", "trog1.png", Some(1.0), 0)];
        let group_b = vec![row("p9", "trog2.png", None, 0)];
        let rows = GroupComparator::new(RankTest::Unavailable).compare_by_stimulus(&group_a, &group_b);

        let keys: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.stimulus_id.clone().unwrap(), r.metric.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        // trog2 has no defined response time or fixation duration on either side
        let trog2: Vec<&str> = rows
            .iter()
            .filter(|r| r.stimulus_id.as_deref() == Some("trog2.png"))
            .map(|r| r.metric.as_str())
            .collect();
        assert!(!trog2.contains(&"response_time"));
        assert!(!trog2.contains(&"mean_fixation_duration"));
        assert!(trog2.contains(&"fixation_count"));
    }

    #[test]
    fn test_unavailable_capability_keeps_descriptives() {
        let a = vec![row("p1", "trog1.png", Some(1.0), 1)];
        let b = vec![row("p2", "trog1.png", Some(3.0), 1)];
        let rows = GroupComparator::new(RankTest::Unavailable).compare_by_stimulus(&a, &b);
        let rt = rows.iter().find(|r| r.metric == "response_time").unwrap();

        assert_eq!(rt.group_a.mean, Some(1.0));
        assert_eq!(rt.group_b.mean, Some(3.0));
        assert_eq!(rt.u_statistic, None);
        assert_eq!(rt.p_value, None);
    }

    #[test]
    fn test_compare_summaries() {
        let summary = |subject: &str, rt: f64| SubjectSummary {
            subject_id: subject.to_string(),
            stimulus_count: 1,
            mean_response_time: Some(rt),
            total_saccades: 2,
            mean_saccade_duration: Some(0.03),
            total_fixations: 0,
            mean_fixation_duration: None,
            mean_dispersion: Some(0.1),
        };
        let a = vec![summary("p1", 1.0), summary("p2", 2.0)];
        let b = vec![summary("p3", 5.0)];
        let rows = GroupComparator::default().compare_summaries(&a, &b);

        assert_eq!(rows.len(), SummaryMetric::ALL.len() - 1);
        assert!(rows.iter().all(|r| r.stimulus_id.is_none()));
        assert_eq!(rows[0].metric, "mean_response_time");
        assert_eq!(rows[0].group_b.n, 1);
    }
}
