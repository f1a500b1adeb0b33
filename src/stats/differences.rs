//! Pairwise subject differences between two groups

use crate::numeric::{mean, min_max, std_dev};
use crate::types::StimulusMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group A minus group B for one subject pair on one shared stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDifference {
    pub subject_a: String,
    pub subject_b: String,
    pub stimulus_id: String,
    pub response_time: Option<f64>,
    pub saccade_count: i64,
    pub fixation_count: i64,
    pub mean_fixation_duration: Option<f64>,
    pub dispersion_area: f64,
}

/// Summary of one difference column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceSummary {
    pub metric: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

type Index<'a> = BTreeMap<&'a str, BTreeMap<&'a str, &'a StimulusMetrics>>;

/// First row per (subject, stimulus)
fn index(table: &[StimulusMetrics]) -> Index<'_> {
    let mut index: Index<'_> = BTreeMap::new();
    for row in table {
        index
            .entry(row.subject_id.as_str())
            .or_default()
            .entry(row.stimulus_id.as_str())
            .or_insert(row);
    }
    index
}

fn diff(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Differences for every (A subject, B subject) pair on the stimuli both saw,
/// ordered by subject A, subject B, then stimulus.
pub fn pairwise_differences(
    group_a: &[StimulusMetrics],
    group_b: &[StimulusMetrics],
) -> Vec<PairwiseDifference> {
    let a_index = index(group_a);
    let b_index = index(group_b);
    let mut out = Vec::new();

    for (subject_a, a_rows) in &a_index {
        for (subject_b, b_rows) in &b_index {
            for (stimulus, a) in a_rows {
                let Some(b) = b_rows.get(stimulus) else {
                    continue;
                };
                out.push(PairwiseDifference {
                    subject_a: subject_a.to_string(),
                    subject_b: subject_b.to_string(),
                    stimulus_id: stimulus.to_string(),
                    response_time: diff(a.response_time, b.response_time),
                    saccade_count: a.saccade_count as i64 - b.saccade_count as i64,
                    fixation_count: a.fixation_count as i64 - b.fixation_count as i64,
                    mean_fixation_duration: diff(a.mean_fixation_duration, b.mean_fixation_duration),
                    dispersion_area: a.dispersion_area - b.dispersion_area,
                });
            }
        }
    }
    out
}

/// Summaries of each difference column that has at least one defined value
pub fn summarize_differences(differences: &[PairwiseDifference]) -> Vec<DifferenceSummary> {
    let columns: [(&str, fn(&PairwiseDifference) -> Option<f64>); 5] = [
        ("response_time", |d| d.response_time),
        ("saccade_count", |d| Some(d.saccade_count as f64)),
        ("fixation_count", |d| Some(d.fixation_count as f64)),
        ("mean_fixation_duration", |d| d.mean_fixation_duration),
        ("dispersion_area", |d| Some(d.dispersion_area)),
    ];

    columns
        .iter()
        .filter_map(|(name, column)| {
            let values: Vec<f64> = differences
                .iter()
                .filter_map(column)
                .filter(|v| v.is_finite())
                .collect();
            let mean = mean(&values)?;
            let (min, max) = min_max(values.iter().copied())?;
            Some(DifferenceSummary {
                metric: name.to_string(),
                n: values.len(),
                mean,
                std_dev: std_dev(&values),
                min,
                max,
            })
        })
        .collect()
}
