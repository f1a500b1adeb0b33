//! Per-subject consolidated metrics
//!
//! Folds the per-stimulus rows of one subject into a single summary row. Mean
//! durations are weighted by the segment counts of each stimulus.

use crate::types::{StimulusMetrics, SubjectSummary};
use std::collections::BTreeMap;

impl SubjectSummary {
    /// Summarize the rows of one subject
    pub fn from_metrics(subject_id: &str, rows: &[&StimulusMetrics]) -> Self {
        let mut stimulus_count = 0usize;
        let mut response_time_sum = 0.0;
        let mut dispersion_sum = 0.0;
        let mut total_saccades = 0usize;
        let mut total_fixations = 0usize;
        let mut saccade_duration_sum = 0.0;
        let mut fixation_duration_sum = 0.0;

        for row in rows {
            if let Some(rt) = row.response_time {
                response_time_sum += rt;
                stimulus_count += 1;
            }
            total_saccades += row.saccade_count;
            total_fixations += row.fixation_count;
            if let Some(d) = row.mean_saccade_duration {
                saccade_duration_sum += d * row.saccade_count as f64;
            }
            if let Some(d) = row.mean_fixation_duration {
                fixation_duration_sum += d * row.fixation_count as f64;
            }
            dispersion_sum += row.dispersion_area;
        }

        let per_stimulus = |sum: f64| (stimulus_count > 0).then(|| sum / stimulus_count as f64);

        SubjectSummary {
            subject_id: subject_id.to_string(),
            stimulus_count,
            mean_response_time: per_stimulus(response_time_sum),
            total_saccades,
            mean_saccade_duration: (total_saccades > 0)
                .then(|| saccade_duration_sum / total_saccades as f64),
            total_fixations,
            mean_fixation_duration: (total_fixations > 0)
                .then(|| fixation_duration_sum / total_fixations as f64),
            mean_dispersion: per_stimulus(dispersion_sum),
        }
    }
}

/// Summarize a metrics table, one row per subject in subject-id order
pub fn summarize_subjects(metrics: &[StimulusMetrics]) -> Vec<SubjectSummary> {
    let mut by_subject: BTreeMap<&str, Vec<&StimulusMetrics>> = BTreeMap::new();
    for row in metrics {
        by_subject.entry(row.subject_id.as_str()).or_default().push(row);
    }
    by_subject
        .into_iter()
        .map(|(subject_id, rows)| SubjectSummary::from_metrics(subject_id, &rows))
        .collect()
}
