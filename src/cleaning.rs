//! Sample cleaning and outlier filtering
//!
//! Applied per subject:
//! - Sensor dropouts (x == 0 and y == 0) and samples without a finite time removed
//! - Tukey fences on x and y independently; a sample must lie inside both
//! - Duplicate timestamps removed (a zero time delta to the previous sample)
//!
//! The filter never fails. Filtering every row yields an empty table.

use crate::config::IvtConfig;
use crate::numeric::quartiles;
use crate::partition::by_subject;
use crate::types::Sample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Counts of samples removed at each cleaning step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input: usize,
    pub dropouts: usize,
    #[serde(default)]
    pub invalid_times: usize,
    pub outliers: usize,
    pub duplicate_timestamps: usize,
    pub retained: usize,
}

impl CleaningReport {
    fn merge(&mut self, other: CleaningReport) {
        self.input += other.input;
        self.dropouts += other.dropouts;
        self.invalid_times += other.invalid_times;
        self.outliers += other.outliers;
        self.duplicate_timestamps += other.duplicate_timestamps;
        self.retained += other.retained;
    }
}

/// Cleaned table plus what was removed
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningOutcome {
    /// Samples sorted by subject id, then time
    pub samples: Vec<Sample>,
    pub report: CleaningReport,
}

/// Dropout, IQR outlier and duplicate-timestamp filter
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    iqr_multiplier: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::from_config(&IvtConfig::default())
    }
}

impl OutlierFilter {
    pub fn new(iqr_multiplier: f64) -> Self {
        Self { iqr_multiplier }
    }

    pub fn from_config(config: &IvtConfig) -> Self {
        Self::new(config.iqr_multiplier)
    }

    /// Clean a (possibly multi-subject) sample table
    pub fn clean(&self, samples: &[Sample]) -> CleaningOutcome {
        let mut report = CleaningReport::default();
        let mut cleaned = Vec::with_capacity(samples.len());

        for (subject_id, partition) in by_subject(samples) {
            let (kept, subject_report) = self.clean_subject(partition);
            debug!(
                subject = %subject_id,
                dropouts = subject_report.dropouts,
                invalid_times = subject_report.invalid_times,
                outliers = subject_report.outliers,
                duplicates = subject_report.duplicate_timestamps,
                retained = subject_report.retained,
                "cleaned subject"
            );
            report.merge(subject_report);
            cleaned.extend(kept);
        }

        info!(
            input = report.input,
            dropouts = report.dropouts,
            invalid_times = report.invalid_times,
            outliers = report.outliers,
            duplicates = report.duplicate_timestamps,
            retained = report.retained,
            "sample cleaning finished"
        );

        CleaningOutcome {
            samples: cleaned,
            report,
        }
    }

    /// Clean the samples of a single subject
    fn clean_subject(&self, mut samples: Vec<Sample>) -> (Vec<Sample>, CleaningReport) {
        let input = samples.len();

        samples.retain(|s| !s.is_dropout());
        let dropouts = input - samples.len();

        let before_times = samples.len();
        samples.retain(|s| s.time_sec.is_finite());
        let invalid_times = before_times - samples.len();

        samples.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

        let before_fences = samples.len();
        let x_fence = self.fence(samples.iter().map(|s| s.x));
        let y_fence = self.fence(samples.iter().map(|s| s.y));
        samples.retain(|s| within(x_fence, s.x) && within(y_fence, s.y));
        let outliers = before_fences - samples.len();

        let before_dedup = samples.len();
        let mut previous_time: Option<f64> = None;
        samples.retain(|s| {
            let duplicate = previous_time.is_some_and(|prev| s.time_sec - prev == 0.0);
            previous_time = Some(s.time_sec);
            !duplicate
        });
        let duplicate_timestamps = before_dedup - samples.len();

        let report = CleaningReport {
            input,
            dropouts,
            invalid_times,
            outliers,
            duplicate_timestamps,
            retained: samples.len(),
        };
        (samples, report)
    }

    /// Inclusive `[Q1 - k*IQR, Q3 + k*IQR]` bounds, or `None` without finite data
    fn fence(&self, values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
        let values: Vec<f64> = values.collect();
        let (q1, q3) = quartiles(&values)?;
        let iqr = q3 - q1;
        Some((q1 - self.iqr_multiplier * iqr, q3 + self.iqr_multiplier * iqr))
    }
}

fn within(fence: Option<(f64, f64)>, value: f64) -> bool {
    match fence {
        Some((lo, hi)) => value >= lo && value <= hi,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(subject: &str, n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let v = 0.4 + 0.01 * (i % 5) as f64;
                Sample::new(subject, "trog1.png", i as f64 * 0.02, v, v + 0.05, 0)
            })
            .collect()
    }

    #[test]
    fn test_removes_dropouts() {
        let mut samples = grid("p1", 10);
        samples[3].x = 0.0;
        samples[3].y = 0.0;
        // only one coordinate zero is not a dropout
        samples[4].x = 0.0;
        samples[4].y = 0.42;

        let outcome = OutlierFilter::new(100.0).clean(&samples);
        assert_eq!(outcome.report.dropouts, 1);
        assert_eq!(outcome.samples.len(), 9);
    }

    #[test]
    fn test_removes_coordinate_outliers() {
        let mut samples = grid("p1", 20);
        samples[7].x = 25.0;
        samples[12].y = -30.0;

        let outcome = OutlierFilter::default().clean(&samples);
        assert_eq!(outcome.report.outliers, 2);
        assert!(outcome.samples.iter().all(|s| s.x < 1.0 && s.y > 0.0));
    }

    #[test]
    fn test_clean_data_is_unchanged() {
        let samples = grid("p1", 25);
        let outcome = OutlierFilter::default().clean(&samples);
        assert_eq!(outcome.samples, samples);
        assert_eq!(
            outcome.report,
            CleaningReport {
                input: 25,
                retained: 25,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_removes_duplicate_timestamps_keeps_first() {
        let mut samples = grid("p1", 6);
        samples[2].time_sec = samples[1].time_sec;
        samples[3].time_sec = samples[1].time_sec;

        let outcome = OutlierFilter::new(100.0).clean(&samples);
        assert_eq!(outcome.report.duplicate_timestamps, 2);
        let times: Vec<f64> = outcome.samples.iter().map(|s| s.time_sec).collect();
        assert_eq!(times, vec![0.0, 0.02, 4.0 * 0.02, 5.0 * 0.02]);
    }

    #[test]
    fn test_sorts_by_time() {
        let mut samples = grid("p1", 5);
        samples.reverse();
        let outcome = OutlierFilter::new(100.0).clean(&samples);
        let times: Vec<f64> = outcome.samples.iter().map(|s| s.time_sec).collect();
        let expected: Vec<f64> = (0..5).map(|i| i as f64 * 0.02).collect();
        assert_eq!(times, expected);
    }

    #[test]
    fn test_subjects_are_filtered_independently() {
        // p2 lives in a completely different coordinate range; pooled
        // quartiles would discard one of the subjects entirely.
        let p1 = grid("p1", 12);
        let p2: Vec<Sample> = grid("p2", 12)
            .into_iter()
            .map(|s| Sample {
                x: s.x * 1000.0,
                y: s.y * 1000.0,
                ..s
            })
            .collect();
        let mut table = p2.clone();
        table.extend(p1.clone());

        let multi = OutlierFilter::default().clean(&table);
        let single_p1 = OutlierFilter::default().clean(&p1);
        let single_p2 = OutlierFilter::default().clean(&p2);

        assert_eq!(multi.samples.len(), 24);
        assert_eq!(&multi.samples[..12], single_p1.samples.as_slice());
        assert_eq!(&multi.samples[12..], single_p2.samples.as_slice());
    }

    #[test]
    fn test_everything_filtered_yields_empty() {
        let samples = vec![
            Sample::new("p1", "trog1.png", 0.0, 0.0, 0.0, 0),
            Sample::new("p1", "trog1.png", 0.1, 0.0, 0.0, 0),
        ];
        let outcome = OutlierFilter::default().clean(&samples);
        assert!(outcome.samples.is_empty());
        assert_eq!(outcome.report.retained, 0);
        assert!(OutlierFilter::default().clean(&[]).samples.is_empty());
    }

    #[test]
    fn test_non_finite_coordinates_are_removed() {
        let mut samples = grid("p1", 10);
        samples[5].x = f64::NAN;
        let outcome = OutlierFilter::default().clean(&samples);
        assert_eq!(outcome.samples.len(), 9);
        assert!(outcome.samples.iter().all(|s| s.x.is_finite()));
    }

    #[test]
    fn test_non_finite_times_are_removed() {
        let mut samples = grid("p1", 10);
        samples[4].time_sec = f64::NAN;
        samples[7].time_sec = f64::INFINITY;
        let outcome = OutlierFilter::default().clean(&samples);

        assert_eq!(outcome.report.invalid_times, 2);
        assert_eq!(outcome.report.retained, 8);
        assert!(outcome.samples.iter().all(|s| s.time_sec.is_finite()));
    }
}
