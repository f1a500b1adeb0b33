//! Per-stimulus metric derivation
//!
//! This module derives the scalar metrics of one subject-stimulus unit from its
//! exploration window, classification and segments:
//! - Response time and code, passed through from the window
//! - Saccade count and mean duration (every saccade segment)
//! - Fixation count and mean duration (segments at or above the minimum duration)
//! - Spatial dispersion as bounding-box area
//!
//! Means over an empty set are undefined (`None`), counts are legitimately 0.

use crate::config::IvtConfig;
use crate::numeric::{mean, min_max};
use crate::types::{Classification, ExplorationWindow, GazeLabel, Sample, Segment, StimulusMetrics};

/// Metric calculator for one subject-stimulus unit
#[derive(Debug, Clone, Copy)]
pub struct MetricCalculator {
    min_fixation_duration_sec: f64,
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::new(&IvtConfig::default())
    }
}

impl MetricCalculator {
    pub fn new(config: &IvtConfig) -> Self {
        Self {
            min_fixation_duration_sec: config.min_fixation_duration_sec,
        }
    }

    /// Derive metrics. `classification` is `None` when the window was too
    /// empty to classify, which leaves the threshold undefined.
    pub fn compute(
        &self,
        subject_id: &str,
        stimulus_id: &str,
        window: &ExplorationWindow,
        classification: Option<&Classification>,
        segments: &[Segment],
    ) -> StimulusMetrics {
        let saccade_durations: Vec<f64> = segments
            .iter()
            .filter(|s| s.label == GazeLabel::Saccade)
            .map(|s| s.duration)
            .collect();

        let fixation_durations: Vec<f64> = segments
            .iter()
            .filter(|s| s.label == GazeLabel::Fixation)
            .filter(|s| s.duration >= self.min_fixation_duration_sec)
            .map(|s| s.duration)
            .collect();

        StimulusMetrics {
            subject_id: subject_id.to_string(),
            stimulus_id: stimulus_id.to_string(),
            response_code: window.response_code,
            response_time: window.response_time,
            saccade_count: saccade_durations.len(),
            mean_saccade_duration: mean(&saccade_durations),
            fixation_count: fixation_durations.len(),
            mean_fixation_duration: mean(&fixation_durations),
            dispersion_area: dispersion_area(&window.samples),
            velocity_threshold_used: classification.map(|c| c.threshold),
        }
    }
}

/// Bounding-box area of the gaze positions; 0 below two points
pub fn dispersion_area(samples: &[Sample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let x_range = min_max(samples.iter().map(|s| s.x)).map_or(0.0, |(lo, hi)| hi - lo);
    let y_range = min_max(samples.iter().map(|s| s.y)).map_or(0.0, |(lo, hi)| hi - lo);
    x_range * y_range
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: u32, label: GazeLabel, t_start: f64, t_end: f64) -> Segment {
        Segment {
            segment_id: id,
            label,
            t_start,
            t_end,
            duration: t_end - t_start,
            sample_count: 2,
            start_x: 0.0,
            start_y: 0.0,
            end_x: 0.0,
            end_y: 0.0,
        }
    }

    fn window(points: &[(f64, f64)]) -> ExplorationWindow {
        let samples: Vec<Sample> = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Sample::new("p1", "trog1.png", i as f64 * 0.1, x, y, 0))
            .collect();
        ExplorationWindow {
            samples,
            t0: Some(0.0),
            t_response: Some(2.0),
            response_time: Some(2.0),
            response_code: Some(3),
        }
    }

    #[test]
    fn test_short_fixations_are_excluded() {
        let segments = vec![
            segment(1, GazeLabel::Fixation, 0.0, 0.08),
            segment(2, GazeLabel::Saccade, 0.10, 0.12),
            segment(3, GazeLabel::Fixation, 0.14, 0.44),
            segment(4, GazeLabel::Saccade, 0.46, 0.50),
            segment(5, GazeLabel::Fixation, 0.52, 0.72),
        ];
        let classification = Classification {
            samples: Vec::new(),
            threshold: 0.75,
        };
        let metrics = MetricCalculator::default().compute(
            "p1",
            "trog1.png",
            &window(&[(0.0, 0.0), (1.0, 1.0)]),
            Some(&classification),
            &segments,
        );

        assert_eq!(metrics.fixation_count, 2);
        assert!((metrics.mean_fixation_duration.unwrap() - 0.25).abs() < 1e-9);
        assert_eq!(metrics.saccade_count, 2);
        assert!((metrics.mean_saccade_duration.unwrap() - 0.03).abs() < 1e-9);
        assert_eq!(metrics.velocity_threshold_used, Some(0.75));
        assert_eq!(metrics.response_code, Some(3));
        assert_eq!(metrics.response_time, Some(2.0));
    }

    #[test]
    fn test_undefined_means_are_not_zero() {
        let segments = vec![segment(1, GazeLabel::Fixation, 0.0, 0.08)];
        let metrics = MetricCalculator::default().compute(
            "p1",
            "trog1.png",
            &window(&[(0.2, 0.2), (0.3, 0.3), (0.4, 0.4)]),
            None,
            &segments,
        );

        assert_eq!(metrics.saccade_count, 0);
        assert_eq!(metrics.mean_saccade_duration, None);
        assert_eq!(metrics.fixation_count, 0);
        assert_eq!(metrics.mean_fixation_duration, None);
        assert_eq!(metrics.velocity_threshold_used, None);
    }

    #[test]
    fn test_dispersion_area() {
        let w = window(&[(0.2, 0.1), (0.6, 0.3), (0.4, 0.6)]);
        assert!((dispersion_area(&w.samples) - 0.4 * 0.5).abs() < 1e-12);

        let single = window(&[(0.2, 0.1)]);
        assert_eq!(dispersion_area(&single.samples), 0.0);
        assert_eq!(dispersion_area(&[]), 0.0);
    }

    #[test]
    fn test_dispersion_of_unit_square_is_bounded() {
        let w = window(&[(0.0, 0.0), (1.0, 1.0), (0.5, 0.25)]);
        let area = dispersion_area(&w.samples);
        assert!((0.0..=1.0).contains(&area));
        assert_eq!(area, 1.0);
    }
}
