//! Coordinate normalization
//!
//! This module scales gaze coordinates onto [0, 1] per subject.
//! - x and y are scaled independently with min-max scaling
//! - An axis without variance maps to the constant 0.5
//! - One subject and many subjects follow the same per-partition path

use crate::config::IvtConfig;
use crate::numeric::min_max;
use crate::partition::map_subjects;
use crate::types::Sample;

/// Value assigned to an axis whose range is (near) zero
pub const ZERO_RANGE_VALUE: f64 = 0.5;

/// Normalizer for per-subject min-max coordinate scaling
#[derive(Debug, Clone, Copy)]
pub struct CoordinateNormalizer {
    zero_range_epsilon: f64,
}

impl Default for CoordinateNormalizer {
    fn default() -> Self {
        Self::from_config(&IvtConfig::default())
    }
}

impl CoordinateNormalizer {
    pub fn new(zero_range_epsilon: f64) -> Self {
        Self { zero_range_epsilon }
    }

    pub fn from_config(config: &IvtConfig) -> Self {
        Self::new(config.zero_range_epsilon)
    }

    /// Normalize every subject of a table. Output is grouped by subject id.
    pub fn normalize(&self, samples: &[Sample]) -> Vec<Sample> {
        map_subjects(samples, |partition| self.normalize_subject(partition))
    }

    /// Normalize the samples of a single subject
    pub fn normalize_subject(&self, samples: &[Sample]) -> Vec<Sample> {
        let x_scale = self.axis_scale(samples.iter().map(|s| s.x));
        let y_scale = self.axis_scale(samples.iter().map(|s| s.y));

        samples
            .iter()
            .map(|s| Sample {
                x: x_scale.apply(s.x),
                y: y_scale.apply(s.y),
                ..s.clone()
            })
            .collect()
    }

    fn axis_scale(&self, values: impl Iterator<Item = f64>) -> AxisScale {
        match min_max(values) {
            Some((lo, hi)) if hi - lo > self.zero_range_epsilon => AxisScale::Range { lo, span: hi - lo },
            _ => AxisScale::Constant,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AxisScale {
    Range { lo: f64, span: f64 },
    Constant,
}

impl AxisScale {
    fn apply(self, value: f64) -> f64 {
        match self {
            AxisScale::Range { lo, span } => (value - lo) / span,
            AxisScale::Constant => ZERO_RANGE_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: &str, points: &[(f64, f64)]) -> Vec<Sample> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Sample::new(id, "trog1.png", i as f64 * 0.01, x, y, 0))
            .collect()
    }

    #[test]
    fn test_min_max_scaling() {
        let samples = subject("p1", &[(100.0, 50.0), (300.0, 150.0), (200.0, 100.0)]);
        let normalized = CoordinateNormalizer::default().normalize(&samples);

        let xs: Vec<f64> = normalized.iter().map(|s| s.x).collect();
        let ys: Vec<f64> = normalized.iter().map(|s| s.y).collect();
        assert_eq!(xs, vec![0.0, 1.0, 0.5]);
        assert_eq!(ys, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_zero_range_axis_is_constant() {
        let samples = subject("p1", &[(10.0, 7.0), (20.0, 7.0), (30.0, 7.0 + 1e-12)]);
        let normalized = CoordinateNormalizer::default().normalize(&samples);

        assert!(normalized.iter().all(|s| s.y == ZERO_RANGE_VALUE));
        assert_eq!(normalized[2].x, 1.0);
    }

    #[test]
    fn test_single_sample_subject() {
        let samples = subject("p1", &[(640.0, 480.0)]);
        let normalized = CoordinateNormalizer::default().normalize(&samples);
        assert_eq!(normalized[0].x, 0.5);
        assert_eq!(normalized[0].y, 0.5);
    }

    #[test]
    fn test_per_subject_independence() {
        let p1 = subject("p1", &[(0.0, 0.0), (10.0, 10.0)]);
        let p2 = subject("p2", &[(1000.0, 500.0), (3000.0, 900.0)]);
        let mut table = p2.clone();
        table.extend(p1.clone());

        let normalizer = CoordinateNormalizer::default();
        let multi = normalizer.normalize(&table);
        let mut separate = normalizer.normalize(&p1);
        separate.extend(normalizer.normalize(&p2));

        assert_eq!(multi, separate);
        assert!(multi.iter().all(|s| (0.0..=1.0).contains(&s.x)));
        assert!(multi.iter().all(|s| (0.0..=1.0).contains(&s.y)));
    }

    #[test]
    fn test_empty_table() {
        assert!(CoordinateNormalizer::default().normalize(&[]).is_empty());
    }
}
