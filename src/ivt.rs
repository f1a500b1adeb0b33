//! Velocity-threshold (I-VT) classification
//!
//! Each sample of an exploration window gets an instantaneous speed from the
//! deltas to its predecessor. Samples at or below an adaptive threshold are
//! fixations, the rest saccades. The threshold is a percentile of the window's
//! speeds, never below a fixed floor.
//!
//! Degenerate windows (fewer than 3 samples) are all fixation with the floor
//! as threshold. Non-positive time deltas are clamped to a small epsilon and
//! any non-finite speed becomes 0, so the output never contains NaN or Inf.

use crate::config::{IvtConfig, ThresholdSampling};
use crate::numeric::percentile;
use crate::types::{Classification, GazeLabel, LabeledSample, Sample};
use tracing::debug;

/// Windows shorter than this are labeled entirely as fixation
pub const MIN_CLASSIFIABLE_SAMPLES: usize = 3;

/// First segment id of every window
pub const FIRST_SEGMENT_ID: u32 = 1;

/// I-VT classifier with a percentile-based adaptive threshold
#[derive(Debug, Clone, Copy)]
pub struct VelocityClassifier {
    velocity_percentile: f64,
    velocity_floor: f64,
    time_epsilon_sec: f64,
    threshold_sampling: ThresholdSampling,
}

impl Default for VelocityClassifier {
    fn default() -> Self {
        Self::new(&IvtConfig::default())
    }
}

impl VelocityClassifier {
    pub fn new(config: &IvtConfig) -> Self {
        Self {
            velocity_percentile: config.velocity_percentile,
            velocity_floor: config.velocity_floor,
            time_epsilon_sec: config.time_epsilon_sec,
            threshold_sampling: config.threshold_sampling,
        }
    }

    /// Classify an exploration window
    pub fn classify(&self, samples: &[Sample]) -> Classification {
        let mut ordered = samples.to_vec();
        ordered.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

        if ordered.len() < MIN_CLASSIFIABLE_SAMPLES {
            return self.classify_degenerate(ordered);
        }

        let kinematics = self.kinematics(&ordered);
        let threshold = self.threshold(&kinematics);

        let mut segment_id = FIRST_SEGMENT_ID;
        let mut previous_label: Option<GazeLabel> = None;
        let labeled: Vec<LabeledSample> = ordered
            .into_iter()
            .zip(kinematics)
            .map(|(sample, k)| {
                let label = if k.speed <= threshold {
                    GazeLabel::Fixation
                } else {
                    GazeLabel::Saccade
                };
                if previous_label.is_some_and(|prev| prev != label) {
                    segment_id += 1;
                }
                previous_label = Some(label);

                LabeledSample {
                    sample,
                    dx: k.dx,
                    dy: k.dy,
                    dt: k.dt,
                    dt_clamped: k.dt_clamped,
                    speed: k.speed,
                    label,
                    segment_id,
                }
            })
            .collect();

        debug!(
            samples = labeled.len(),
            threshold,
            segments = segment_id,
            "classified exploration window"
        );

        Classification {
            samples: labeled,
            threshold,
        }
    }

    fn classify_degenerate(&self, samples: Vec<Sample>) -> Classification {
        let labeled = samples
            .into_iter()
            .map(|sample| LabeledSample {
                sample,
                dx: 0.0,
                dy: 0.0,
                dt: 0.0,
                dt_clamped: false,
                speed: 0.0,
                label: GazeLabel::Fixation,
                segment_id: FIRST_SEGMENT_ID,
            })
            .collect();

        Classification {
            samples: labeled,
            threshold: self.velocity_floor,
        }
    }

    /// Per-sample deltas and speed against the preceding sample
    fn kinematics(&self, samples: &[Sample]) -> Vec<Kinematics> {
        samples
            .iter()
            .enumerate()
            .map(|(i, current)| {
                let (dx, dy, raw_dt) = match i.checked_sub(1).map(|p| &samples[p]) {
                    Some(prev) => (
                        finite_or_zero(current.x - prev.x),
                        finite_or_zero(current.y - prev.y),
                        current.time_sec - prev.time_sec,
                    ),
                    None => (0.0, 0.0, 0.0),
                };

                // negated so a NaN delta is clamped as well
                let dt_clamped = !(raw_dt > 0.0);
                let dt = if dt_clamped {
                    self.time_epsilon_sec
                } else {
                    raw_dt
                };
                let speed = finite_or_zero(dx.hypot(dy) / dt);

                Kinematics {
                    dx,
                    dy,
                    dt,
                    dt_clamped,
                    speed,
                }
            })
            .collect()
    }

    /// Adaptive threshold: the configured percentile of the speeds, floored
    fn threshold(&self, kinematics: &[Kinematics]) -> f64 {
        let speeds: Vec<f64> = kinematics
            .iter()
            .filter(|k| match self.threshold_sampling {
                ThresholdSampling::AllSamples => true,
                ThresholdSampling::ExcludeClampedDeltas => !k.dt_clamped,
            })
            .map(|k| k.speed)
            .collect();

        let max_speed = speeds.iter().copied().fold(0.0_f64, f64::max);
        if max_speed <= 0.0 {
            return self.velocity_floor;
        }

        match percentile(&speeds, self.velocity_percentile) {
            Some(p) => p.max(self.velocity_floor),
            None => self.velocity_floor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Kinematics {
    dx: f64,
    dy: f64,
    dt: f64,
    dt_clamped: bool,
    speed: f64,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
