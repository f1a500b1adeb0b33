//! Pipeline orchestration
//!
//! This module provides the public API for gazeflux. It composes the stages
//! over a canonical sample table:
//!
//! 1. OutlierFilter - dropouts, IQR fences, duplicate timestamps (per subject)
//! 2. CoordinateNormalizer - min-max scaling to [0, 1] (per subject, optional)
//! 3. ResponseWindowExtractor - pre-response exploration window (per stimulus)
//! 4. VelocityClassifier - adaptive I-VT labeling
//! 5. SegmentAggregator - contiguous runs
//! 6. MetricCalculator - per-stimulus scalar metrics
//!
//! Every subject-stimulus unit is independent. A unit that degrades produces
//! undefined metrics and never stops the others.

use crate::accumulator::GroupAccumulator;
use crate::cleaning::{CleaningOutcome, CleaningReport, OutlierFilter};
use crate::config::IvtConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::ivt::{VelocityClassifier, MIN_CLASSIFIABLE_SAMPLES};
use crate::metrics::MetricCalculator;
use crate::normalizer::CoordinateNormalizer;
use crate::partition::{by_stimulus, by_subject};
use crate::schema::{SampleAdapter, TimestampUnit};
use crate::segments::SegmentAggregator;
use crate::types::{Sample, StimulusAnalysis, StimulusMetrics};
use crate::window::ResponseWindowExtractor;
use tracing::{debug, info, warn};

/// Convert NDJSON sample records of one group to a JSON metrics report.
///
/// # Arguments
/// * `ndjson` - gaze.sample.v1 records, one per line
/// * `group` - Group label written into the report
/// * `unit` - Unit of the raw `timestamp` field
/// * `config` - Analysis configuration
///
/// # Example
/// ```ignore
/// let report = samples_to_metrics_json(ndjson, "control", TimestampUnit::Microseconds, &IvtConfig::default())?;
/// ```
pub fn samples_to_metrics_json(
    ndjson: &str,
    group: &str,
    unit: TimestampUnit,
    config: &IvtConfig,
) -> Result<String, ComputeError> {
    config.validate()?;
    let records = SampleAdapter::parse_ndjson(ndjson)?;
    let samples = SampleAdapter::new(unit).to_samples(&records)?;

    let processor = GazeProcessor::new(config.clone());
    let processed = processor.process_table(&samples);
    let mut accumulator = GroupAccumulator::new(group);
    accumulator.extend(&processed.analyses);

    let encoder = ReportEncoder::new();
    let report = encoder.encode_metrics(&accumulator, processor.config(), processed.cleaning);
    encoder.encode_to_json(&report, false)
}

/// Result of processing a whole sample table
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTable {
    pub cleaning: CleaningReport,
    /// One entry per (subject, stimulus), ordered by subject then stimulus
    pub analyses: Vec<StimulusAnalysis>,
}

impl ProcessedTable {
    pub fn metrics(&self) -> Vec<StimulusMetrics> {
        self.analyses.iter().map(|a| a.metrics.clone()).collect()
    }
}

/// Gaze processor holding the configured stages
#[derive(Debug, Clone)]
pub struct GazeProcessor {
    config: IvtConfig,
    filter: OutlierFilter,
    normalizer: CoordinateNormalizer,
    classifier: VelocityClassifier,
    calculator: MetricCalculator,
}

impl Default for GazeProcessor {
    fn default() -> Self {
        Self::new(IvtConfig::default())
    }
}

impl GazeProcessor {
    /// Create a processor. The configuration is taken as given; call
    /// `IvtConfig::validate` first when it comes from user input.
    pub fn new(config: IvtConfig) -> Self {
        Self {
            filter: OutlierFilter::from_config(&config),
            normalizer: CoordinateNormalizer::from_config(&config),
            classifier: VelocityClassifier::new(&config),
            calculator: MetricCalculator::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &IvtConfig {
        &self.config
    }

    /// Clean, then normalize when enabled
    pub fn prepare(&self, samples: &[Sample]) -> CleaningOutcome {
        let mut outcome = self.filter.clean(samples);
        if self.config.normalize_coordinates {
            outcome.samples = self.normalizer.normalize(&outcome.samples);
        }
        outcome
    }

    /// Analyze the prepared samples of one (subject, stimulus) unit
    pub fn analyze_stimulus(
        &self,
        subject_id: &str,
        stimulus_id: &str,
        samples: &[Sample],
    ) -> StimulusAnalysis {
        let window = ResponseWindowExtractor::extract(samples);

        let classification = if window.is_empty() {
            warn!(
                subject = subject_id,
                stimulus = stimulus_id,
                "empty exploration window, metrics left undefined"
            );
            None
        } else {
            if window.len() < MIN_CLASSIFIABLE_SAMPLES {
                debug!(
                    subject = subject_id,
                    stimulus = stimulus_id,
                    samples = window.len(),
                    "window too short for velocity estimation, labeled as fixation"
                );
            }
            Some(self.classifier.classify(&window.samples))
        };

        let segments = classification
            .as_ref()
            .map(|c| SegmentAggregator::aggregate(&c.samples))
            .unwrap_or_default();

        let metrics = self.calculator.compute(
            subject_id,
            stimulus_id,
            &window,
            classification.as_ref(),
            &segments,
        );

        StimulusAnalysis {
            window,
            classification,
            segments,
            metrics,
        }
    }

    /// Analyze every stimulus of one subject's prepared samples, in stimulus order
    pub fn process_subject(&self, subject_id: &str, samples: &[Sample]) -> Vec<StimulusAnalysis> {
        by_stimulus(samples)
            .iter()
            .map(|(stimulus_id, unit)| self.analyze_stimulus(subject_id, stimulus_id, unit))
            .collect()
    }

    /// Prepare a (possibly multi-subject) table and analyze every unit
    pub fn process_table(&self, samples: &[Sample]) -> ProcessedTable {
        let prepared = self.prepare(samples);

        let analyses: Vec<StimulusAnalysis> = by_subject(&prepared.samples)
            .iter()
            .flat_map(|(subject_id, subject_samples)| {
                self.process_subject(subject_id, subject_samples)
            })
            .collect();

        info!(
            input = samples.len(),
            retained = prepared.report.retained,
            units = analyses.len(),
            "processed sample table"
        );

        ProcessedTable {
            cleaning: prepared.report,
            analyses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GazeLabel;

    fn trial(
        subject: &str,
        stimulus: &str,
        start: f64,
        n: usize,
        answer_at: Option<usize>,
    ) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let x = if (i / 8) % 2 == 0 { 0.2 } else { 0.7 };
                let code = match answer_at {
                    Some(k) if i >= k => 3,
                    _ => 0,
                };
                Sample::new(subject, stimulus, start + i as f64 * 0.02, x + i as f64 * 0.001, 0.5, code)
            })
            .collect()
    }

    #[test]
    fn test_analyze_stimulus_composes_stages() {
        let samples = trial("p1", "trog1.png", 0.0, 40, Some(32));
        let analysis = GazeProcessor::default().analyze_stimulus("p1", "trog1.png", &samples);

        assert_eq!(analysis.window.len(), 32);
        assert_eq!(analysis.metrics.response_code, Some(3));
        assert!((analysis.metrics.response_time.unwrap() - 0.64).abs() < 1e-9);

        let classification = analysis.classification.as_ref().unwrap();
        assert!(classification.threshold >= 0.5);
        assert!(classification.samples.iter().any(|s| s.label == GazeLabel::Saccade));
        assert_eq!(
            analysis.segments.iter().map(|s| s.sample_count).sum::<usize>(),
            32
        );
        assert_eq!(
            analysis.metrics.velocity_threshold_used,
            Some(classification.threshold)
        );
    }

    #[test]
    fn test_empty_window_degrades_to_undefined() {
        // answer registered on the very first sample
        let samples = trial("p1", "trog1.png", 0.0, 10, Some(0));
        let analysis = GazeProcessor::default().analyze_stimulus("p1", "trog1.png", &samples);

        assert!(analysis.window.is_empty());
        assert!(analysis.classification.is_none());
        assert!(analysis.segments.is_empty());
        assert_eq!(analysis.metrics.response_time, Some(0.0));
        assert_eq!(analysis.metrics.velocity_threshold_used, None);
        assert_eq!(analysis.metrics.saccade_count, 0);
        assert_eq!(analysis.metrics.dispersion_area, 0.0);
    }

    #[test]
    fn test_process_table_orders_units() {
        let mut samples = trial("p2", "trog2.png", 10.0, 20, Some(15));
        samples.extend(trial("p2", "trog1.png", 0.0, 20, None));
        samples.extend(trial("p1", "trog3.png", 0.0, 20, Some(18)));
        let table = GazeProcessor::default().process_table(&samples);

        let keys: Vec<(&str, &str)> = table
            .analyses
            .iter()
            .map(|a| (a.metrics.subject_id.as_str(), a.metrics.stimulus_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("p1", "trog3.png"), ("p2", "trog1.png"), ("p2", "trog2.png")]
        );
        assert_eq!(table.cleaning.input, 60);
        assert_eq!(table.metrics().len(), 3);

        // no answer: the whole trial is exploration, response code undefined
        assert_eq!(table.analyses[1].metrics.response_code, None);
        assert_eq!(table.analyses[1].window.len(), 20);
    }

    #[test]
    fn test_one_bad_unit_does_not_affect_others() {
        let mut samples = trial("p1", "trog1.png", 0.0, 20, Some(0));
        samples.extend(trial("p1", "trog2.png", 10.0, 20, Some(16)));
        let table = GazeProcessor::default().process_table(&samples);

        assert_eq!(table.analyses.len(), 2);
        assert!(table.analyses[0].classification.is_none());
        assert!(table.analyses[1].classification.is_some());
        assert!(table.analyses[1].metrics.velocity_threshold_used.is_some());
    }

    #[test]
    fn test_normalization_can_be_disabled() {
        let config = IvtConfig {
            normalize_coordinates: false,
            ..Default::default()
        };
        let samples = trial("p1", "trog1.png", 0.0, 16, None);
        let prepared = GazeProcessor::new(config).prepare(&samples);
        assert_eq!(prepared.samples[0].x, 0.2);

        let prepared = GazeProcessor::default().prepare(&samples);
        assert_eq!(prepared.samples[0].x, 0.0);
        assert!(prepared.samples.iter().all(|s| s.y == 0.5));
    }

    #[test]
    fn test_samples_to_metrics_json() {
        let ndjson = trial("p1", "trog1.png", 0.0, 24, Some(20))
            .iter()
            .map(|s| {
                serde_json::json!({
                    "subject_id": s.subject_id,
                    "stimulus_id": s.stimulus_id,
                    "timestamp": s.time_sec,
                    "x": s.x,
                    "y": s.y,
                    "response_code": s.response_code,
                })
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n");

        let json =
            samples_to_metrics_json(&ndjson, "control", TimestampUnit::Seconds, &IvtConfig::default())
                .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["group"], "control");
        assert_eq!(report["metrics"].as_array().unwrap().len(), 1);
        assert_eq!(report["metrics"][0]["response_code"], 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = IvtConfig {
            velocity_floor: -1.0,
            ..Default::default()
        };
        assert!(samples_to_metrics_json("", "g", TimestampUnit::Seconds, &config).is_err());
    }
}
