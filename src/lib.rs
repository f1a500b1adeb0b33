//! gazeflux - Deterministic eye-tracking analysis engine
//!
//! gazeflux turns a canonical gaze sample table into per-stimulus exploration
//! metrics through a deterministic pipeline: cleaning → normalization →
//! response-window extraction → I-VT classification → segment aggregation →
//! metric derivation.
//!
//! ## Modules
//!
//! - **Core pipeline**: `cleaning`, `normalizer`, `window`, `ivt`, `segments`, `metrics`
//! - **Group level**: `summary`, `accumulator`, `stats` (descriptives and rank test)
//! - **I/O**: `schema` (gaze.sample.v1 ingestion), `encoder` (JSON reports)

pub mod accumulator;
pub mod cleaning;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ivt;
pub mod metrics;
pub mod normalizer;
pub mod numeric;
pub mod partition;
pub mod pipeline;
pub mod schema;
pub mod segments;
pub mod stats;
pub mod summary;
pub mod types;
pub mod window;

pub use accumulator::GroupAccumulator;
pub use cleaning::{CleaningReport, OutlierFilter};
pub use config::{IvtConfig, ThresholdSampling};
pub use encoder::ReportEncoder;
pub use error::ComputeError;
pub use ivt::VelocityClassifier;
pub use pipeline::{samples_to_metrics_json, GazeProcessor, ProcessedTable};
pub use types::{
    Classification, ExplorationWindow, GazeLabel, LabeledSample, Sample, Segment,
    StimulusAnalysis, StimulusMetrics, SubjectSummary,
};

// Schema exports
pub use schema::{SampleAdapter, SampleRecord, TimestampUnit, SCHEMA_VERSION};

// Statistics exports
pub use stats::{GroupComparator, RankTest};

/// gazeflux version embedded in all reports
pub const GAZEFLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "gazeflux";
