//! gazeflux CLI - Command-line interface for the gazeflux engine
//!
//! Commands:
//! - analyze: Process gaze sample files of one group into a metrics report
//! - compare: Compare two saved groups (descriptives and rank test)
//! - validate: Validate sample records against gaze.sample.v1
//! - doctor: Diagnose configuration and capabilities
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gazeflux::encoder::REPORT_VERSION;
use gazeflux::schema::{
    subject_id_from_path, BatchLoad, SampleAdapter, SampleRecord, SkippedInput, StimulusPattern,
    TimestampUnit, SCHEMA_VERSION,
};
use gazeflux::stats::{GroupComparator, RankTest};
use gazeflux::types::Sample;
use gazeflux::{
    CleaningReport, GazeProcessor, GroupAccumulator, IvtConfig, ReportEncoder, GAZEFLUX_VERSION,
    PRODUCER_NAME,
};

/// gazeflux - Eye-tracking fixation/saccade analysis
#[derive(Parser)]
#[command(name = "gazeflux")]
#[command(version = GAZEFLUX_VERSION)]
#[command(about = "Classify gaze samples and compare exploration metrics between groups", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the sample files of one group into a metrics report
    Analyze {
        /// Input files (use - for stdin); one subject per file unless records carry subject_id
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Group label
        #[arg(short, long, default_value = "group")]
        group: String,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Unit of the raw timestamp field
        #[arg(long, default_value = "microseconds")]
        timestamp_unit: TimestampUnitArg,

        /// Analysis configuration (JSON); defaults apply to missing fields
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep only stimuli matching a prefix*suffix pattern, e.g. "trog*.png"
        #[arg(long)]
        stimulus_pattern: Option<String>,

        /// Load previously accumulated rows of this group
        #[arg(long)]
        load_group: Option<PathBuf>,

        /// Save accumulated rows of this group after processing
        #[arg(long)]
        save_group: Option<PathBuf>,
    },

    /// Compare two groups saved with `analyze --save-group`
    Compare {
        /// First group file
        #[arg(long)]
        group_a: PathBuf,

        /// Second group file
        #[arg(long)]
        group_b: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Validate sample records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and capabilities
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a saved group file
        #[arg(long)]
        group: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One metrics row per line
    Ndjson,
    /// Full report, compact
    Json,
    /// Full report, pretty-printed
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum TimestampUnitArg {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl From<TimestampUnitArg> for TimestampUnit {
    fn from(arg: TimestampUnitArg) -> Self {
        match arg {
            TimestampUnitArg::Seconds => TimestampUnit::Seconds,
            TimestampUnitArg::Milliseconds => TimestampUnit::Milliseconds,
            TimestampUnitArg::Microseconds => TimestampUnit::Microseconds,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Input schema (gaze.sample.v1)
    Input,
    /// Output schema (gaze.report.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GazeCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            group,
            input_format,
            output_format,
            timestamp_unit,
            config,
            stimulus_pattern,
            load_group,
            save_group,
        } => cmd_analyze(AnalyzeArgs {
            inputs: &input,
            output: &output,
            group: &group,
            input_format,
            output_format,
            unit: timestamp_unit.into(),
            config: config.as_deref(),
            stimulus_pattern: stimulus_pattern.as_deref(),
            load_group: load_group.as_deref(),
            save_group: save_group.as_deref(),
        }),

        Commands::Compare {
            group_a,
            group_b,
            output,
            pretty,
        } => cmd_compare(&group_a, &group_b, &output, pretty),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            config,
            group,
            json,
        } => cmd_doctor(config.as_deref(), group.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

struct AnalyzeArgs<'a> {
    inputs: &'a [PathBuf],
    output: &'a Path,
    group: &'a str,
    input_format: InputFormat,
    output_format: OutputFormat,
    unit: TimestampUnit,
    config: Option<&'a Path>,
    stimulus_pattern: Option<&'a str>,
    load_group: Option<&'a Path>,
    save_group: Option<&'a Path>,
}

fn cmd_analyze(args: AnalyzeArgs<'_>) -> Result<(), GazeCliError> {
    let config = match args.config {
        Some(path) => IvtConfig::load(path)?,
        None => IvtConfig::default(),
    };
    let pattern = args.stimulus_pattern.map(StimulusPattern::parse).transpose()?;

    let mut batch = BatchLoad::new();
    for path in args.inputs {
        let result = load_input(path, &args, pattern.as_ref()).map_err(|e| CliError::from(e).message);
        batch.absorb(path.display().to_string(), result);
    }
    if !batch.skipped.is_empty() {
        info!(
            loaded = batch.loaded,
            skipped = batch.skipped.len(),
            "some inputs were skipped"
        );
    }

    if batch.samples.is_empty() {
        return Err(GazeCliError::NoSamples);
    }

    let processed = GazeProcessor::new(config.clone()).process_table(&batch.samples);

    let mut accumulator = match args.load_group {
        Some(path) => GroupAccumulator::from_json(&fs::read_to_string(path)?)?,
        None => GroupAccumulator::new(args.group),
    };
    if accumulator.group() != args.group {
        return Err(GazeCliError::GroupMismatch {
            expected: args.group.to_string(),
            actual: accumulator.group().to_string(),
        });
    }
    accumulator.extend(&processed.analyses);
    info!(group = args.group, rows = accumulator.len(), "group accumulated");

    if let Some(path) = args.save_group {
        fs::write(path, accumulator.to_json()?)?;
    }

    let output_data = format_metrics(
        &accumulator,
        &config,
        processed.cleaning,
        batch.skipped,
        args.output_format,
    )?;
    write_output(args.output, &output_data)
}

/// Read and convert one input file; failures stay local to that file
fn load_input(
    path: &Path,
    args: &AnalyzeArgs<'_>,
    pattern: Option<&StimulusPattern>,
) -> Result<Vec<Sample>, GazeCliError> {
    let records = parse_records(&read_input(path)?, args.input_format)?;

    let mut adapter = SampleAdapter::new(args.unit);
    if !is_stdio(path) {
        if let Some(subject) = subject_id_from_path(path) {
            adapter = adapter.with_default_subject(subject);
        }
    }
    if let Some(pattern) = pattern {
        adapter = adapter.with_stimulus_pattern(pattern.clone());
    }

    Ok(adapter.to_samples(&records)?)
}

fn cmd_compare(
    group_a: &Path,
    group_b: &Path,
    output: &Path,
    pretty: bool,
) -> Result<(), GazeCliError> {
    let a = GroupAccumulator::from_json(&fs::read_to_string(group_a)?)?;
    let b = GroupAccumulator::from_json(&fs::read_to_string(group_b)?)?;

    let encoder = ReportEncoder::new();
    let report = encoder.encode_comparison(&a, &b, &GroupComparator::default());
    let output_data = encoder.encode_to_json(&report, pretty)? + "\n";
    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), GazeCliError> {
    let records = parse_records(&read_input(input)?, input_format)?;
    let results = SampleAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                subject_id: r.subject_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (subject {}): {}",
                    err.index,
                    err.subject_id.as_deref().unwrap_or("unknown"),
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(GazeCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, group: Option<&Path>, json: bool) -> Result<(), GazeCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck::ok("version", format!("gazeflux version {}", GAZEFLUX_VERSION)),
        DoctorCheck::ok("schema_version", format!("Input schema: {}", SCHEMA_VERSION)),
    ];

    checks.push(match RankTest::detect() {
        RankTest::Available => DoctorCheck::ok("rank_test", "Mann-Whitney U available".to_string()),
        RankTest::Unavailable => DoctorCheck {
            name: "rank_test".to_string(),
            status: CheckStatus::Warning,
            message: "Built without rank-test feature; p-values will be undefined".to_string(),
        },
    });

    if let Some(path) = config {
        checks.push(match IvtConfig::load(path) {
            Ok(config) => DoctorCheck::ok(
                "config",
                format!(
                    "Configuration valid (percentile {}, floor {}, min fixation {}s)",
                    config.velocity_percentile, config.velocity_floor, config.min_fixation_duration_sec
                ),
            ),
            Err(e) => DoctorCheck::error("config", e.to_string()),
        });
    }

    if let Some(path) = group {
        checks.push(if !path.exists() {
            DoctorCheck {
                name: "group".to_string(),
                status: CheckStatus::Warning,
                message: "Group file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(path) {
                Ok(content) => match GroupAccumulator::from_json(&content) {
                    Ok(acc) => DoctorCheck::ok(
                        "group",
                        format!(
                            "Group '{}' valid ({} rows, {} segments)",
                            acc.group(),
                            acc.len(),
                            acc.segments().len()
                        ),
                    ),
                    Err(e) => DoctorCheck::error("group", format!("Invalid group JSON: {}", e)),
                },
                Err(e) => DoctorCheck::error("group", format!("Cannot read group file: {}", e)),
            }
        });
    }

    checks.push(DoctorCheck::ok(
        "stdin",
        if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (interactive mode)".to_string()
        } else {
            "stdin is a pipe (input ready)".to_string()
        },
    ));

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: GAZEFLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("gazeflux Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(GazeCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), GazeCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per eye-tracker sample:");
                println!("- stimulus_id (alias stimulus, stimuli): required");
                println!("- subject_id: optional, defaults to the file name after the first '_'");
                println!("- timestamp: raw time in --timestamp-unit (default microseconds)");
                println!("- x, y: gaze coordinates; both 0 marks a dropout");
                println!("- response_code (alias key): 0 = no answer, 1..4 = answer given");
                println!();
                println!("Missing numeric fields are read as 0.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Metrics report (analyze):");
                println!("- producer: {{ name, version, instance_id }}, computed_at_utc");
                println!("- group, config, cleaning: {{ input, dropouts, invalid_times, outliers, duplicate_timestamps, retained }}");
                println!("- metrics: one row per subject x stimulus");
                println!("  response_code, response_time, saccade_count, mean_saccade_duration,");
                println!("  fixation_count, mean_fixation_duration, dispersion_area, velocity_threshold_used");
                println!("- segments: {{ subject_id, stimulus_id, segment_id, label, t_start, t_end, duration, ... }}");
                println!("- subjects: per-subject summaries");
                println!("- skipped_inputs: {{ source, error }} for input files that could not be read (omitted when none)");
                println!();
                println!("Comparison report (compare):");
                println!("- by_stimulus, consolidated: {{ metric, group_a, group_b, u_statistic, p_value }}");
                println!("- pairwise, pairwise_summary: subject-pair differences");
                println!();
                println!("Undefined values are null.");
            }
        }
    }
    Ok(())
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, GazeCliError> {
    if is_stdio(path) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), GazeCliError> {
    if is_stdio(path) {
        print!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn parse_records(data: &str, format: InputFormat) -> Result<Vec<SampleRecord>, GazeCliError> {
    let records = match format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(data)?,
        InputFormat::Json => SampleAdapter::parse_array(data)?,
    };
    Ok(records)
}

fn format_metrics(
    accumulator: &GroupAccumulator,
    config: &IvtConfig,
    cleaning: CleaningReport,
    skipped: Vec<SkippedInput>,
    format: OutputFormat,
) -> Result<String, GazeCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for row in accumulator.metrics() {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let encoder = ReportEncoder::new();
            let report = encoder
                .encode_metrics(accumulator, config, cleaning)
                .with_skipped_inputs(skipped);
            let pretty = matches!(format, OutputFormat::JsonPretty);
            Ok(encoder.encode_to_json(&report, pretty)? + "\n")
        }
    }
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "gazeflux eye-tracker sample record",
        "type": "object",
        "required": ["stimulus_id"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "subject_id": { "type": "string" },
            "stimulus_id": { "type": "string" },
            "timestamp": { "type": ["number", "null"] },
            "x": { "type": ["number", "null"] },
            "y": { "type": ["number", "null"] },
            "response_code": { "type": ["integer", "null"] }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    let nullable = serde_json::json!({ "type": ["number", "null"] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REPORT_VERSION,
        "description": "gazeflux metrics report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at_utc", "group", "metrics"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "group": { "type": "string" },
            "metrics": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "subject_id": { "type": "string" },
                        "stimulus_id": { "type": "string" },
                        "response_code": { "type": ["integer", "null"] },
                        "response_time": nullable,
                        "saccade_count": { "type": "integer" },
                        "mean_saccade_duration": nullable,
                        "fixation_count": { "type": "integer" },
                        "mean_fixation_duration": nullable,
                        "dispersion_area": { "type": "number" },
                        "velocity_threshold_used": nullable
                    }
                }
            }
        }
    })
    .to_string()
}

// Error handling

#[derive(Debug)]
enum GazeCliError {
    Io(io::Error),
    Compute(gazeflux::ComputeError),
    Json(serde_json::Error),
    NoSamples,
    GroupMismatch { expected: String, actual: String },
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for GazeCliError {
    fn from(e: io::Error) -> Self {
        GazeCliError::Io(e)
    }
}

impl From<gazeflux::ComputeError> for GazeCliError {
    fn from(e: gazeflux::ComputeError) -> Self {
        GazeCliError::Compute(e)
    }
}

impl From<serde_json::Error> for GazeCliError {
    fn from(e: serde_json::Error) -> Self {
        GazeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GazeCliError> for CliError {
    fn from(e: GazeCliError) -> Self {
        match e {
            GazeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GazeCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} and the config is valid", SCHEMA_VERSION)),
            },
            GazeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GazeCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input files are not empty and the stimulus pattern matches".to_string()),
            },
            GazeCliError::GroupMismatch { expected, actual } => CliError {
                code: "GROUP_MISMATCH".to_string(),
                message: format!("Loaded group '{}' but --group is '{}'", actual, expected),
                hint: Some("Pass the same --group used when the file was saved".to_string()),
            },
            GazeCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            GazeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    subject_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }

    fn error(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
