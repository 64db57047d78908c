//! Presage CLI - Command-line interface for Presage Prep
//!
//! Commands:
//! - validate: Check raw readings against the input contract
//! - transform: Derive feature vectors from raw readings (batch mode)
//! - features: Print the ordered feature-name list
//! - doctor: Diagnose pipeline health and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use presage_prep::{
    BatchPolicy, FeatureTransformer, PrepError, RawReading, Validator, ARTIFACT_VERSION,
    FEATURE_NAMES, PREP_VERSION, PRODUCER_NAME,
};

/// Presage - deterministic preprocessing for predictive-maintenance inference
#[derive(Parser)]
#[command(name = "presage")]
#[command(author = "Presage Maintenance")]
#[command(version = PREP_VERSION)]
#[command(about = "Transform machine readings into model feature vectors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check raw readings against the input contract
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

    /// Derive feature vectors from raw readings (batch mode)
    Transform {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// What to do with a reading whose timestamp fails to parse
        #[arg(long, default_value = "abort")]
        on_error: ErrorPolicy,

        /// Reject the batch unless every reading validates first
        #[arg(long)]
        validate: bool,

        /// Load the pipeline from a saved artifact instead of defaults
        #[arg(long)]
        pipeline: Option<PathBuf>,

        /// Save the pipeline artifact after processing
        #[arg(long)]
        save_pipeline: Option<PathBuf>,
    },

    /// Print the ordered feature-name list
    Features {
        /// Output as JSON array
        #[arg(long)]
        json: bool,
    },

    /// Diagnose pipeline health and configuration
    Doctor {
        /// Check a pipeline artifact file
        #[arg(long)]
        pipeline: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one reading per line)
    Ndjson,
    /// JSON array of readings
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one vector per line)
    Ndjson,
    /// JSON array of vectors
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum ErrorPolicy {
    /// First failing reading aborts the whole batch
    Abort,
    /// Failing readings are dropped; survivors keep their order
    Skip,
}

impl From<ErrorPolicy> for BatchPolicy {
    fn from(policy: ErrorPolicy) -> Self {
        match policy {
            ErrorPolicy::Abort => BatchPolicy::Abort,
            ErrorPolicy::Skip => BatchPolicy::Skip,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PrepCliError> {
    match cli.command {
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            on_error,
            validate,
            pipeline,
            save_pipeline,
        } => cmd_transform(
            &input,
            &output,
            input_format,
            output_format,
            on_error,
            validate,
            pipeline.as_deref(),
            save_pipeline.as_deref(),
        ),

        Commands::Features { json } => cmd_features(json),

        Commands::Doctor { pipeline, json } => cmd_doctor(pipeline.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, PrepCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_readings(data: &str, format: InputFormat) -> Result<Vec<RawReading>, PrepCliError> {
    let readings = match format {
        InputFormat::Ndjson => RawReading::parse_ndjson(data)?,
        InputFormat::Json => RawReading::parse_array(data)?,
    };
    if readings.is_empty() {
        return Err(PrepCliError::NoReadings);
    }
    Ok(readings)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PrepCliError> {
    let data = read_input(input)?;
    let readings = parse_readings(&data, input_format)?;

    let validator = Validator::default();
    let errors: Vec<ValidationDetail> = readings
        .iter()
        .enumerate()
        .filter_map(|(index, reading)| {
            let report = validator.validate(reading);
            if report.valid {
                None
            } else {
                Some(ValidationDetail {
                    index,
                    message: report.message,
                })
            }
        })
        .collect();

    let report = ValidationSummary {
        total_readings: readings.len(),
        valid_readings: readings.len() - errors.len(),
        invalid_readings: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total readings:   {}", report.total_readings);
        println!("Valid readings:   {}", report.valid_readings);
        println!("Invalid readings: {}", report.invalid_readings);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Reading {}: {}", err.index, err.message);
            }
        }
    }

    if report.invalid_readings > 0 {
        Err(PrepCliError::ValidationFailed(report.invalid_readings))
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_transform(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    on_error: ErrorPolicy,
    validate: bool,
    pipeline: Option<&Path>,
    save_pipeline: Option<&Path>,
) -> Result<(), PrepCliError> {
    let data = read_input(input)?;
    let readings = parse_readings(&data, input_format)?;

    if validate {
        let validator = Validator::default();
        let invalid = readings
            .iter()
            .filter(|reading| !validator.validate(reading).valid)
            .count();
        if invalid > 0 {
            return Err(PrepCliError::ValidationFailed(invalid));
        }
    }

    let transformer = match pipeline {
        Some(path) => FeatureTransformer::load(path)?,
        None => FeatureTransformer::new(),
    };

    let vectors = transformer.transform_batch_with(&readings, on_error.into())?;

    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for vector in &vectors {
                lines.push(serde_json::to_string(vector)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&vectors)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&vectors)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if let Some(path) = save_pipeline {
        transformer.save(path)?;
    }

    Ok(())
}

fn cmd_features(json: bool) -> Result<(), PrepCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(&FEATURE_NAMES)?);
    } else {
        println!("Feature order ({} slots):", FEATURE_NAMES.len());
        for (slot, name) in FEATURE_NAMES.iter().enumerate() {
            println!("  {:2}. {}", slot + 1, name);
        }
    }
    Ok(())
}

fn cmd_doctor(pipeline: Option<&Path>, json: bool) -> Result<(), PrepCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "prep_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Prep version {}", PREP_VERSION),
    });

    checks.push(DoctorCheck {
        name: "artifact_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Pipeline artifact schema: {}", ARTIFACT_VERSION),
    });

    if let Some(path) = pipeline {
        if path.exists() {
            match FeatureTransformer::load(path) {
                Ok(transformer) => {
                    checks.push(DoctorCheck {
                        name: "pipeline".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Pipeline artifact valid ({} features, fitted: {})",
                            transformer.feature_names().len(),
                            transformer.is_fitted()
                        ),
                    });
                }
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "pipeline".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid pipeline artifact: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "pipeline".to_string(),
                status: CheckStatus::Warning,
                message: "Pipeline artifact file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (batch mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PREP_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Presage Doctor Report");
        println!("=====================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PrepCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum PrepCliError {
    Io(io::Error),
    Prep(PrepError),
    Json(serde_json::Error),
    NoReadings,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PrepCliError {
    fn from(e: io::Error) -> Self {
        PrepCliError::Io(e)
    }
}

impl From<PrepError> for PrepCliError {
    fn from(e: PrepError) -> Self {
        PrepCliError::Prep(e)
    }
}

impl From<serde_json::Error> for PrepCliError {
    fn from(e: serde_json::Error) -> Self {
        PrepCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PrepCliError> for CliError {
    fn from(e: PrepCliError) -> Self {
        match e {
            PrepCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PrepCliError::Prep(e) => CliError {
                code: "PREP_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check reading fields, especially datetime".to_string()),
            },
            PrepCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PrepCliError::NoReadings => CliError {
                code: "NO_READINGS".to_string(),
                message: "No readings found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PrepCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} readings failed validation", count),
                hint: Some("Run 'presage validate' for details".to_string()),
            },
            PrepCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationSummary {
    total_readings: usize,
    valid_readings: usize,
    invalid_readings: usize,
    errors: Vec<ValidationDetail>,
}

#[derive(serde::Serialize)]
struct ValidationDetail {
    index: usize,
    message: String,
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

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
