//! Exhaust CLI - Command-line interface for Synheart Exhaustion
//!
//! Commands:
//! - fuse: Fuse behavioral and physiological metrics into an exhaustion index
//! - predict: Project a fused score history forward
//! - replay: Run recorded landmark observations through the per-frame pipeline
//! - config: Print the effective engine configuration

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use synheart_exhaustion::{
    calculate_exhaustion_index, detect_exhaustion_pattern, predict_fatigue_trajectory,
    ComputeError, EngineConfig, ExhaustionResult, FaceObservation, FrameTracker, FusionInput,
    PatternAnalysis, ENGINE_VERSION,
};

/// Exhaust - On-device fatigue and exhaustion engine
#[derive(Parser)]
#[command(name = "exhaust")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Estimate fatigue from facial landmarks and interaction metrics", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (logs go to stderr)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse behavioral and physiological metrics
    Fuse {
        /// Input JSON file with `behavioral` and `physiological` objects (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Also attribute the exhaustion pattern
        #[arg(long)]
        pattern: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Predict the score trajectory from a JSON array of fused scores
    Predict {
        /// Input JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Replay NDJSON observations (`{"timestamp_ms": .., "face": {..}}`) into NDJSON frame metrics
    Replay {
        /// Input NDJSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the session summary to this file when the stream ends
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Print the effective engine configuration
    Config {
        /// Configuration file to validate and print (defaults are printed otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

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

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<(), ExhaustCliError> {
    match cli.command {
        Commands::Fuse {
            input,
            pattern,
            pretty,
        } => cmd_fuse(&input, pattern, pretty),

        Commands::Predict { input, pretty } => cmd_predict(&input, pretty),

        Commands::Replay {
            input,
            config,
            summary,
            flush,
        } => cmd_replay(&input, config.as_deref(), summary.as_deref(), flush),

        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

fn cmd_fuse(input: &Path, pattern: bool, pretty: bool) -> Result<(), ExhaustCliError> {
    let input_data = read_input(input)?;
    let fusion: FusionInput = serde_json::from_str(&input_data)?;

    let result = calculate_exhaustion_index(&fusion.behavioral, &fusion.physiological);
    debug!(
        total_score = result.total_score,
        level = result.level.as_str(),
        "fused"
    );

    if pattern {
        let output = FuseOutput {
            pattern: detect_exhaustion_pattern(&result.factors),
            exhaustion: result,
        };
        print_json(&output, pretty)
    } else {
        print_json(&result, pretty)
    }
}

fn cmd_predict(input: &Path, pretty: bool) -> Result<(), ExhaustCliError> {
    let input_data = read_input(input)?;
    let history: Vec<f64> = serde_json::from_str(&input_data)?;

    let prediction = predict_fatigue_trajectory(&history);
    print_json(&prediction, pretty)
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    summary: Option<&Path>,
    flush: bool,
) -> Result<(), ExhaustCliError> {
    let config = load_config(config)?;
    let mut tracker = FrameTracker::new(config);

    let reader: Box<dyn BufRead> = if is_stdin(input) {
        if atty::is(atty::Stream::Stdin) {
            info!("reading observations from the terminal, one JSON object per line");
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let mut stdout = io::stdout();
    let mut last_timestamp: Option<i64> = None;
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: ObservationRecord =
            serde_json::from_str(trimmed).map_err(|source| ExhaustCliError::Record {
                line: index + 1,
                source,
            })?;

        if last_timestamp.is_some_and(|t| record.timestamp_ms < t) {
            warn!(
                line = index + 1,
                timestamp_ms = record.timestamp_ms,
                "observation out of order, skipped"
            );
            skipped += 1;
            continue;
        }

        match tracker.process(record.face.as_ref(), record.timestamp_ms) {
            Ok(metrics) => {
                last_timestamp = Some(record.timestamp_ms);
                writeln!(stdout, "{}", serde_json::to_string(&metrics)?)?;
                if flush {
                    stdout.flush()?;
                }
            }
            Err(ComputeError::MalformedObservation(reason)) => {
                warn!(line = index + 1, %reason, "malformed observation, skipped");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    stdout.flush()?;

    let session = tracker.summary();
    info!(
        session_id = %session.session_id,
        frames = session.frames_processed,
        skipped,
        intervention_required = session.intervention_required,
        "replay finished"
    );

    if let Some(path) = summary {
        fs::write(path, serde_json::to_string_pretty(session)?)?;
    }

    Ok(())
}

fn cmd_config(config: Option<&Path>) -> Result<(), ExhaustCliError> {
    let config = load_config(config)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, ExhaustCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, ExhaustCliError> {
    if is_stdin(path) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), ExhaustCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

// Record types

/// One line of replay input
#[derive(Deserialize)]
struct ObservationRecord {
    timestamp_ms: i64,
    /// Absent or null when the detector found no face
    #[serde(default)]
    face: Option<FaceObservation>,
}

#[derive(Serialize)]
struct FuseOutput {
    exhaustion: ExhaustionResult,
    pattern: PatternAnalysis,
}

// Error types

#[derive(Debug)]
enum ExhaustCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    Record { line: usize, source: serde_json::Error },
}

impl From<io::Error> for ExhaustCliError {
    fn from(e: io::Error) -> Self {
        ExhaustCliError::Io(e)
    }
}

impl From<ComputeError> for ExhaustCliError {
    fn from(e: ComputeError) -> Self {
        ExhaustCliError::Compute(e)
    }
}

impl From<serde_json::Error> for ExhaustCliError {
    fn from(e: serde_json::Error) -> Self {
        ExhaustCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ExhaustCliError> for CliError {
    fn from(e: ExhaustCliError) -> Self {
        match e {
            ExhaustCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ExhaustCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'exhaust config' to see a valid configuration".to_string()),
            },
            ExhaustCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ExhaustCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ExhaustCliError::Record { line, source } => CliError {
                code: "RECORD_ERROR".to_string(),
                message: format!("line {}: {}", line, source),
                hint: Some(
                    "Each line must be {\"timestamp_ms\": <int>, \"face\": {\"keypoints\": [..]} | null}"
                        .to_string(),
                ),
            },
        }
    }
}
