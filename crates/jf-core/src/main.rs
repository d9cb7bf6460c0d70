//! jitflow core CLI
//!
//! Entry point for the `jf-core` binary:
//! - `run`: simulate online defect prediction over a project's change stream
//! - `evaluate`: prequential metrics over a saved prediction stream
//! - `calibrate`: operating-point search or quantile threshold
//! - `check`: resolve and validate configuration

use clap::{Args, Parser, Subcommand};
use jf_common::error::format_error_human;
use jf_common::{Error, OutputFormat, PredictionStream, StructuredError, SCHEMA_VERSION};
use jf_core::artifacts::FsArtifactStore;
use jf_core::calibrate::{analyze_results, calculate_th_from_test};
use jf_core::config::{load_config, ConfigError, ResolvedConfig, VerificationMode};
use jf_core::driver::OnlineDriver;
use jf_core::exit_codes::ExitCode;
use jf_core::learner::ProcessLearner;
use jf_core::log_event;
use jf_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use jf_core::prequential::{calculate_prequential_mean_and_std, PrequentialReport};
use jf_core::stream::{ChangeStream, StreamFilter};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// jitflow - online just-in-time defect prediction simulator
#[derive(Parser)]
#[command(name = "jf-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to jitflow.json
    #[arg(long, global = true, env = "JITFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a project's change stream with the external learner
    Run(RunArgs),

    /// Prequential metrics over a saved prediction stream
    Evaluate(EvaluateArgs),

    /// Threshold calibration over a saved prediction stream
    Calibrate(CalibrateArgs),

    /// Resolve, load and validate configuration
    Check,

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON-lines change stream
    #[arg(long)]
    stream: PathBuf,

    /// Project to simulate (default: stream file stem)
    #[arg(long)]
    project: Option<String>,

    /// Window size (overrides config)
    #[arg(long)]
    step: Option<usize>,

    /// First stream position to simulate (overrides config)
    #[arg(long)]
    start: Option<usize>,

    /// One past the last stream position to simulate (overrides config)
    #[arg(long)]
    end: Option<usize>,

    /// Verification mode: simple, real, or auto (overrides config)
    #[arg(long)]
    mode: Option<String>,

    /// Artifact directory (overrides config)
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Do not persist per-window slices
    #[arg(long)]
    no_persist: bool,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Prediction stream or run report (JSON)
    #[arg(long)]
    predictions: PathBuf,

    /// Decay factor (overrides config)
    #[arg(long)]
    decay: Option<f64>,

    /// Include the per-position series
    #[arg(long)]
    series: bool,
}

#[derive(Args, Debug)]
struct CalibrateArgs {
    /// Prediction stream or run report (JSON)
    #[arg(long)]
    predictions: PathBuf,

    /// Use the q-th score quantile instead of the G-mean search
    #[arg(long)]
    quantile: Option<f64>,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let exit_code = match cli.command {
        Commands::Run(args) => run_simulation(&cli.global, &args),
        Commands::Evaluate(args) => run_evaluate(&cli.global, &args),
        Commands::Calibrate(args) => run_calibrate(&cli.global, &args),
        Commands::Check => run_check(&cli.global),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Commands
// ============================================================================

fn run_simulation(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let resolved = match load_config(global.config.as_deref()) {
        Ok(r) => r,
        Err(e) => return config_failure(global, e),
    };
    let ResolvedConfig {
        mut config,
        snapshot,
        ..
    } = resolved;

    if let Some(step) = args.step {
        config.window.step = step;
    }
    if args.start.is_some() {
        config.window.start = args.start;
    }
    if args.end.is_some() {
        config.window.end = args.end;
    }
    if let Some(mode) = &args.mode {
        config.verification.mode = match mode.to_lowercase().as_str() {
            "simple" => VerificationMode::Simple,
            "real" => VerificationMode::Real,
            "auto" => VerificationMode::Auto,
            other => {
                eprintln!("jf-core: unknown verification mode '{other}' (expected simple, real, auto)");
                return ExitCode::ArgsError;
            }
        };
    }
    if let Some(dir) = &args.artifacts_dir {
        config.artifacts.dir = dir.clone();
    }
    if args.no_persist {
        config.artifacts.persist_slices = false;
    }
    if let Err(e) = jf_config::validate_config(&config) {
        return config_failure(global, ConfigError::from(e));
    }

    let project = args.project.clone().unwrap_or_else(|| {
        args.stream
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });
    let ctx = LogContext::new(generate_run_id(), project.clone());
    log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        format!("configuration from {}", snapshot.source),
        config_hash = snapshot.short_id()
    );

    let filter = StreamFilter {
        project: args.project.clone(),
        start: config.window.start,
        end: config.window.end,
    };
    let stream = match ChangeStream::load_jsonl(&args.stream, &filter) {
        Ok(s) => s,
        Err(e) => return failure(global, &e),
    };
    log_event!(
        ctx,
        INFO,
        event_names::STREAM_LOADED,
        Stage::Init,
        format!("{} changes loaded", stream.len()),
        records = stream.len()
    );

    let model_dir = config.artifacts.dir.join(&project).join("model");
    let learner = ProcessLearner::new(config.trainer.clone(), model_dir);
    let store = FsArtifactStore::new(config.artifacts.dir.clone());
    let mut driver = OnlineDriver::new(config, learner, store, ctx).with_snapshot(snapshot);

    match driver.run(&stream) {
        Ok(report) => {
            emit(global, report.render(global.format));
            report.exit_code()
        }
        Err(e) => failure(global, &e),
    }
}

fn run_evaluate(global: &GlobalOpts, args: &EvaluateArgs) -> ExitCode {
    let decay = match args.decay {
        Some(d) => d,
        None => match load_config(global.config.as_deref()) {
            Ok(r) => r.config.evaluation.decay_factor,
            Err(e) => return config_failure(global, e),
        },
    };
    let stream = match load_predictions(&args.predictions) {
        Ok(s) => s,
        Err(e) => return failure(global, &e),
    };
    let mut report = match calculate_prequential_mean_and_std(&stream, decay) {
        Ok(r) => r,
        Err(e) => return failure(global, &e),
    };
    if !args.series {
        report.series.clear();
    }

    let rendered = match global.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report),
        OutputFormat::Md => Ok(prequential_markdown(&report)),
        OutputFormat::Summary => Ok(format!(
            "{} samples, g-mean {:.3}±{:.3}, f1 {:.3}±{:.3}, auc {}",
            report.samples,
            report.g_mean.mean,
            report.g_mean.std,
            report.f1.mean,
            report.f1.std,
            report
                .roc_auc
                .map(|a| format!("{a:.3}"))
                .unwrap_or_else(|| "n/a".to_string())
        )),
    };
    emit(global, rendered);
    ExitCode::Clean
}

fn run_calibrate(global: &GlobalOpts, args: &CalibrateArgs) -> ExitCode {
    let stream = match load_predictions(&args.predictions) {
        Ok(s) => s,
        Err(e) => return failure(global, &e),
    };

    if let Some(q) = args.quantile {
        let Some(threshold) = calculate_th_from_test(&stream.pred_probs, q) else {
            eprintln!("jf-core: no quantile for q = {q} over {} scores", stream.len());
            return ExitCode::DataError;
        };
        let rendered = match global.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "method": "quantile",
                "quantile": q,
                "threshold": threshold,
                "samples": stream.len(),
            })),
            _ => Ok(format!("threshold {threshold:.6} (q = {q}, {} scores)", stream.len())),
        };
        emit(global, rendered);
        return ExitCode::Clean;
    }

    let op = match analyze_results(&stream) {
        Ok(op) => op,
        Err(e) => return failure(global, &e),
    };
    let rendered = match global.format {
        OutputFormat::Json => serde_json::to_string_pretty(&op),
        _ => Ok(format!(
            "threshold {:.6}: g-mean {:.4}, recall0 {:.4}, recall1 {:.4}, f1_0 {:.4}, f1_1 {:.4} ({} positives, {} negatives)",
            op.threshold, op.g_mean, op.recall0, op.recall1, op.f1_0, op.f1_1, op.positives, op.negatives
        )),
    };
    emit(global, rendered);
    ExitCode::Clean
}

fn run_check(global: &GlobalOpts) -> ExitCode {
    match load_config(global.config.as_deref()) {
        Ok(resolved) => {
            let rendered = match global.format {
                OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                    "schema_version": SCHEMA_VERSION,
                    "status": "ok",
                    "source": resolved.source.to_string(),
                    "path": resolved.path.as_ref().map(|p| p.display().to_string()),
                    "snapshot": resolved.snapshot,
                })),
                _ => Ok(format!(
                    "config ok ({}, {})",
                    resolved.source,
                    resolved.snapshot.short_id()
                )),
            };
            emit(global, rendered);
            ExitCode::Clean
        }
        Err(e) => config_failure(global, e),
    }
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let version_info = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "jf_core_version": env!("CARGO_PKG_VERSION"),
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            });
            emit(global, serde_json::to_string_pretty(&version_info));
        }
        _ => {
            println!("jf-core {}", env!("CARGO_PKG_VERSION"));
            println!("schema version: {}", SCHEMA_VERSION);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Accepts a bare prediction stream or a run report carrying one.
fn load_predictions(path: &Path) -> Result<PredictionStream, Error> {
    let content = std::fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&content)?;
    if let Some(inner) = value.get_mut("predictions") {
        value = inner.take();
    }
    let stream: PredictionStream = serde_json::from_value(value)?;
    if !stream.is_aligned() {
        return Err(Error::InvalidStream(format!(
            "{}: prediction columns differ in length",
            path.display()
        )));
    }
    Ok(stream)
}

fn prequential_markdown(report: &PrequentialReport) -> String {
    let mut md = format!(
        "# Prequential evaluation\n\n{} samples, decay {}\n\n| metric | mean | std |\n|---|---:|---:|\n",
        report.samples, report.decay_factor
    );
    for (name, s) in [
        ("g-mean", report.g_mean),
        ("f1", report.f1),
        ("precision", report.precision),
        ("recall", report.recall),
        ("r0", report.r0),
        ("r1", report.r1),
        ("|r0-r1|", report.r_gap),
    ] {
        md.push_str(&format!("| {name} | {:.4} | {:.4} |\n", s.mean, s.std));
    }
    if let Some(auc) = report.roc_auc {
        md.push_str(&format!("\nROC-AUC: {auc:.4}\n"));
    }
    md
}

fn emit(global: &GlobalOpts, rendered: Result<String, serde_json::Error>) {
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => {
            let err = Error::Json(e);
            report_error(global, &err);
        }
    }
}

fn config_failure(global: &GlobalOpts, err: ConfigError) -> ExitCode {
    let err = Error::from(err);
    report_error(global, &err);
    ExitCode::ConfigError
}

fn failure(global: &GlobalOpts, err: &Error) -> ExitCode {
    report_error(global, err);
    ExitCode::for_error(err)
}

/// JSON consumers get a structured error on stdout; humans get stderr.
fn report_error(global: &GlobalOpts, err: &Error) {
    match global.format {
        OutputFormat::Json => println!("{}", StructuredError::from(err).to_json()),
        _ => eprintln!(
            "{}",
            format_error_human(err, std::io::stderr().is_terminal())
        ),
    }
}
