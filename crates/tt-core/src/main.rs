//! Tract Typology Core - mixture-model typologies of areal units
//!
//! The main entry point for tt-core, handling:
//! - Candidate sweeps and model comparison
//! - Single-candidate fits, classification, and merged output
//! - Configuration checks and presets
//! - Synthetic unit sets for demos

use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tt_common::error::{format_error_human, StructuredError};
use tt_common::{CovarianceStructure, Error, OutputFormat, Result, SCHEMA_VERSION};
use tt_config::{list_presets, load_config, LoadedConfig, PresetName, TypologyConfig};
use tt_core::exit_codes::ExitCode;
use tt_core::input::read_units;
use tt_core::log_event;
use tt_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use tt_core::output::{render, ClassifyReport, CompareReport, ReportHeader};
use tt_core::pipeline::Pipeline;
use tt_core::select::Criterion;
use tt_core::synthetic::synthetic_units;

/// Tract Typology Core - latent residential typologies from census counts
#[derive(Parser)]
#[command(name = "tt-core")]
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
    /// Path to a tract_typology.json configuration file
    #[arg(long, global = true, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Use a built-in preset (quick, standard, thorough) instead of a config file
    #[arg(long, global = true)]
    preset: Option<PresetName>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every configured candidate and print the comparison table
    Compare(CompareArgs),

    /// Fit one candidate and print the merged classification table
    Classify(ClassifyArgs),

    /// Resolve and validate the configuration
    Check,

    /// Configuration management
    Config(ConfigArgs),

    /// Emit a synthetic two-typology unit set
    Synth(SynthArgs),
}

/// Overrides for the `fit` and `output` sections of the configuration
#[derive(Args, Debug)]
struct FitArgs {
    /// Smallest class count to fit
    #[arg(long)]
    min_classes: Option<usize>,

    /// Largest class count to fit
    #[arg(long)]
    max_classes: Option<usize>,

    /// Covariance structures, comma separated (e.g. EEI,VVI or 1,2)
    #[arg(long, value_delimiter = ',')]
    structures: Option<Vec<String>>,

    /// Random restarts per candidate
    #[arg(long)]
    restarts: Option<usize>,

    /// Base seed for restart streams
    #[arg(long)]
    seed: Option<u64>,

    /// Absolute log-likelihood convergence tolerance
    #[arg(long)]
    tol: Option<f64>,

    /// EM iteration cap
    #[arg(long)]
    max_iter: Option<usize>,

    /// Minimum variance (eigenvalue) floor
    #[arg(long)]
    floor: Option<f64>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Decimal places in numeric output
    #[arg(long)]
    precision: Option<u32>,
}

impl FitArgs {
    fn apply(&self, config: &mut TypologyConfig) -> Result<()> {
        let fit = &mut config.fit;
        if let Some(v) = self.min_classes {
            fit.min_classes = v;
        }
        if let Some(v) = self.max_classes {
            fit.max_classes = v;
        }
        if let Some(names) = &self.structures {
            fit.structures = names
                .iter()
                .map(|s| s.parse::<CovarianceStructure>())
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(v) = self.restarts {
            fit.restarts = v;
        }
        if let Some(v) = self.seed {
            fit.seed = v;
        }
        if let Some(v) = self.tol {
            fit.tolerance = v;
        }
        if let Some(v) = self.max_iter {
            fit.max_iterations = v;
        }
        if let Some(v) = self.floor {
            fit.variance_floor = v;
        }
        if let Some(v) = self.threads {
            fit.threads = v;
        }
        if let Some(v) = self.precision {
            config.output.precision = v;
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// JSON array of units ("-" for stdin)
    input: PathBuf,

    /// Criterion to sort the table by
    #[arg(long, value_enum, default_value_t = Criterion::Bic)]
    sort: Criterion,

    #[command(flatten)]
    fit: FitArgs,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// JSON array of units ("-" for stdin)
    input: PathBuf,

    /// Number of classes
    #[arg(long, short = 'k')]
    classes: usize,

    /// Covariance structure (EII, VII, EEI, VVI, EEE, VVV or 1, 2, 3, 6)
    #[arg(long, short = 's')]
    structure: String,

    /// Output columns, comma separated (id, name, class, p_<j>, z_<feature>, raw_<feature>)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    #[command(flatten)]
    fit: FitArgs,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and its snapshot
    Show,

    /// List built-in presets
    Presets,
}

#[derive(Args, Debug)]
struct SynthArgs {
    /// Valid units to generate
    #[arg(long, short = 'n', default_value_t = 200)]
    n: usize,

    /// Generator seed
    #[arg(long, default_value_t = 36)]
    seed: u64,

    /// Extra units that feature derivation must exclude
    #[arg(long, default_value_t = 0)]
    invalid: usize,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::Ok
                }
                _ => ExitCode::ArgsError,
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    let mut log_config = LogConfig::from_env(level, cli.global.log_format);
    if cli.global.no_color {
        log_config = log_config.without_ansi();
    }
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id());
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "tt-core started",
        version = env!("CARGO_PKG_VERSION")
    );

    let exit_code = match run(&cli, &ctx) {
        Ok(()) => ExitCode::Ok,
        Err(err) => output_error(&cli.global, &ctx, &err),
    };

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Output,
        format!("tt-core finished: {}", exit_code),
        exit_code = exit_code.as_i32()
    );
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli, ctx: &LogContext) -> Result<()> {
    match &cli.command {
        Commands::Compare(args) => run_compare(&cli.global, ctx, args),
        Commands::Classify(args) => run_classify(&cli.global, ctx, args),
        Commands::Check => run_check(&cli.global, ctx),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global, ctx),
            ConfigCommands::Presets => run_config_presets(&cli.global),
        },
        Commands::Synth(args) => run_synth(&cli.global, args),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Load configuration, apply command-line overrides, and re-validate.
fn load(global: &GlobalOpts, ctx: &LogContext, overrides: Option<&FitArgs>) -> Result<LoadedConfig> {
    let mut loaded = load_config(global.config.as_deref(), global.preset)?;
    if let Some(fit) = overrides {
        fit.apply(&mut loaded.config)?;
        loaded.revalidate()?;
    }
    log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        format!("configuration from {}", loaded.paths.source),
        config_hash = loaded.snapshot.short_id(),
        candidates = loaded.config.candidate_count()
    );
    Ok(loaded)
}

fn emit(payload: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(payload.as_bytes())?;
    if !payload.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

fn emit_json(value: &serde_json::Value) -> Result<()> {
    emit(&serde_json::to_string_pretty(value)?)
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_compare(global: &GlobalOpts, ctx: &LogContext, args: &CompareArgs) -> Result<()> {
    let loaded = load(global, ctx, Some(&args.fit))?;
    let precision = loaded.config.output.precision;
    let units = read_units(&args.input)?;

    let pipeline = Pipeline::new(loaded.config, ctx.clone());
    let data = pipeline.prepare(&units)?;
    let comparison = pipeline.compare(&data)?.sorted_by(args.sort);

    let report = CompareReport {
        header: ReportHeader::new(ctx.run_id.clone(), loaded.snapshot),
        transform: data.report,
        standardizer: data.standardizer,
        comparison,
    };
    emit(&render(&report, global.format, precision)?)
}

fn run_classify(global: &GlobalOpts, ctx: &LogContext, args: &ClassifyArgs) -> Result<()> {
    let structure: CovarianceStructure = args.structure.parse()?;
    let loaded = load(global, ctx, Some(&args.fit))?;
    let precision = loaded.config.output.precision;
    let units = read_units(&args.input)?;

    let pipeline = Pipeline::new(loaded.config, ctx.clone());
    let data = pipeline.prepare(&units)?;
    let out = pipeline.classify(&data, args.classes, structure, args.columns.as_deref())?;

    let report = ClassifyReport {
        header: ReportHeader::new(ctx.run_id.clone(), loaded.snapshot),
        transform: data.report,
        standardizer: data.standardizer,
        fit: out.model,
        summary: out.result.summary,
        profiles: out.result.profiles,
        table: out.table,
    };
    emit(&render(&report, global.format, precision)?)
}

fn run_check(global: &GlobalOpts, ctx: &LogContext) -> Result<()> {
    let loaded = load(global, ctx, None)?;
    let snapshot = &loaded.snapshot;

    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "run_id": ctx.run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "status": "ok",
        "source": loaded.paths.source.to_string(),
        "config_path": snapshot.config_path,
        "config_hash": snapshot.config_hash,
        "features": loaded.config.feature_names(),
        "candidates": loaded.config.candidate_count(),
    });

    match global.format {
        OutputFormat::Json => emit_json(&response),
        OutputFormat::Jsonl => emit(&serde_json::to_string(&response)?),
        OutputFormat::Summary => emit(&format!(
            "[{}] check: OK ({}, {} candidates)",
            ctx.run_id,
            loaded.paths.source,
            loaded.config.candidate_count()
        )),
        OutputFormat::Md => {
            let mut out = String::from("# tt-core check\n\n");
            out.push_str(&format!("✓ configuration: ok ({})\n", loaded.paths.source));
            if let Some(path) = &snapshot.config_path {
                out.push_str(&format!("  Path: {}\n", path));
            }
            out.push_str(&format!("  Hash: {}\n", snapshot.short_id()));
            out.push_str(&format!(
                "  Features: {}\n",
                loaded.config.feature_names().join(", ")
            ));
            out.push_str(&format!(
                "  Candidates: {}\n",
                loaded.config.candidate_count()
            ));
            emit(&out)
        }
    }
}

fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> Result<()> {
    let loaded = load(global, ctx, None)?;
    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "run_id": ctx.run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "snapshot": loaded.snapshot,
        "config": loaded.config,
    });

    match global.format {
        OutputFormat::Jsonl => emit(&serde_json::to_string(&response)?),
        OutputFormat::Summary => emit(&format!(
            "[{}] config: {} ({})",
            ctx.run_id,
            loaded.paths.source,
            loaded.snapshot.short_id()
        )),
        OutputFormat::Md => {
            let mut out = String::from("# Effective configuration\n\n");
            out.push_str(&format!("Source: {}\n\n```json\n", loaded.paths.source));
            out.push_str(&serde_json::to_string_pretty(&loaded.config)?);
            out.push_str("\n```\n");
            emit(&out)
        }
        OutputFormat::Json => emit_json(&response),
    }
}

fn run_config_presets(global: &GlobalOpts) -> Result<()> {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => emit_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "presets": presets,
        })),
        OutputFormat::Jsonl => {
            let lines = presets
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            emit(&lines.join("\n"))
        }
        OutputFormat::Summary => emit(
            &presets
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        OutputFormat::Md => {
            let rows: Vec<Vec<String>> = presets
                .iter()
                .map(|p| {
                    vec![
                        p.name.clone(),
                        format!("{}..={}", p.min_classes, p.max_classes),
                        p.structures
                            .iter()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>()
                            .join(","),
                        p.restarts.to_string(),
                        p.description.clone(),
                    ]
                })
                .collect();
            emit(&tt_core::output::markdown::table(
                &["preset", "classes", "structures", "restarts", "description"],
                &rows,
            ))
        }
    }
}

fn run_synth(global: &GlobalOpts, args: &SynthArgs) -> Result<()> {
    let units = synthetic_units(args.n, args.seed, args.invalid)?;
    match global.format {
        OutputFormat::Jsonl => {
            let lines = units
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            emit(&lines.join("\n"))
        }
        OutputFormat::Summary => emit(&format!(
            "synth: {} units ({} valid, {} invalid), seed {}",
            units.len(),
            args.n,
            args.invalid,
            args.seed
        )),
        OutputFormat::Json | OutputFormat::Md => emit(&serde_json::to_string_pretty(&units)?),
    }
}

/// Report an error on stderr in the requested format and map it to an exit code.
fn output_error(global: &GlobalOpts, ctx: &LogContext, error: &Error) -> ExitCode {
    let exit_code = ExitCode::from_error(error);
    if exit_code == ExitCode::InternalError {
        log_event!(
            ctx,
            ERROR,
            event_names::INTERNAL_ERROR,
            Stage::Output,
            error.to_string(),
            code = error.code()
        );
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "exit_code": exit_code.as_i32(),
                "exit_code_name": exit_code.code_name(),
                "error": StructuredError::from(error),
            });
            let text = if global.format == OutputFormat::Json {
                serde_json::to_string_pretty(&response)
            } else {
                serde_json::to_string(&response)
            };
            match text {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("{}", StructuredError::from(error).to_json()),
            }
        }
        OutputFormat::Summary => {
            eprintln!("[{}] error {}: {}", ctx.run_id, exit_code.code_name(), error);
        }
        OutputFormat::Md => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(error, use_color));
        }
    }

    exit_code
}
