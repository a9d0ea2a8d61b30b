//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads CSV inputs or generates a synthetic sample
//! - runs the per-category studies
//! - prints the report and writes optional exports

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, DemoArgs, OutputArgs, RunArgs, StudyArgs};
use crate::data::{SampleConfig, generate_sample, write_sample_csvs};
use crate::domain::StudyConfig;
use crate::error::AppError;
use crate::io::ingest::InputPaths;

pub mod pipeline;

/// Entry point for the `car` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `car --market ...` behaves like `car run --market ...`, and a bare `car`
    // runs the demo. Clap requires a subcommand name, so argv is rewritten first.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    init_tracing(args.output.verbose);

    let config = study_config_from_args(&args.study);
    let paths = InputPaths {
        market: args.market.clone(),
        target: args.target.clone(),
        events: args.events.clone(),
        market_column: args.market_column.clone(),
        target_column: args.target_column.clone(),
    };
    let out = pipeline::run_from_files(&paths, &config)?;
    present(&out, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    init_tracing(args.output.verbose);

    let config = study_config_from_args(&args.study);
    config.validate()?;
    let sample_config = SampleConfig {
        seed: args.seed,
        trading_days: args.days,
        event_count: args.events,
        ..SampleConfig::default()
    };
    let sample = generate_sample(&sample_config, config.major_injury_threshold)?;
    if let Some(dir) = &args.write_inputs {
        write_sample_csvs(dir, &sample)?;
        tracing::info!(dir = %dir.display(), "wrote synthetic inputs");
    }

    let out = pipeline::run_from_sample(sample, &config)?;
    present(&out, &args.output)
}

fn present(out: &pipeline::RunOutput, output: &OutputArgs) -> Result<(), AppError> {
    let significance = out.run.config.significance_level;
    let summary = out.run.summary();

    println!("{}", crate::report::format_run_header(&out.inputs, &out.run));
    println!("{}", crate::report::format_summary_table(&summary, significance));

    let warnings = crate::report::format_warnings(&out.run.warnings);
    if !warnings.is_empty() {
        println!("{warnings}");
    }

    if output.details {
        for study in &out.run.categories {
            println!("{}", crate::report::format_category_details(study));
        }
    }

    // Optional exports.
    if let Some(path) = &output.export_summary {
        crate::io::export::write_summary_csv(path, &summary, significance)?;
    }
    if let Some(path) = &output.export_caar {
        crate::io::export::write_caar_csv(path, &out.run)?;
    }
    if let Some(path) = &output.export_json {
        crate::io::export::write_study_json(path, &out.run)?;
    }

    Ok(())
}

pub fn study_config_from_args(args: &StudyArgs) -> StudyConfig {
    StudyConfig {
        estimation_window_length: args.estimation_window,
        event_window_length: args.event_window,
        major_injury_threshold: args.major_threshold,
        min_coverage: args.min_coverage,
        significance_level: args.significance,
    }
}

/// Logs go to stderr so stdout stays a clean report. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // `try_init` fails only if a subscriber is already installed.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

/// Rewrite argv so `car` defaults to `car demo`.
///
/// Rules:
/// - `car`                       -> `car demo`
/// - `car --market a.csv ...`    -> `car run --market a.csv ...`
/// - `car --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("demo".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "demo");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
