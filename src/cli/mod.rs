//! Command-line parsing for the event study.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the study/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "car", version, about = "Event study: market-model CARs by injury severity")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the study on market, target and event CSV files.
    Run(RunArgs),
    /// Run the study on seeded synthetic data.
    Demo(DemoArgs),
}

/// Input files for `car run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Market index prices CSV (Date + price column).
    #[arg(long, value_name = "CSV", env = "CAR_MARKET_CSV")]
    pub market: PathBuf,

    /// Target company prices CSV (Date + price column).
    #[arg(long, value_name = "CSV", env = "CAR_TARGET_CSV")]
    pub target: PathBuf,

    /// Incident events CSV (EventDate + injury counts).
    #[arg(long, value_name = "CSV", env = "CAR_EVENTS_CSV")]
    pub events: PathBuf,

    /// Price column in the market file.
    #[arg(long, default_value = "Adj Close")]
    pub market_column: String,

    /// Price column in the target file.
    #[arg(long, default_value = "Close")]
    pub target_column: String,

    #[command(flatten)]
    pub study: StudyArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Synthetic data options for `car demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of market trading days to generate.
    #[arg(long, default_value_t = 1500)]
    pub days: usize,

    /// Number of incident events to generate.
    #[arg(long, default_value_t = 40)]
    pub events: usize,

    /// Also write the generated market/target/events CSVs to this directory.
    #[arg(long, value_name = "DIR")]
    pub write_inputs: Option<PathBuf>,

    #[command(flatten)]
    pub study: StudyArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Study parameters shared by `run` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct StudyArgs {
    /// Estimation window length (trading days).
    #[arg(long, default_value_t = 60)]
    pub estimation_window: usize,

    /// Event window length after the anchor day (trading days).
    #[arg(long, default_value_t = 10)]
    pub event_window: usize,

    /// Events with more total injuries than this are "Major Injury".
    #[arg(long, default_value_t = 100)]
    pub major_threshold: u32,

    /// Minimum share of estimation days with both returns present.
    #[arg(long, default_value_t = 0.9)]
    pub min_coverage: f64,

    /// Significance level for the reject column.
    #[arg(long, default_value_t = 0.05)]
    pub significance: f64,
}

/// Output options shared by `run` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Print CAAR paths, per-event CARs and rejection tallies.
    #[arg(long)]
    pub details: bool,

    /// Export the summary table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_summary: Option<PathBuf>,

    /// Export per-category AAR/CAAR paths to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_caar: Option<PathBuf>,

    /// Export the full run (config, results, rejections) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Log per-event rejections (debug level).
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_study_defaults() {
        let cli = Cli::try_parse_from([
            "car", "run", "--market", "m.csv", "--target", "t.csv", "--events", "e.csv",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.market, PathBuf::from("m.csv"));
        assert_eq!(args.market_column, "Adj Close");
        assert_eq!(args.target_column, "Close");
        assert_eq!(args.study.estimation_window, 60);
        assert_eq!(args.study.event_window, 10);
        assert_eq!(args.study.major_threshold, 100);
        assert!(!args.output.details);
        assert!(args.output.export_json.is_none());
    }

    #[test]
    fn demo_accepts_study_options() {
        let cli = Cli::try_parse_from([
            "car",
            "demo",
            "--seed",
            "7",
            "--estimation-window",
            "30",
            "--details",
            "--export-caar",
            "caar.csv",
        ])
        .unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.seed, 7);
        assert_eq!(args.study.estimation_window, 30);
        assert!(args.output.details);
        assert_eq!(args.output.export_caar, Some(PathBuf::from("caar.csv")));
    }
}
