//! CLI for mutant-score

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use mutant_score::{run, Config, MutationError, OperatorKind, Overrides, RunConfig};

/// Environment variable consulted when no workspace root is configured
const WORKSPACE_ROOT_ENV: &str = "MUTANT_SCORE_WORKSPACE_ROOT";

#[derive(Parser)]
#[command(name = "mutant-score")]
#[command(author, version, about = "Mutation testing for Cargo packages", long_about = None)]
struct Cli {
    /// Package to mutate, relative to the workspace root
    package: Option<PathBuf>,

    /// Directory packages are resolved against
    #[arg(short, long)]
    workspace_root: Option<PathBuf>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timeout in seconds for each test run
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Mutation operator to apply (repeatable, defaults to swap-branch)
    #[arg(short = 'o', long = "operator", value_enum)]
    operators: Vec<OperatorKind>,

    /// Keep the mutant directories after the run
    #[arg(long)]
    keep_mutants: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let verbose = cli.verbose;
    match run_cli(cli) {
        Ok(report) => {
            if verbose {
                report.print_details();
            }
            if report.execution_errors() > 0 {
                tracing::warn!(
                    count = report.execution_errors(),
                    "some mutants could not be tested and are not counted as survivors"
                );
            }
            println!("{}", report.score_line());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}: {}", "error".red().bold(), e.category(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<mutant_score::MutationReport, MutationError> {
    let package = cli
        .package
        .ok_or_else(|| MutationError::Config {
            message: "no package given (usage: mutant-score [OPTIONS] <PACKAGE>)".to_string(),
        })?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let overrides = Overrides {
        workspace_root: cli.workspace_root,
        env_workspace_root: std::env::var_os(WORKSPACE_ROOT_ENV).map(PathBuf::from),
        timeout: cli.timeout,
        operators: cli.operators,
        keep_mutants: cli.keep_mutants,
        verbose: cli.verbose,
    };

    let config = RunConfig::resolve(package, config, overrides)?;
    run(&config)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "mutant_score=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
