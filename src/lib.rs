//! Mutation Testing for Cargo packages
//!
//! This library measures the strength of a package's test suite by making
//! small changes to its source ("mutants") and checking whether the tests
//! notice. Each mutant is written to its own directory and tested there with
//! the host test command (`cargo test` by default). The mutation score is the
//! share of mutants the tests kill.
//!
//! The default operator swaps the two blocks of an `if`/`else`:
//!
//! ```text
//! if a > b { a } else { b }   =>   if a > b { b } else { a }
//! ```
//!
//! # Example Configuration
//!
//! ```yaml
//! workspace_root: /home/me/code
//! settings:
//!   timeout: 30
//!   baseline_timeout: 600
//!   test_command: [cargo, test]
//! operators: [swap-branch]
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mutant_score::{run, Config, Overrides, RunConfig};
//! use std::path::PathBuf;
//!
//! let overrides = Overrides {
//!     workspace_root: Some(PathBuf::from("/home/me/code")),
//!     ..Overrides::default()
//! };
//! let config = RunConfig::resolve("my-crate".into(), Config::default(), overrides).unwrap();
//! let report = run(&config).unwrap();
//! println!("{}", report.score_line());
//! ```

pub mod codegen;
pub mod config;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod materialize;
pub mod mutator;
pub mod package;
pub mod report;
pub mod runner;
pub mod score;
pub mod walker;

use tracing::{info, warn};

// Re-export main types at crate root
pub use config::{Config, Overrides, RunConfig, Settings};
pub use driver::{Driver, Mutant, MutantOutcome};
pub use error::{MutationError, Result};
pub use materialize::Materializer;
pub use mutator::{Catalog, Operator, OperatorKind};
pub use package::Package;
pub use report::MutationReport;
pub use runner::{verify_baseline, TestCommand, TestRun};
pub use score::{Score, ScoreSummary};

/// Run a complete mutation test: load, check the baseline, mutate, test
///
/// The scratch root holding the mutants is removed before this returns,
/// whether the run succeeded or not, unless `keep_mutants` is set.
pub fn run(config: &RunConfig) -> Result<MutationReport> {
    let dir = Package::resolve(&config.workspace_root, &config.package)?;
    let mut package = Package::load(&dir)?;
    let catalog = Catalog::new(&config.operators);

    let materializer = Materializer::new(config.scratch_dir.as_deref())?;
    let command = TestCommand {
        target_dir: Some(materializer.target_dir()),
        ..config.command.clone()
    };
    let baseline_command = TestCommand {
        timeout: config.baseline_timeout,
        ..command.clone()
    };
    let result = mutate(
        &mut package,
        &catalog,
        &materializer,
        &baseline_command,
        &command,
    );

    if config.keep_mutants {
        let kept = materializer.keep();
        warn!(dir = %kept.display(), "keeping mutant directories");
    }
    result
}

fn mutate(
    package: &mut Package,
    catalog: &Catalog,
    materializer: &Materializer,
    baseline_command: &TestCommand,
    command: &TestCommand,
) -> Result<MutationReport> {
    info!(package = %package.name, command = %command.display(), "checking baseline");
    let baseline = materializer.materialize_baseline(package)?;
    verify_baseline(baseline_command, &baseline)?;

    info!(operators = ?catalog.names(), "generating mutants");
    Driver::new(catalog, materializer, command).run(package)
}
