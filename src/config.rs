//! Configuration for mutation runs
//!
//! Settings come from three places, in order of precedence: command line
//! flags, an optional YAML file, and built-in defaults. The workspace root is
//! the one setting without a default; the environment fallback for it is
//! read by the binary and handed in like any other override.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MutationError, Result};
use crate::mutator::OperatorKind;
use crate::runner::TestCommand;

/// Contents of the configuration file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory package paths are resolved against
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    #[serde(default)]
    pub settings: Settings,
    /// Operators to apply at every node, in order
    #[serde(default = "default_operators")]
    pub operators: Vec<OperatorKind>,
}

/// Global settings for mutation testing
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Timeout in seconds for each mutant's test run
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Timeout in seconds for the baseline run, which also builds dependencies
    #[serde(default = "default_baseline_timeout")]
    pub baseline_timeout: u64,
    /// Program and arguments of the host test command
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
    /// Keep the mutant directories after the run
    #[serde(default)]
    pub keep_mutants: bool,
    /// Where to create the scratch root (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: None,
            settings: Settings::default(),
            operators: default_operators(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            baseline_timeout: default_baseline_timeout(),
            test_command: default_test_command(),
            keep_mutants: false,
            scratch_dir: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_baseline_timeout() -> u64 {
    600
}

fn default_test_command() -> Vec<String> {
    vec!["cargo".to_string(), "test".to_string()]
}

fn default_operators() -> Vec<OperatorKind> {
    vec![OperatorKind::SwapBranch]
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MutationError::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content).map_err(|e| {
            MutationError::config(format!("config file '{}': {}", path.display(), e))
        })
    }

    /// Parse and validate YAML configuration
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| {
            MutationError::config(format!("invalid YAML: {}", e.to_string().replace('\n', " ")))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that deserialize fine but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.settings.timeout == 0 || self.settings.baseline_timeout == 0 {
            return Err(MutationError::config("timeout must be at least 1 second"));
        }
        if self.settings.test_command.is_empty() {
            return Err(MutationError::config("test_command must name a program"));
        }
        if self.operators.is_empty() {
            return Err(MutationError::config("at least one operator is required"));
        }
        Ok(())
    }
}

/// Values given on the command line, or taken from the environment by the binary
#[derive(Debug, Default)]
pub struct Overrides {
    pub workspace_root: Option<PathBuf>,
    /// Lowest precedence source for the workspace root
    pub env_workspace_root: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub operators: Vec<OperatorKind>,
    pub keep_mutants: bool,
    pub verbose: bool,
}

/// Fully resolved settings of one run
#[derive(Debug)]
pub struct RunConfig {
    pub workspace_root: PathBuf,
    /// Package path, relative to the workspace root
    pub package: PathBuf,
    /// Command run on every mutant
    pub command: TestCommand,
    pub baseline_timeout: Duration,
    pub operators: Vec<OperatorKind>,
    pub keep_mutants: bool,
    pub scratch_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Merge `overrides` into `config` for a run on `package`
    pub fn resolve(package: PathBuf, config: Config, overrides: Overrides) -> Result<Self> {
        if package.as_os_str().is_empty() {
            return Err(MutationError::config("no package given"));
        }

        let workspace_root = overrides
            .workspace_root
            .or(config.workspace_root)
            .or(overrides.env_workspace_root)
            .ok_or_else(|| {
                MutationError::config(
                    "workspace root is not set (use --workspace-root, `workspace_root` in the \
                     config file, or MUTANT_SCORE_WORKSPACE_ROOT)",
                )
            })?;

        let timeout = overrides.timeout.unwrap_or(config.settings.timeout);
        if timeout == 0 {
            return Err(MutationError::config("timeout must be at least 1 second"));
        }

        // A mutant never waits longer than the baseline is allowed to
        let baseline_timeout = config.settings.baseline_timeout.max(timeout);

        let mut test_command = config.settings.test_command.into_iter();
        let program = test_command
            .next()
            .ok_or_else(|| MutationError::config("test_command must name a program"))?;

        let operators = if overrides.operators.is_empty() {
            config.operators
        } else {
            overrides.operators
        };

        Ok(Self {
            workspace_root,
            package,
            command: TestCommand {
                program,
                args: test_command.collect(),
                timeout: Duration::from_secs(timeout),
                verbose: overrides.verbose,
                target_dir: None,
            },
            baseline_timeout: Duration::from_secs(baseline_timeout),
            operators,
            keep_mutants: overrides.keep_mutants || config.settings.keep_mutants,
            scratch_dir: config.settings.scratch_dir,
        })
    }
}
