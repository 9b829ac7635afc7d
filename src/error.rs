//! Error types for mutation testing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a mutation testing run
///
/// Per-mutant execution problems (a test command that cannot be launched or
/// that times out) are not errors: they are recorded as
/// [`MutantOutcome::ExecutionError`](crate::driver::MutantOutcome) and the
/// run continues.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Missing or unusable configuration (workspace root, package path, config file)
    #[error("{message}")]
    Config { message: String },

    /// Failed to read a package file
    #[error("failed to read '{}': {error}", file.display())]
    FileRead { file: PathBuf, error: String },

    /// Failed to parse a source file as Rust
    #[error("failed to parse '{}' as Rust: {error}", file.display())]
    Parse { file: PathBuf, error: String },

    /// The unmutated package does not pass its own tests
    #[error("tests of the unmutated package do not pass: {reason}")]
    Baseline { reason: String },

    /// Failed to create or populate an isolation directory
    #[error("cannot write '{}': {error}", path.display())]
    Isolation { path: PathBuf, error: String },

    /// A tree was not restored after an operator reported success
    #[error("operator '{operator}' left {}:{line} in an inconsistent state: {reason}", file.display())]
    InternalConsistency {
        operator: String,
        file: PathBuf,
        line: usize,
        reason: String,
    },
}

impl MutationError {
    /// Short name of the error category, used as the diagnostic prefix
    pub fn category(&self) -> &'static str {
        match self {
            MutationError::Config { .. } | MutationError::FileRead { .. } => "configuration",
            MutationError::Parse { .. } => "parse",
            MutationError::Baseline { .. } => "baseline",
            MutationError::Isolation { .. } => "isolation",
            MutationError::InternalConsistency { .. } => "internal consistency",
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        MutationError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn isolation(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        MutationError::Isolation {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, MutationError>;
