//! Test execution
//!
//! Runs the host test command inside a mutant's directory and reports how it
//! terminated. The exit status is the only signal: a failing suite kills the
//! mutant, a passing one lets it survive, and a command that cannot be
//! started or never finishes is an execution error.
//!
//! On Unix the command runs in a process group of its own, and a timeout
//! kills the whole group, including test binaries `cargo test` started.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::driver::MutantOutcome;
use crate::error::{MutationError, Result};

/// How often a running test command is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The host test command, e.g. `cargo test`
#[derive(Debug, Clone)]
pub struct TestCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Let the command's output through to stderr instead of discarding it
    pub verbose: bool,
    /// Exported as `CARGO_TARGET_DIR`
    pub target_dir: Option<PathBuf>,
}

impl Default for TestCommand {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec!["test".to_string()],
            timeout: Duration::from_secs(30),
            verbose: false,
            target_dir: None,
        }
    }
}

/// How a single run of the test command ended
#[derive(Debug, Clone, PartialEq)]
pub enum TestRun {
    /// The command exited successfully
    Passed,
    /// The command exited with a failure status (this includes build failures)
    Failed { code: Option<i32> },
    /// The command was still running when the timeout expired and was killed
    TimedOut(Duration),
    /// The command could not be started or waited on
    LaunchFailed(String),
}

impl TestRun {
    /// Classify the run of a mutant's tests
    pub fn outcome(&self) -> MutantOutcome {
        match self {
            TestRun::Failed { .. } => MutantOutcome::Killed,
            TestRun::Passed => MutantOutcome::Survived,
            TestRun::TimedOut(_) | TestRun::LaunchFailed(_) => MutantOutcome::ExecutionError,
        }
    }

    /// One-line explanation, for reports and diagnostics
    pub fn describe(&self) -> String {
        match self {
            TestRun::Passed => "tests passed".to_string(),
            TestRun::Failed { code: Some(code) } => format!("tests failed with status {code}"),
            TestRun::Failed { code: None } => "tests terminated by a signal".to_string(),
            TestRun::TimedOut(timeout) => {
                format!("tests timed out after {:.1}s", timeout.as_secs_f64())
            }
            TestRun::LaunchFailed(error) => format!("failed to run tests: {error}"),
        }
    }
}

impl TestCommand {
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command in `dir` and wait for it, at most `timeout`
    pub fn run(&self, dir: &Path) -> TestRun {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(dir).stdin(Stdio::null());

        if self.verbose {
            // stdout is reserved for the score line
            cmd.stdout(io::stderr());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        if let Some(target_dir) = &self.target_dir {
            cmd.env("CARGO_TARGET_DIR", target_dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!(command = %self.display(), dir = %dir.display(), "running tests");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return TestRun::LaunchFailed(format!("cannot start `{}`: {e}", self.display()))
            }
        };

        match wait_with_timeout(child, self.timeout) {
            Ok(Some(status)) if status.success() => TestRun::Passed,
            Ok(Some(status)) => TestRun::Failed {
                code: status.code(),
            },
            Ok(None) => TestRun::TimedOut(self.timeout),
            Err(e) => TestRun::LaunchFailed(format!("cannot wait for `{}`: {e}", self.display())),
        }
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Returns `Ok(None)` if the child had to be killed.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // The child may exit between the check and the kill
            let _ = kill_tree(&mut child);
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child` and every process in its process group
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    let group = child.id() as libc::pid_t;
    // SAFETY: kill(2) only sends a signal, it touches no memory of ours
    if unsafe { libc::kill(-group, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        child.kill()
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Require the unmutated package in `dir` to pass its own tests
pub fn verify_baseline(command: &TestCommand, dir: &Path) -> Result<()> {
    match command.run(dir) {
        TestRun::Passed => Ok(()),
        other => Err(MutationError::Baseline {
            reason: other.describe(),
        }),
    }
}
