//! Subprocess execution for osq-glance.
//!
//! Provides a trait-based interface for running one external program with a
//! deadline, so the query layer can be exercised against a spy runner.

mod executor;
mod mock;

pub use executor::ProcessExecutor;
pub use mock::{MockProcessRunner, RecordedInvocation};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A single program launch: executable, arguments and deadline.
///
/// Built fresh for every call and consumed by [`ProcessRunner::run`]. Not
/// `Clone`, so a built invocation can only be run once.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessInvocation {
    executable: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessInvocation {
    /// Creates a new invocation.
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            args,
            timeout,
        }
    }

    pub fn executable(&self) -> &std::path::Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Renders the command line for log output.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a child that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit status, or -1 when the child was terminated by a signal.
    pub exit_code: i32,
}

impl ProcessOutcome {
    /// Creates an outcome from string output, mostly useful in tests.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            stderr: stderr.into().into_bytes(),
            exit_code,
        }
    }

    /// Returns true if the child exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Trait for anything that can run a [`ProcessInvocation`].
///
/// A non-zero exit code is not an error at this layer; implementations only
/// fail for launch failures, timeouts and cancellation.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the invocation to completion, timeout or cancellation.
    async fn run(&self, invocation: ProcessInvocation) -> Result<ProcessOutcome>;

    /// Cancels the in-flight invocation, if any. Idempotent.
    fn cancel(&self);

    /// Returns true while an invocation is in flight.
    fn is_running(&self) -> bool;
}
