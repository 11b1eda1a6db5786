//! Mock process runner for testing.
//!
//! Records every invocation it receives and answers with scripted outcomes,
//! so query-layer tests never spawn a real osquery.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ProcessInvocation, ProcessOutcome, ProcessRunner};
use crate::error::Result;

/// What the mock saw of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    executable: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl RecordedInvocation {
    fn of(invocation: &ProcessInvocation) -> Self {
        Self {
            executable: invocation.executable().to_path_buf(),
            args: invocation.args().to_vec(),
            timeout: invocation.timeout(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

type Responder = Box<dyn Fn(&ProcessInvocation) -> Result<ProcessOutcome> + Send + Sync>;

/// A spy runner that returns predefined results.
pub struct MockProcessRunner {
    responder: Responder,
    invocations: Mutex<Vec<RecordedInvocation>>,
    cancels: AtomicUsize,
}

impl MockProcessRunner {
    /// Creates a runner that answers every invocation with the same outcome.
    pub fn with_outcome(outcome: ProcessOutcome) -> Self {
        Self::with_responder(move |_| Ok(outcome.clone()))
    }

    /// Creates a runner that succeeds with the given stdout.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self::with_outcome(ProcessOutcome::new(stdout, "", 0))
    }

    /// Creates a runner whose answer depends on the invocation.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&ProcessInvocation) -> Result<ProcessOutcome> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            invocations: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    /// Returns a copy of every invocation received so far.
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::with_stdout("[]")
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, invocation: ProcessInvocation) -> Result<ProcessOutcome> {
        let result = (self.responder)(&invocation);
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(RecordedInvocation::of(&invocation));
        }
        result
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    // Answers synchronously, so nothing is ever left in flight.
    fn is_running(&self) -> bool {
        false
    }
}
