//! Tokio-backed process executor.
//!
//! Runs one child at a time, races it against a deadline and an external
//! cancellation request, and reports exactly one outcome per invocation.

use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ProcessInvocation, ProcessOutcome, ProcessRunner};
use crate::error::{OsqError, Result};

/// Single-shot decision between completion, timeout and cancellation.
///
/// Claimed from the run task (completion or timeout) and from `cancel()`;
/// only the first claim wins.
#[derive(Debug, Default)]
struct Decision {
    decided: AtomicBool,
}

impl Decision {
    fn claim(&self) -> bool {
        self.decided
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Handle to the invocation currently running, shared with `cancel()`.
#[derive(Debug, Clone)]
struct InFlight {
    decision: Arc<Decision>,
    cancel: CancellationToken,
}

/// Clears the in-flight slot when a run finishes or its future is dropped.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }
}

enum Verdict {
    Completed(io::Result<ProcessOutcome>),
    TimedOut,
    Cancelled,
}

/// Runs external programs with a deadline and cooperative cancellation.
///
/// Concurrent calls to [`ProcessRunner::run`] queue on an internal lock, so
/// at most one child is alive per executor.
#[derive(Debug, Default)]
pub struct ProcessExecutor {
    run_lock: tokio::sync::Mutex<()>,
    current: Mutex<Option<InFlight>>,
}

impl ProcessExecutor {
    /// Creates a new executor with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(invocation: &ProcessInvocation) -> Result<Child> {
        Command::new(invocation.executable())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => OsqError::not_found(format!(
                    "{} could not be launched: {e}",
                    invocation.executable().display()
                )),
                _ => OsqError::execution_failed(format!(
                    "Failed to launch {}: {e}",
                    invocation.executable().display()
                )),
            })
    }
}

#[async_trait]
impl ProcessRunner for ProcessExecutor {
    async fn run(&self, invocation: ProcessInvocation) -> Result<ProcessOutcome> {
        let executable = invocation.executable();
        if executable.is_absolute() && !executable.exists() {
            return Err(OsqError::not_found(format!(
                "{} does not exist",
                executable.display()
            )));
        }

        let _serial = self.run_lock.lock().await;

        let mut child = Self::spawn(&invocation)?;
        debug!("Spawned: {}", invocation.display_command());

        let in_flight = InFlight {
            decision: Arc::new(Decision::default()),
            cancel: CancellationToken::new(),
        };
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(in_flight.clone());
        }
        let _clear = InFlightGuard {
            slot: &self.current,
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let timeout = invocation.timeout();

        let verdict = {
            let completion = collect(&mut child, stdout, stderr);
            tokio::select! {
                biased;
                _ = in_flight.cancel.cancelled() => Verdict::Cancelled,
                result = completion => Verdict::Completed(result),
                _ = tokio::time::sleep(timeout) => Verdict::TimedOut,
            }
        };

        match verdict {
            Verdict::Completed(result) => {
                if in_flight.decision.claim() {
                    result.map_err(|e| {
                        OsqError::execution_failed(format!("Failed to collect output: {e}"))
                    })
                } else {
                    // cancel() claimed the decision while the child was exiting
                    debug!("Discarding output of cancelled invocation");
                    Err(OsqError::Cancelled)
                }
            }
            Verdict::TimedOut => {
                terminate(&mut child).await;
                if in_flight.decision.claim() {
                    warn!(
                        "Invocation timed out after {:?}: {}",
                        timeout,
                        invocation.display_command()
                    );
                    Err(OsqError::Timeout(timeout))
                } else {
                    Err(OsqError::Cancelled)
                }
            }
            Verdict::Cancelled => {
                terminate(&mut child).await;
                debug!("Invocation cancelled: {}", invocation.display_command());
                Err(OsqError::Cancelled)
            }
        }
    }

    fn cancel(&self) {
        let current = self.current.lock().ok().and_then(|guard| guard.clone());
        if let Some(in_flight) = current {
            if in_flight.decision.claim() {
                in_flight.cancel.cancel();
            }
        }
    }

    fn is_running(&self) -> bool {
        self.current
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

/// Waits for the child while draining both pipes so it never blocks on a full pipe.
async fn collect<O, E>(
    child: &mut Child,
    stdout: Option<O>,
    stderr: Option<E>,
) -> io::Result<ProcessOutcome>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let (status, stdout, stderr) =
        tokio::try_join!(child.wait(), read_all(stdout), read_all(stderr))?;
    Ok(ProcessOutcome {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
    })
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kills the child and reaps it. Errors mean it already exited.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Kill skipped: {e}");
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap killed child: {e}");
    }
}
