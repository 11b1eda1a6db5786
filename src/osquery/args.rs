//! Argument construction for osquery invocations.
//!
//! Pure functions: the service takes a snapshot of the environment, picks a
//! launch mode from it and renders the final [`ProcessInvocation`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::process::ProcessInvocation;

/// Seconds osquery waits for the extension to register its tables.
pub const EXTENSION_REGISTRATION_TIMEOUT_SECS: u64 = 10;

/// How osquery should print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `--json`, for data queries.
    Json,
    /// The shell's own line output, for meta commands like `.tables`.
    Lines,
}

/// Which of the three launch strategies a call uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fresh osquery loading the bundled extension on a private socket.
    IsolatedExtension { extension: PathBuf, socket: PathBuf },
    /// Attach to a running osqueryd.
    Daemon { socket: PathBuf },
    /// Plain one-shot osquery.
    Standalone,
}

/// Environment state relevant to one call, sampled right before it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnvironment {
    /// Extension binary, if enabled, present and wanted by this call.
    pub extension: Option<PathBuf>,
    /// Daemon socket, if it exists.
    pub daemon_socket: Option<PathBuf>,
}

impl LaunchEnvironment {
    /// Picks the launch mode in priority order: extension, daemon, standalone.
    ///
    /// The daemon is assumed not to carry the extension's tables, so an
    /// available extension wins even when a daemon is running. `socket` is
    /// only called in that case.
    pub fn launch_mode<F>(&self, socket: F) -> Result<LaunchMode>
    where
        F: FnOnce() -> Result<PathBuf>,
    {
        if let Some(extension) = &self.extension {
            return Ok(LaunchMode::IsolatedExtension {
                extension: extension.clone(),
                socket: socket()?,
            });
        }
        if let Some(daemon) = &self.daemon_socket {
            return Ok(LaunchMode::Daemon {
                socket: daemon.clone(),
            });
        }
        Ok(LaunchMode::Standalone)
    }
}

/// Forces a CPU architecture by launching through a wrapper binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchForcing {
    pub wrapper: PathBuf,
    pub arch: String,
}

/// Everything needed to render one invocation.
#[derive(Debug, Clone)]
pub struct InvocationSpec<'a> {
    pub binary: &'a Path,
    pub mode: &'a LaunchMode,
    pub extension_name: &'a str,
    pub output: OutputMode,
    pub command: &'a str,
    pub timeout: Duration,
    pub arch: Option<&'a ArchForcing>,
}

/// Builds the osquery argument list (without any wrapper prefix).
pub fn osquery_args(spec: &InvocationSpec<'_>) -> Vec<String> {
    let mut args = Vec::new();

    match spec.mode {
        LaunchMode::IsolatedExtension { extension, socket } => {
            args.extend([
                "--extensions_socket".to_string(),
                socket.display().to_string(),
                "--extension".to_string(),
                extension.display().to_string(),
                "--extensions_require".to_string(),
                spec.extension_name.to_string(),
                "--extensions_timeout".to_string(),
                EXTENSION_REGISTRATION_TIMEOUT_SECS.to_string(),
                "--disable_database".to_string(),
                "--allow_unsafe".to_string(),
            ]);
        }
        LaunchMode::Daemon { socket } => {
            args.push("--connect".to_string());
            args.push(socket.display().to_string());
        }
        LaunchMode::Standalone => {}
    }

    if spec.output == OutputMode::Json {
        args.push("--json".to_string());
    }
    args.push(spec.command.to_string());
    args
}

/// Renders the final invocation, applying the architecture wrapper when the
/// extension is loaded.
pub fn build_invocation(spec: &InvocationSpec<'_>) -> ProcessInvocation {
    let args = osquery_args(spec);

    match (spec.mode, spec.arch) {
        (LaunchMode::IsolatedExtension { .. }, Some(arch)) => {
            let mut wrapped = Vec::with_capacity(args.len() + 2);
            wrapped.push(format!("-{}", arch.arch));
            wrapped.push(spec.binary.display().to_string());
            wrapped.extend(args);
            ProcessInvocation::new(arch.wrapper.clone(), wrapped, spec.timeout)
        }
        _ => ProcessInvocation::new(spec.binary, args, spec.timeout),
    }
}
