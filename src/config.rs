//! Configuration management for osq-glance.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! Every path here is a hint: presence on disk is checked again per call.

use crate::error::{OsqError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for osq-glance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// osquery invocation settings.
    #[serde(default)]
    pub osquery: OsqueryConfig,
}

/// Settings for driving the osquery shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsqueryConfig {
    /// Path to `osqueryi`. Probed from common install locations when unset.
    pub binary: Option<PathBuf>,

    /// Path to the bundled extension binary. Probed when unset.
    pub extension: Option<PathBuf>,

    /// Name the extension registers under (for `--extensions_require`).
    #[serde(default = "default_extension_name")]
    pub extension_name: String,

    /// Whether extension-backed tables should be loaded at all.
    #[serde(default = "default_extension_enabled")]
    pub extension_enabled: bool,

    /// Rendezvous socket of a running osqueryd.
    #[serde(default = "default_daemon_socket")]
    pub daemon_socket: PathBuf,

    /// Directory for per-call extension sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Sockets older than this are deleted at startup.
    #[serde(default = "default_stale_socket_age_secs")]
    pub stale_socket_age_secs: u64,

    /// Deadline for data queries.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Deadline for `.tables` and `.schema`.
    #[serde(default = "default_meta_timeout_secs")]
    pub meta_timeout_secs: u64,

    /// Deadline for the `--version` availability probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// CPU architecture the extension is built for.
    #[serde(default = "default_force_arch")]
    pub force_arch: String,

    /// Wrapper used to force that architecture.
    #[serde(default = "default_arch_wrapper")]
    pub arch_wrapper: PathBuf,
}

fn default_extension_name() -> String {
    "macadmins_extension".to_string()
}

fn default_extension_enabled() -> bool {
    true
}

fn default_daemon_socket() -> PathBuf {
    PathBuf::from("/var/osquery/osquery.em")
}

// Unix socket paths are limited to ~104 bytes, so stay out of $TMPDIR.
fn default_socket_dir() -> PathBuf {
    PathBuf::from("/tmp/osq-glance")
}

fn default_stale_socket_age_secs() -> u64 {
    3600
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_meta_timeout_secs() -> u64 {
    15
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_force_arch() -> String {
    "arm64".to_string()
}

fn default_arch_wrapper() -> PathBuf {
    PathBuf::from("/usr/bin/arch")
}

impl Default for OsqueryConfig {
    fn default() -> Self {
        Self {
            binary: None,
            extension: None,
            extension_name: default_extension_name(),
            extension_enabled: default_extension_enabled(),
            daemon_socket: default_daemon_socket(),
            socket_dir: default_socket_dir(),
            stale_socket_age_secs: default_stale_socket_age_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            meta_timeout_secs: default_meta_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            force_arch: default_force_arch(),
            arch_wrapper: default_arch_wrapper(),
        }
    }
}

impl OsqueryConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn meta_timeout(&self) -> Duration {
        Duration::from_secs(self.meta_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn stale_socket_age(&self) -> Duration {
        Duration::from_secs(self.stale_socket_age_secs)
    }

    /// Applies environment variables as defaults for unset paths.
    pub fn apply_env_defaults(&mut self) {
        if self.binary.is_none() {
            self.binary = std::env::var_os("OSQ_GLANCE_BINARY").map(PathBuf::from);
        }
        if self.extension.is_none() {
            self.extension = std::env::var_os("OSQ_GLANCE_EXTENSION").map(PathBuf::from);
        }
        if let Some(socket) = std::env::var_os("OSQ_GLANCE_DAEMON_SOCKET") {
            if self.daemon_socket == default_daemon_socket() {
                self.daemon_socket = PathBuf::from(socket);
            }
        }
    }

    /// Rejects values that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.query_timeout_secs == 0
            || self.meta_timeout_secs == 0
            || self.probe_timeout_secs == 0
        {
            return Err(OsqError::config("Timeouts must be at least one second"));
        }
        if self.extension_name.trim().is_empty() {
            return Err(OsqError::config("extension_name cannot be empty"));
        }
        if self.force_arch.trim().is_empty() {
            return Err(OsqError::config("force_arch cannot be empty"));
        }
        Ok(())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("osq-glance")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| OsqError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            OsqError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.osquery.validate()?;
        Ok(config)
    }
}
