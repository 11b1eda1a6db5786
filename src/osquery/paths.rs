//! Locating the osquery binary and the bundled extension.
//!
//! Resolution runs on every call so installs, upgrades and a toggled
//! extension are picked up without restarting.

use std::path::{Path, PathBuf};

use crate::config::OsqueryConfig;

/// Common `osqueryi` install locations, probed in order.
pub const BINARY_CANDIDATES: &[&str] = &[
    "/usr/local/bin/osqueryi",
    "/opt/homebrew/bin/osqueryi",
    "/opt/osquery/bin/osqueryi",
    "/usr/bin/osqueryi",
];

/// Bare name used when nothing is found; resolved through `PATH` at spawn.
pub const BINARY_FALLBACK: &str = "osqueryi";

/// Common locations of the bundled extension, probed in order.
pub const EXTENSION_CANDIDATES: &[&str] = &[
    "/usr/local/osquery_extensions/macadmins_extension.ext",
    "/opt/osquery/extensions/macadmins_extension.ext",
    "/var/osquery/extensions/macadmins_extension.ext",
];

/// Returns the osquery binary to launch.
///
/// A configured path always wins, even if it does not exist: the process
/// layer then reports `NotFound` instead of silently picking another binary.
pub fn resolve_binary(config: &OsqueryConfig) -> PathBuf {
    if let Some(path) = &config.binary {
        return path.clone();
    }
    first_existing(BINARY_CANDIDATES).unwrap_or_else(|| PathBuf::from(BINARY_FALLBACK))
}

/// Returns the extension binary if one is present on disk.
pub fn resolve_extension(config: &OsqueryConfig) -> Option<PathBuf> {
    match &config.extension {
        Some(path) => path.is_file().then(|| path.clone()),
        None => first_existing(EXTENSION_CANDIDATES),
    }
}

/// Returns the daemon socket if a daemon appears to be listening.
pub fn daemon_socket(config: &OsqueryConfig) -> Option<PathBuf> {
    config
        .daemon_socket
        .exists()
        .then(|| config.daemon_socket.clone())
}

fn first_existing(candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}
