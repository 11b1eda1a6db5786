//! Per-call extension sockets.
//!
//! Each extension-backed invocation gets its own socket path named with a
//! fresh UUID, so concurrent queries never share an extension manager.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OsqError, Result};

const SOCKET_PREFIX: &str = "osq-";
const SOCKET_SUFFIX: &str = ".em";

/// A uniquely named socket path, removed when dropped.
///
/// osquery creates the socket itself; this handle only owns the name and the
/// cleanup.
#[derive(Debug)]
pub struct ExtensionSocket {
    path: PathBuf,
}

impl ExtensionSocket {
    /// Reserves a fresh socket path inside `dir`, creating the directory.
    pub fn allocate(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            OsqError::internal(format!(
                "Could not create socket directory {}: {e}",
                dir.display()
            ))
        })?;

        let name = format!("{SOCKET_PREFIX}{}{SOCKET_SUFFIX}", Uuid::new_v4().simple());
        Ok(Self {
            path: dir.join(name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExtensionSocket {
    fn drop(&mut self) {
        remove_socket(&self.path);

        // The extension listens on `<path>.<route>` next to the manager socket.
        let (Some(dir), Some(name)) = (
            self.path.parent(),
            self.path.file_name().and_then(|n| n.to_str()),
        ) else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let sibling = entry.file_name();
            let is_route = sibling
                .to_str()
                .and_then(|s| s.strip_prefix(name))
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(is_route_suffix);
            if is_route {
                remove_socket(&entry.path());
            }
        }
    }
}

fn remove_socket(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed extension socket {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove extension socket {}: {e}", path.display()),
    }
}

fn is_route_suffix(route: &str) -> bool {
    !route.is_empty() && route.bytes().all(|b| b.is_ascii_digit())
}

/// Returns true if the file name looks like one of our sockets, either the
/// manager socket (`osq-<id>.em`) or an extension route (`osq-<id>.em.<n>`).
fn is_socket_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(SOCKET_PREFIX) else {
        return false;
    };
    if rest.ends_with(SOCKET_SUFFIX) {
        return true;
    }
    rest.rsplit_once('.')
        .is_some_and(|(base, route)| base.ends_with(SOCKET_SUFFIX) && is_route_suffix(route))
}

/// Deletes sockets in `dir` last modified more than `max_age` ago.
///
/// Returns the number of files removed. A missing directory is not an error.
pub fn sweep_stale_sockets(dir: &Path, max_age: Duration) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("Could not scan socket directory {}: {e}", dir.display());
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_socket_name) {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if !age.is_some_and(|age| age > max_age) {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(
                "Could not remove stale socket {}: {e}",
                entry.path().display()
            ),
        }
    }

    if removed > 0 {
        info!("Removed {removed} stale extension socket(s) from {}", dir.display());
    }
    removed
}
