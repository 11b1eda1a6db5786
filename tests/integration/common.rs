//! Shared fixtures for the integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use osq_glance::config::OsqueryConfig;
use osq_glance::process::MockProcessRunner;
use osq_glance::QueryService;
use tempfile::TempDir;

/// A sandbox that keeps host sockets and extensions out of the way.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: OsqueryConfig,
}

impl TestEnv {
    /// No extension, no daemon: every call is a standalone invocation.
    pub fn standalone() -> Self {
        let dir = TempDir::new().unwrap();
        let config = OsqueryConfig {
            binary: Some(PathBuf::from("/opt/osquery/bin/osqueryi")),
            extension: Some(dir.path().join("missing.ext")),
            extension_enabled: false,
            daemon_socket: dir.path().join("no-daemon.em"),
            socket_dir: dir.path().join("sockets"),
            ..OsqueryConfig::default()
        };
        Self { dir, config }
    }

    /// An extension file exists on disk and is enabled.
    pub fn with_extension() -> Self {
        let mut env = Self::standalone();
        let extension = env.dir.path().join("macadmins_extension.ext");
        fs::write(&extension, b"").unwrap();
        env.config.extension = Some(extension);
        env.config.extension_enabled = true;
        env
    }

    /// A daemon socket file exists.
    pub fn with_daemon() -> Self {
        let env = Self::standalone();
        fs::write(&env.config.daemon_socket, b"").unwrap();
        env
    }

    pub fn service(&self, runner: Arc<MockProcessRunner>) -> QueryService {
        QueryService::new(runner, self.config.clone())
    }
}

/// Returns the value following `flag` in an argument list.
pub fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
