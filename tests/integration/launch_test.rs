//! Argument policy tests: how each call decides to launch osquery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use osq_glance::process::MockProcessRunner;
use pretty_assertions::assert_eq;
use tokio::task::JoinSet;

use super::common::{arg_after, TestEnv};

#[tokio::test]
async fn test_extension_call_is_isolated_and_arch_forced() {
    let env = TestEnv::with_extension();
    let runner = Arc::new(MockProcessRunner::default());
    let service = env.service(runner.clone());

    service.execute("SELECT * FROM mdm").await.unwrap();

    let invocation = runner.invocations().remove(0);
    assert_eq!(invocation.executable(), Path::new("/usr/bin/arch"));

    let args = invocation.args();
    let socket = arg_after(args, "--extensions_socket").unwrap().to_string();
    let extension = env.config.extension.as_ref().unwrap().display().to_string();
    let expected: Vec<String> = [
        "-arm64",
        "/opt/osquery/bin/osqueryi",
        "--extensions_socket",
        socket.as_str(),
        "--extension",
        extension.as_str(),
        "--extensions_require",
        "macadmins_extension",
        "--extensions_timeout",
        "10",
        "--disable_database",
        "--allow_unsafe",
        "--json",
        "SELECT * FROM mdm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(args, expected.as_slice());

    let socket = PathBuf::from(socket);
    assert_eq!(socket.parent(), Some(env.config.socket_dir.as_path()));
    assert!(!socket.exists());
}

#[tokio::test]
async fn test_daemon_call_connects_to_socket() {
    let env = TestEnv::with_daemon();
    let runner = Arc::new(MockProcessRunner::default());
    let service = env.service(runner.clone());

    service.execute("SELECT * FROM system_info").await.unwrap();

    let invocation = runner.invocations().remove(0);
    assert_eq!(invocation.executable(), Path::new("/opt/osquery/bin/osqueryi"));
    let daemon = env.config.daemon_socket.display().to_string();
    assert_eq!(
        invocation.args(),
        [
            "--connect".to_string(),
            daemon,
            "--json".to_string(),
            "SELECT * FROM system_info".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_standalone_call_has_no_socket_flags() {
    let env = TestEnv::standalone();
    let runner = Arc::new(MockProcessRunner::default());
    let service = env.service(runner.clone());

    service.execute("SELECT * FROM uptime").await.unwrap();

    let invocation = runner.invocations().remove(0);
    assert_eq!(invocation.executable(), Path::new("/opt/osquery/bin/osqueryi"));
    assert_eq!(
        invocation.args(),
        ["--json".to_string(), "SELECT * FROM uptime".to_string()]
    );
    assert_eq!(invocation.timeout(), env.config.query_timeout());
}

#[tokio::test]
async fn test_extension_wins_over_daemon() {
    let mut env = TestEnv::with_extension();
    std::fs::write(&env.config.daemon_socket, b"").unwrap();
    env.config.force_arch = "x86_64".to_string();
    let runner = Arc::new(MockProcessRunner::default());
    let service = env.service(runner.clone());

    service.execute("SELECT * FROM mdm").await.unwrap();

    let args = runner.invocations()[0].args().to_vec();
    assert_eq!(args[0], "-x86_64");
    assert!(args.iter().any(|a| a == "--extensions_socket"));
    assert!(!args.iter().any(|a| a == "--connect"));
}

#[tokio::test]
async fn test_meta_commands_skip_extension_and_json() {
    let env = TestEnv::with_extension();
    std::fs::write(&env.config.daemon_socket, b"").unwrap();
    let runner = Arc::new(MockProcessRunner::with_stdout("  => users\n"));
    let service = env.service(runner.clone());

    service.list_tables().await.unwrap();

    let invocation = runner.invocations().remove(0);
    assert_eq!(invocation.executable(), Path::new("/opt/osquery/bin/osqueryi"));
    assert_eq!(invocation.timeout(), env.config.meta_timeout());
    let daemon = env.config.daemon_socket.display().to_string();
    assert_eq!(
        invocation.args(),
        ["--connect".to_string(), daemon, ".tables".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_extension_calls_get_unique_sockets() {
    let env = TestEnv::with_extension();
    let runner = Arc::new(MockProcessRunner::default());
    let service = Arc::new(env.service(runner.clone()));

    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let service = Arc::clone(&service);
        tasks.spawn(async move { service.execute(&format!("SELECT {i}")).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let sockets: HashSet<String> = runner
        .invocations()
        .iter()
        .filter_map(|inv| arg_after(inv.args(), "--extensions_socket").map(str::to_string))
        .collect();
    assert_eq!(runner.invocation_count(), 32);
    assert_eq!(sockets.len(), 32);
}

#[tokio::test]
async fn test_stale_sockets_swept_at_construction() {
    let mut env = TestEnv::standalone();
    env.config.stale_socket_age_secs = 0;
    std::fs::create_dir_all(&env.config.socket_dir).unwrap();
    let stale = env.config.socket_dir.join("osq-0000.em");
    let unrelated = env.config.socket_dir.join("keep.txt");
    std::fs::write(&stale, b"").unwrap();
    std::fs::write(&unrelated, b"").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    let _service = env.service(Arc::new(MockProcessRunner::default()));

    assert!(!stale.exists());
    assert!(unrelated.exists());
}
