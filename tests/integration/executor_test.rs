//! Process executor tests against real children.

use std::sync::Arc;
use std::time::{Duration, Instant};

use osq_glance::error::OsqError;
use osq_glance::process::{ProcessExecutor, ProcessInvocation, ProcessRunner};

fn sh(script: &str, timeout: Duration) -> ProcessInvocation {
    ProcessInvocation::new("/bin/sh", vec!["-c".to_string(), script.to_string()], timeout)
}

/// Polls until the executor has a child in flight.
async fn wait_until_running(executor: &ProcessExecutor) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !executor.is_running() {
        assert!(Instant::now() < deadline, "child never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_captures_both_streams() {
    let executor = ProcessExecutor::new();
    let outcome = executor
        .run(sh("echo out; echo err >&2; exit 3", Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(outcome.stdout_lossy(), "out\n");
    assert_eq!(outcome.stderr_lossy(), "err\n");
    assert_eq!(outcome.exit_code, 3);
    assert!(!executor.is_running());
}

#[tokio::test]
async fn test_cancel_stops_long_running_child() {
    let executor = Arc::new(ProcessExecutor::new());
    let start = Instant::now();

    let running = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .run(sh("exec sleep 30", Duration::from_secs(60)))
                .await
        })
    };
    wait_until_running(&executor).await;
    executor.cancel();

    let result = running.await.unwrap();
    assert_eq!(result.unwrap_err(), OsqError::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(!executor.is_running());
}

#[tokio::test]
async fn test_cancel_racing_completion_has_one_outcome() {
    for delay_ms in 0..20 {
        let executor = Arc::new(ProcessExecutor::new());
        let running = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.run(sh("echo done", Duration::from_secs(5))).await })
        };
        tokio::time::sleep(Duration::from_millis(delay_ms % 5)).await;
        executor.cancel();

        match running.await.unwrap() {
            Ok(outcome) => assert_eq!(outcome.stdout_lossy(), "done\n"),
            Err(OsqError::Cancelled) => {}
            Err(other) => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_timeout_kills_child() {
    let executor = ProcessExecutor::new();
    let start = Instant::now();

    let err = executor
        .run(sh("echo partial; sleep 30", Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert_eq!(err, OsqError::Timeout(Duration::from_millis(300)));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_concurrent_runs_queue() {
    let executor = Arc::new(ProcessExecutor::new());
    let start = Instant::now();

    let first = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .run(sh("sleep 0.3; echo first", Duration::from_secs(5)))
                .await
        })
    };
    let second = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .run(sh("sleep 0.3; echo second", Duration::from_secs(5)))
                .await
        })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.stdout_lossy(), "first\n");
    assert_eq!(second.stdout_lossy(), "second\n");
    assert!(start.elapsed() >= Duration::from_millis(550));
}

#[tokio::test]
async fn test_signal_death_reports_minus_one() {
    let executor = ProcessExecutor::new();
    let outcome = executor
        .run(sh("kill -9 $$", Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, -1);
}
