//! Integration tests for the inference invocation bridge, driven by stub
//! `/bin/sh` workers written to a tempdir.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use prognos::bridge::{BridgeError, InferenceBridge, WorkerCommand};
use prognos::catalog::SymptomId;
use prognos::decode::DecodeError;
use prognos::request::PredictionRequest;

/// Write an executable `/bin/sh` stub worker into `dir`.
fn stub_worker(dir: &TempDir, name: &str, script: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn bridge_for(worker: &Path) -> InferenceBridge {
    InferenceBridge::new(
        WorkerCommand::new(worker.display().to_string(), Vec::new()),
        Duration::from_secs(10),
        4,
    )
}

fn request(ids: &[&str]) -> PredictionRequest {
    PredictionRequest::new(ids.iter().map(|s| SymptomId::new(*s)).collect()).unwrap()
}

#[tokio::test]
async fn success_round_trip_with_exact_argument_encoding() {
    let dir = TempDir::new().unwrap();
    let arg_file = dir.path().join("arg.txt");
    let worker = stub_worker(
        &dir,
        "worker.sh",
        &format!(
            "printf '%s' \"$1\" > {}\necho '{{\"disease\":\"Flu\",\"confidence\":0.92}}'",
            arg_file.display()
        ),
    );

    let result = bridge_for(&worker)
        .invoke(&request(&["fever", "cough"]))
        .await
        .unwrap();

    assert_eq!(result.label, "Flu");
    assert_eq!(result.confidence, 0.92);
    // The worker receives exactly one trailing argument: the JSON array.
    let arg = std::fs::read_to_string(&arg_file).unwrap();
    assert_eq!(arg, r#"["fever","cough"]"#);
}

#[tokio::test]
async fn nonzero_exit_captures_stderr_and_discards_stdout() {
    let dir = TempDir::new().unwrap();
    let worker = stub_worker(
        &dir,
        "worker.sh",
        "echo 'untrustworthy stdout'\necho 'model error' >&2\nexit 1",
    );

    let err = bridge_for(&worker).invoke(&request(&["fever"])).await.unwrap_err();
    match err {
        BridgeError::WorkerFailed { status, stderr } => {
            assert_eq!(status.code(), Some(1));
            assert_eq!(stderr, "model error");
        }
        other => panic!("expected WorkerFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_stdout_is_a_decode_failure_with_raw_attached() {
    let dir = TempDir::new().unwrap();
    let worker = stub_worker(&dir, "worker.sh", "echo 'not json'");

    let err = bridge_for(&worker).invoke(&request(&["fever"])).await.unwrap_err();
    match err {
        BridgeError::Decode(DecodeError::NotJson { raw, .. }) => {
            assert_eq!(raw, "not json");
        }
        other => panic!("expected Decode(NotJson), got {other:?}"),
    }
}

#[tokio::test]
async fn nonexistent_program_is_a_launch_failure() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-worker");
    let bridge = bridge_for(&missing);

    let err = bridge.invoke(&request(&["fever"])).await.unwrap_err();
    match err {
        BridgeError::Launch { program, .. } => {
            assert!(program.contains("no-such-worker"));
        }
        other => panic!("expected Launch, got {other:?}"),
    }
}

/// Regression test for the concurrent-drain requirement: a worker that fills
/// its stderr pipe before touching stdout deadlocks a sequential reader once
/// the 64 KiB pipe buffer is full. Two invocations run at once, each writing
/// well past the buffer on both streams.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_chatty_streams_complete_without_truncation() {
    let dir = TempDir::new().unwrap();
    // 2000 lines x 65 bytes ≈ 127 KiB per stream, stderr written first.
    let line = "x".repeat(64);
    let worker = stub_worker(
        &dir,
        "worker.sh",
        &format!(
            "i=0\n\
             while [ $i -lt 2000 ]; do\n  printf '{line}\\n' >&2\n  i=$((i+1))\ndone\n\
             i=0\n\
             while [ $i -lt 2000 ]; do\n  printf '{line}\\n'\n  i=$((i+1))\ndone"
        ),
    );

    let bridge = std::sync::Arc::new(bridge_for(&worker));
    let expected = 2000 * 65;

    let run = |bridge: std::sync::Arc<InferenceBridge>| async move {
        match bridge.invoke(&request(&["fever"])).await.unwrap_err() {
            // Exit 0 with junk stdout: the complete capture shows up as the
            // decoder's raw text.
            BridgeError::Decode(DecodeError::NotJson { raw, .. }) => raw.len(),
            other => panic!("expected Decode(NotJson), got {other:?}"),
        }
    };

    let both = async { tokio::join!(run(bridge.clone()), run(bridge.clone())) };
    let (a, b) = tokio::time::timeout(Duration::from_secs(30), both)
        .await
        .expect("concurrent invocations deadlocked");

    // Full stdout captured (trailing newline trimmed by the decoder).
    assert_eq!(a, expected - 1);
    assert_eq!(b, expected - 1);
}

#[tokio::test]
async fn hung_worker_is_killed_on_timeout() {
    let dir = TempDir::new().unwrap();
    let worker = stub_worker(&dir, "worker.sh", "sleep 30");
    let bridge = InferenceBridge::new(
        WorkerCommand::new(worker.display().to_string(), Vec::new()),
        Duration::from_millis(300),
        1,
    );

    let started = Instant::now();
    let err = bridge.invoke(&request(&["fever"])).await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "timeout did not fire promptly"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn admission_overflow_fails_fast_without_spawning() {
    let dir = TempDir::new().unwrap();
    let slow = stub_worker(
        &dir,
        "slow.sh",
        "sleep 2\necho '{\"disease\":\"Flu\",\"confidence\":0.9}'",
    );
    let bridge = std::sync::Arc::new(InferenceBridge::new(
        WorkerCommand::new(slow.display().to_string(), Vec::new()),
        Duration::from_secs(10),
        1,
    ));

    let first = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.invoke(&request(&["fever"])).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Fails fast: no queueing behind the in-flight worker.
    let started = Instant::now();
    let err = bridge.invoke(&request(&["cough"])).await.unwrap_err();
    assert!(matches!(err, BridgeError::Overloaded));
    assert!(started.elapsed() < Duration::from_millis(500));

    let result = first.await.unwrap().unwrap();
    assert_eq!(result.label, "Flu");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_kills_the_worker_promptly() {
    let dir = TempDir::new().unwrap();
    let worker = stub_worker(&dir, "worker.sh", "sleep 30");
    let bridge = std::sync::Arc::new(bridge_for(&worker));
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);

    let invocation = {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            bridge
                .invoke_cancellable(&request(&["fever"]), cancel_rx)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    let started = Instant::now();
    cancel_tx.send(true).unwrap();

    let err = invocation.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancellation did not take effect promptly"
    );
}
