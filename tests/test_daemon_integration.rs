//! Runs the daemon binary and talks to it over its socket

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

fn wait_for(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    None
}

#[test]
fn test_daemon_serves_status_and_stops_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("nodewatch.sock");
    let config = dir.path().join("nodewatch.toml");
    fs::write(
        &config,
        format!(
            r#"
[monitor]
host = "daemon-test"
tick_interval = 1
socket_path = "{}"

[mail]
transport = "log"

[[processes]]
kind = "command"
name = "marker"
check_command = "true"
"#,
            socket.display()
        ),
    )
    .unwrap();

    let mut daemon = std::process::Command::cargo_bin("nodewatch")
        .unwrap()
        .args(["run", "--config"])
        .arg(&config)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    if !wait_for(&socket, Duration::from_secs(10)) {
        let _ = daemon.kill();
        panic!("daemon did not create its socket");
    }

    Command::cargo_bin("nodewatch")
        .unwrap()
        .args(["status", "--json", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"host\": \"daemon-test\""))
        .stdout(predicate::str::contains("\"identifier\": \"marker\""));

    // A second daemon must not take over the live socket
    Command::cargo_bin("nodewatch")
        .unwrap()
        .args(["run", "--config"])
        .arg(&config)
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("already running"));
    assert!(socket.exists());

    Command::cargo_bin("nodewatch")
        .unwrap()
        .args(["stop", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Shutdown requested"));

    let status = wait_for_exit(&mut daemon, Duration::from_secs(10));
    if status.is_none() {
        let _ = daemon.kill();
    }
    assert!(status.map(|s| s.success()).unwrap_or(false), "daemon did not exit cleanly");
    assert!(!socket.exists(), "socket should be removed on shutdown");
}
