//! Command-line contract tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn nodewatch() -> Command {
    Command::cargo_bin("nodewatch").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    nodewatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("unit-file"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn test_version_reports_package_version() {
    nodewatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodewatch"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_subcommand_fails() {
    nodewatch().assert().failure();
}

#[test]
fn test_missing_config_is_fatal() {
    nodewatch()
        .args(["check", "--config", "/nonexistent/nodewatch.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[monitor]\ntick_interval = 0\n").unwrap();

    nodewatch()
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tick interval"));
}

#[test]
fn test_unit_file_to_stdout() {
    nodewatch()
        .args([
            "unit-file",
            "--binary",
            "/usr/local/bin/nodewatch",
            "--config",
            "/etc/nodewatch/custom.toml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Service]"))
        .stdout(predicate::str::contains(
            "ExecStart=/usr/local/bin/nodewatch run --config /etc/nodewatch/custom.toml",
        ));
}

#[test]
fn test_unit_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("nodewatch.service");

    nodewatch()
        .args(["unit-file", "--binary", "/bin/nodewatch", "--output"])
        .arg(&output)
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("WantedBy=multi-user.target"));
}

#[test]
fn test_check_reports_root_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nodewatch.toml");
    fs::write(
        &config,
        r#"
[monitor]
host = "test-host"

[mail]
transport = "log"

[memory]
limit = 1.0

[cpu]
limit = 1.0

[[filesystems]]
path = "/"
limit = 1.0
"#,
    )
    .unwrap();

    // Exit code depends on the load of the machine running the test
    nodewatch()
        .args(["check", "--json", "--config"])
        .arg(&config)
        .assert()
        .code(predicate::in_iter([0, 1]))
        .stdout(predicate::str::contains("\"host\": \"test-host\""))
        .stdout(predicate::str::contains("\"identifier\": \"/\""));
}

#[test]
fn test_check_failing_command_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nodewatch.toml");
    fs::write(
        &config,
        r#"
[monitor]
host = "test-host"

[mail]
transport = "log"

[[processes]]
kind = "command"
name = "always-down"
check_command = "exit 1"
"#,
    )
    .unwrap();

    nodewatch()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("alert: always-down Check Failed"));
}

#[test]
fn test_status_without_daemon_fails() {
    let dir = tempfile::tempdir().unwrap();
    nodewatch()
        .args(["status", "--socket"])
        .arg(dir.path().join("absent.sock"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect to daemon socket"));
}
