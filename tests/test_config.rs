//! Configuration file loading

use nodewatch::daemon::config::{MailTransportKind, MonitorConfiguration};
use nodewatch::models::ProbeKind;
use std::fs;
use std::time::Duration;

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodewatch.toml");
    fs::write(
        &path,
        r#"
[monitor]
host = "edge-7"
tick_interval = 60
alert_recipients = ["ops@example.com"]
restart_timeout = 45

[mail]
transport = "sendmail"
sendmail_path = "/usr/lib/sendmail"
from = "nodewatch@edge-7"
send_timeout = 5

[[processes]]
kind = "systemd"
name = "nginx.service"

[[processes]]
kind = "container"
name = "ghcr.io/acme/worker:2"

[[filesystems]]
path = "/"
limit = 0.9
"#,
    )
    .unwrap();

    let config = MonitorConfiguration::load_from_file(&path).unwrap();
    assert_eq!(config.resolved_host(), "edge-7");
    assert_eq!(config.tick_duration(), Duration::from_secs(60));
    assert_eq!(config.restart_timeout(), Duration::from_secs(45));
    assert_eq!(config.send_timeout(), Duration::from_secs(5));
    assert_eq!(config.mail.transport, MailTransportKind::Sendmail);
    assert_eq!(config.mail.from.as_deref(), Some("nodewatch@edge-7"));
    let kinds: Vec<ProbeKind> = config.processes.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![ProbeKind::Systemd, ProbeKind::Container]);
}

#[test]
fn test_invalid_file_names_path_in_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[[filesystems]]\npath = \"/\"\nlimit = 2\n").unwrap();

    let err = MonitorConfiguration::load_from_file(&path).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("broken.toml"));
    assert!(message.contains("Invalid limit for /"));
}

#[test]
fn test_unknown_probe_kind_rejected() {
    let err = MonitorConfiguration::from_toml_str("[[processes]]\nkind = \"k8s\"\nname = \"x\"\n")
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse TOML"));
}
