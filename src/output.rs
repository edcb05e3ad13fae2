//! Output formatting module
//!
//! Renders status snapshots for the `status` and `check` commands:
//! - human-readable table-like text
//! - JSON for scripting

use crate::models::{ResourceState, StatusSnapshot};
use anyhow::Result;
use std::fmt::Write;

/// Format a snapshot as JSON
pub fn format_status_json(snapshot: &StatusSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

fn warning_marker(warning: bool) -> &'static str {
    if warning {
        "WARN"
    } else {
        "ok"
    }
}

fn write_resource(out: &mut String, label: &str, state: &ResourceState) {
    let _ = write!(
        out,
        "  [{:<4}] {:<24} {:>7} (limit {:.1}%)",
        warning_marker(state.warning),
        label,
        format_ratio(state.value),
        state.limit * 100.0
    );
    if let Some(ref detail) = state.detail {
        let _ = write!(out, " - {}", detail);
    }
    out.push('\n');
}

/// Format a snapshot as human-readable text
pub fn format_status_human(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Host: {}", snapshot.host);
    match snapshot.updated_at {
        Some(ref at) => {
            let _ = writeln!(out, "Ticks: {} (last at {})", snapshot.ticks, at);
        }
        None => {
            let _ = writeln!(out, "Ticks: {} (no pass completed yet)", snapshot.ticks);
        }
    }
    out.push('\n');

    if !snapshot.processes.is_empty() {
        out.push_str("Processes:\n");
        for process in &snapshot.processes {
            let _ = write!(
                out,
                "  [{:<4}] {:<24} {:<10} ({})",
                warning_marker(process.warning),
                process.identifier,
                process.status,
                process.kind
            );
            if let Some(ref detail) = process.detail {
                let _ = write!(out, " - {}", detail);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("Resources:\n");
    if let Some(ref memory) = snapshot.memory {
        write_resource(&mut out, "memory", memory);
    }
    if let Some(ref cpu) = snapshot.cpu {
        write_resource(&mut out, "cpu", cpu);
    }
    for fs in &snapshot.filesystems {
        write_resource(&mut out, &fs.identifier, fs);
    }

    let warnings = snapshot.warning_count();
    out.push('\n');
    if warnings == 0 {
        out.push_str("All targets healthy\n");
    } else {
        let _ = writeln!(out, "{} target(s) in warning state", warnings);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProbeKind, ProcessState, TargetStatus};

    fn sample() -> StatusSnapshot {
        StatusSnapshot {
            host: "node-1".to_string(),
            ticks: 3,
            updated_at: Some("2026-01-01T00:00:00+00:00".to_string()),
            processes: vec![ProcessState {
                identifier: "worker".to_string(),
                kind: ProbeKind::Container,
                status: TargetStatus::Unknown,
                warning: true,
                detail: Some("no container found for image worker".to_string()),
            }],
            memory: Some(ResourceState {
                identifier: "memory".to_string(),
                limit: 0.9,
                value: Some(0.5),
                warning: false,
                detail: None,
            }),
            cpu: None,
            filesystems: vec![],
        }
    }

    #[test]
    fn test_human_output() {
        let text = format_status_human(&sample());
        assert!(text.contains("Host: node-1"));
        assert!(text.contains("worker"));
        assert!(text.contains("Unknown"));
        assert!(text.contains("no container found for image worker"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("1 target(s) in warning state"));
    }

    #[test]
    fn test_human_output_before_first_tick() {
        let text = format_status_human(&StatusSnapshot::default());
        assert!(text.contains("no pass completed yet"));
        assert!(text.contains("All targets healthy"));
    }

    #[test]
    fn test_json_output_parses_back() {
        let json = format_status_json(&sample()).unwrap();
        let parsed: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}
