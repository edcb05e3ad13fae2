//! Alert line wording
//!
//! Lines are plain text without the record separator; the digest appends it.

use crate::models::{ProbeKind, TargetStatus};
use std::path::Path;

/// Line for a process target that turned bad.
///
/// `Unknown` is worded differently from "not running" so a broken probe
/// is distinguishable from a stopped service.
pub fn process_line(kind: ProbeKind, name: &str, status: TargetStatus, error: Option<&str>) -> String {
    match status {
        TargetStatus::Unknown => {
            format!("{} Status Unknown: {}", name, error.unwrap_or("no result"))
        }
        _ => match kind {
            ProbeKind::Systemd => format!("{name} Not Running"),
            ProbeKind::Container => format!("Container {name} Not Running"),
            ProbeKind::Command => format!("{name} Check Failed"),
        },
    }
}

pub fn memory_exceeded(value: f64, limit: f64) -> String {
    format!("MemoryUsage Exceed {value:.2} >= {limit:.2}")
}

pub fn memory_unknown(error: &str) -> String {
    format!("MemoryUsage Unknown: {error}")
}

pub fn cpu_exceeded(value: f64, limit: f64) -> String {
    format!("CpuUsage Exceed {value:.2} >= {limit:.2}")
}

pub fn cpu_unknown(error: &str) -> String {
    format!("CpuUsage Unknown: {error}")
}

pub fn filesystem_exceeded(path: &Path, value: f64, limit: f64) -> String {
    format!("Path {} Usage Exceed {value:.2} >= {limit:.2}", path.display())
}

pub fn filesystem_unknown(path: &Path, error: &str) -> String {
    format!("Path {} Usage Unknown: {error}", path.display())
}
