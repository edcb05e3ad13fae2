//! Data models module
//!
//! Defines core data structures:
//! - TargetStatus / ProbeKind: normalized result of a process health check
//! - FilesystemUsage: point-in-time capacity figures for one mount
//! - ContainerSummary: one entry reported by the container runtime
//! - StatusSnapshot: read-only export of per-target state for status queries
//! - Error enums for resource reads, probes, notifications and configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Normalized status of a monitored process target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    Running,
    NotRunning,
    Unknown,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Running => "Running",
            TargetStatus::NotRunning => "NotRunning",
            TargetStatus::Unknown => "Unknown",
        }
    }

    /// Anything other than Running counts against the warning flag
    pub fn is_bad(&self) -> bool {
        !matches!(self, TargetStatus::Running)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a process target is managed on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// A unit managed by systemd, checked through its SubState
    Systemd,
    /// A container, located by the image it was started from
    Container,
    /// An arbitrary shell command whose exit status is the health signal
    Command,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Systemd => "systemd",
            ProbeKind::Container => "container",
            ProbeKind::Command => "command",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One container as reported by the container runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    /// Machine-readable state (e.g. "running", "exited")
    pub state: String,
    /// Human-readable status line (e.g. "Up 3 hours")
    pub status: String,
}

/// Capacity figures for one filesystem, in bytes and inodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemUsage {
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub avail_bytes: u64,
    pub inodes: u64,
    pub inodes_free: u64,
}

impl FilesystemUsage {
    /// Usage ratio as seen by unprivileged writers: `1 - avail/size`.
    ///
    /// Reserved blocks make this larger than `used/size`; alerting must use
    /// this figure. A zero-sized filesystem reports 0.
    pub fn usage_ratio(&self) -> f64 {
        if self.size_bytes == 0 {
            return 0.0;
        }
        1.0 - self.avail_bytes as f64 / self.size_bytes as f64
    }
}

/// State of one process target, as exported to status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub identifier: String,
    pub kind: ProbeKind,
    pub status: TargetStatus,
    pub warning: bool,
    /// Error text from the last check, when it failed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

/// State of one threshold target (memory, cpu or a filesystem path)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub identifier: String,
    pub limit: f64,
    /// Last observed usage ratio; absent before the first tick or after a failed read
    pub value: Option<f64>,
    pub warning: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

/// Read-only snapshot of all target state after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatusSnapshot {
    pub host: String,
    /// Number of completed evaluation passes
    pub ticks: u64,
    /// RFC 3339 timestamp of the last completed pass
    pub updated_at: Option<String>,
    pub processes: Vec<ProcessState>,
    pub memory: Option<ResourceState>,
    pub cpu: Option<ResourceState>,
    pub filesystems: Vec<ResourceState>,
}

impl StatusSnapshot {
    /// Number of targets currently holding a warning
    pub fn warning_count(&self) -> usize {
        let processes = self.processes.iter().filter(|p| p.warning).count();
        let resources = self
            .memory
            .iter()
            .chain(self.cpu.iter())
            .chain(self.filesystems.iter())
            .filter(|r| r.warning)
            .count();
        processes + resources
    }
}

/// Errors from reading host counters
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{resource} unavailable: {detail}")]
    Unavailable { resource: String, detail: String },

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("reader task failed: {0}")]
    Task(String),

    #[error("{path} is not a mount point")]
    NotMounted { path: String },

    #[error("statvfs({path}) failed: {source}")]
    Statvfs { path: String, source: nix::Error },
}

/// Errors from a health probe or its backend
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unexpected output from {program}: {detail}")]
    BadOutput { program: String, detail: String },

    #[error("no container found for image {image}")]
    NoContainer { image: String },

    #[error("{count} containers match image {image}")]
    AmbiguousImage { image: String, count: usize },

    #[error("check timed out after {0:?}")]
    Timeout(Duration),

    #[error("restart is not supported for {kind} targets")]
    RestartUnsupported { kind: ProbeKind },
}

/// Errors from the mail transport
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {stderr}")]
    Rejected {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to write message to {program}: {source}")]
    Write {
        program: String,
        source: std::io::Error,
    },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid mail address '{address}': {detail}")]
    InvalidAddress { address: String, detail: String },

    #[error("failed to build message: {0}")]
    InvalidMessage(String),

    #[error("SMTP delivery via {server} failed: {detail}")]
    Smtp { server: String, detail: String },
}

/// Configuration validation errors, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Note: bounds must match TICK_INTERVAL_MIN/MAX in constants.rs
    #[error("Invalid tick interval: {0}. Must be between 1 and 86400 seconds")]
    InvalidTickInterval(f64),

    #[error("Invalid {field}: {value}. Must be greater than 0 and at most {max} seconds")]
    InvalidTimeout { field: &'static str, value: f64, max: f64 },

    #[error("Invalid limit for {target}: {value}. Must be between 0.0 and 1.0")]
    InvalidLimit { target: String, value: f64 },

    #[error("process #{index} has an empty name")]
    EmptyProcessName { index: usize },

    #[error("process {name} of kind command requires check_command")]
    MissingCheckCommand { name: String },

    #[error("filesystem #{index} has an empty path")]
    EmptyFilesystemPath { index: usize },

    #[error("duplicate target {0}")]
    DuplicateTarget(String),

    #[error("mail transport smtp requires {0}")]
    MissingSmtpSetting(&'static str),

    #[error("SMTP username and password must be set together")]
    IncompleteSmtpCredentials,
}
