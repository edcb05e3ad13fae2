//! Configuration management for daemon mode
//!
//! Handles TOML configuration parsing and validation. The configuration is
//! loaded once at startup; any error here is fatal before the loop starts.

use crate::constants::{
    CHECK_TIMEOUT_MAX, DEFAULT_CHECK_TIMEOUT, DEFAULT_CONFIG_PATH, DEFAULT_RESTART_TIMEOUT,
    DEFAULT_SENDMAIL_PATH, DEFAULT_SEND_TIMEOUT, DEFAULT_SMTP_PORT, DEFAULT_SOCKET_PATH,
    DEFAULT_TICK_INTERVAL,
    TICK_INTERVAL_MAX, TICK_INTERVAL_MIN,
};
use crate::models::{ConfigError, ProbeKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main daemon configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfiguration {
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub mail: MailSettings,
    /// Process targets, evaluated in file order
    #[serde(default)]
    pub processes: Vec<ProcessSettings>,
    #[serde(default = "ThresholdSettings::memory_default")]
    pub memory: ThresholdSettings,
    #[serde(default = "ThresholdSettings::cpu_default")]
    pub cpu: ThresholdSettings,
    /// Filesystem targets, evaluated in file order
    #[serde(default)]
    pub filesystems: Vec<FilesystemSettings>,
}

impl Default for MonitorConfiguration {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings::default(),
            mail: MailSettings::default(),
            processes: Vec::new(),
            memory: ThresholdSettings::memory_default(),
            cpu: ThresholdSettings::cpu_default(),
            filesystems: Vec::new(),
        }
    }
}

/// Core loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSettings {
    /// Label used in the alert subject; defaults to the machine hostname
    pub host: Option<String>,
    /// Seconds between evaluation passes (1-86400)
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,
    /// Digest recipients; empty means digests are dropped by the transport
    #[serde(default)]
    pub alert_recipients: Vec<String>,
    /// Upper bound for a single process check, in seconds
    #[serde(default = "default_check_timeout")]
    pub check_timeout: f64,
    /// Upper bound for a detached restart, in seconds
    #[serde(default = "default_restart_timeout")]
    pub restart_timeout: f64,
    /// Unix socket serving status snapshots
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            host: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            alert_recipients: Vec::new(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            restart_timeout: DEFAULT_RESTART_TIMEOUT,
            socket_path: default_socket_path(),
        }
    }
}

/// Which mail transport delivers digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    /// Pipe the message to a local sendmail-compatible binary
    #[default]
    Sendmail,
    /// Submit over SMTP with STARTTLS, optionally authenticated
    Smtp,
    /// Only write digests to the log
    Log,
}

/// Mail delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailSettings {
    #[serde(default)]
    pub transport: MailTransportKind,
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: PathBuf,
    /// Sender address; sendmail picks its own default when absent, SMTP
    /// falls back to the username
    pub from: Option<String>,
    #[serde(default = "default_send_timeout")]
    pub send_timeout: f64,
    /// SMTP relay host
    pub server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MailSettings {
    /// Sender used for SMTP submission
    pub fn smtp_from(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }

    /// Login pair, when both halves are configured
    pub fn smtp_credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransportKind::default(),
            sendmail_path: default_sendmail_path(),
            from: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            server: None,
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
        }
    }
}

/// One process target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSettings {
    pub kind: ProbeKind,
    /// Unit name, container image reference, or a label for command probes
    pub name: String,
    /// Shell command whose exit status is the health signal (command kind)
    pub check_command: Option<String>,
    /// Shell command run to remediate a failed command probe
    pub restart_command: Option<String>,
}

/// Threshold for a host-wide resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSettings {
    /// Usage fraction in [0, 1] at or above which the resource is bad
    pub limit: f64,
}

impl ThresholdSettings {
    fn memory_default() -> Self {
        Self { limit: 0.90 }
    }

    fn cpu_default() -> Self {
        Self { limit: 0.95 }
    }
}

/// Threshold for one filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemSettings {
    /// Mount point to check
    pub path: PathBuf,
    pub limit: f64,
}

fn default_tick_interval() -> f64 {
    DEFAULT_TICK_INTERVAL
}

fn default_check_timeout() -> f64 {
    DEFAULT_CHECK_TIMEOUT
}

fn default_restart_timeout() -> f64 {
    DEFAULT_RESTART_TIMEOUT
}

fn default_send_timeout() -> f64 {
    DEFAULT_SEND_TIMEOUT
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_sendmail_path() -> PathBuf {
    PathBuf::from(DEFAULT_SENDMAIL_PATH)
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl MonitorConfiguration {
    /// Default configuration file location
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check bounds and internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tick = self.monitor.tick_interval;
        if !(TICK_INTERVAL_MIN..=TICK_INTERVAL_MAX).contains(&tick) {
            return Err(ConfigError::InvalidTickInterval(tick));
        }

        validate_timeout("check_timeout", self.monitor.check_timeout, CHECK_TIMEOUT_MAX)?;
        validate_timeout("restart_timeout", self.monitor.restart_timeout, TICK_INTERVAL_MAX)?;
        validate_timeout("send_timeout", self.mail.send_timeout, TICK_INTERVAL_MAX)?;

        if self.mail.transport == MailTransportKind::Smtp {
            if self.mail.server.as_deref().map_or(true, |s| s.trim().is_empty()) {
                return Err(ConfigError::MissingSmtpSetting("server"));
            }
            if self.mail.username.is_some() != self.mail.password.is_some() {
                return Err(ConfigError::IncompleteSmtpCredentials);
            }
            if self.mail.smtp_from().is_none() {
                return Err(ConfigError::MissingSmtpSetting("from or username"));
            }
        }

        validate_limit("memory", self.memory.limit)?;
        validate_limit("cpu", self.cpu.limit)?;

        let mut seen = HashSet::new();
        for (index, process) in self.processes.iter().enumerate() {
            if process.name.trim().is_empty() {
                return Err(ConfigError::EmptyProcessName { index });
            }
            if process.kind == ProbeKind::Command && process.check_command.is_none() {
                return Err(ConfigError::MissingCheckCommand {
                    name: process.name.clone(),
                });
            }
            let key = format!("{}:{}", process.kind, process.name);
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateTarget(key));
            }
        }

        for (index, fs) in self.filesystems.iter().enumerate() {
            if fs.path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyFilesystemPath { index });
            }
            let key = fs.path.display().to_string();
            validate_limit(&key, fs.limit)?;
            if !seen.insert(format!("fs:{}", key)) {
                return Err(ConfigError::DuplicateTarget(key));
            }
        }

        Ok(())
    }

    /// Host label, falling back to the machine hostname
    pub fn resolved_host(&self) -> String {
        if let Some(host) = self.monitor.host.as_ref().filter(|h| !h.trim().is_empty()) {
            return host.clone();
        }
        nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.monitor.tick_interval)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.monitor.check_timeout)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.monitor.restart_timeout)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.mail.send_timeout)
    }
}

fn validate_timeout(field: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout { field, value, max })
    }
}

fn validate_limit(target: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLimit {
            target: target.to_string(),
            value,
        })
    }
}
