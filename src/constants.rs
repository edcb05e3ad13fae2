//! Global constants for nodewatch
//!
//! Centralized location for application-wide constants

/// Application identifier, used for the unit name and log target
pub const APP_NAME: &str = "nodewatch";

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nodewatch/nodewatch.toml";

/// Default IPC socket for status queries against a running daemon
pub const DEFAULT_SOCKET_PATH: &str = "/run/nodewatch/nodewatch.sock";

/// Default systemd unit file name produced by `nodewatch unit-file`
pub const UNIT_FILE_NAME: &str = "nodewatch.service";

/// Tick interval bounds in seconds.
/// Note: bounds must match ConfigError::InvalidTickInterval message
pub const TICK_INTERVAL_MIN: f64 = 1.0;
pub const TICK_INTERVAL_MAX: f64 = 86_400.0;

/// Per-check timeout bounds in seconds
pub const CHECK_TIMEOUT_MAX: f64 = 60.0;

pub const DEFAULT_TICK_INTERVAL: f64 = 30.0;
pub const DEFAULT_CHECK_TIMEOUT: f64 = 2.0;
pub const DEFAULT_RESTART_TIMEOUT: f64 = 30.0;
pub const DEFAULT_SEND_TIMEOUT: f64 = 10.0;

pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";
/// Mail submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SYSTEMCTL_PATH: &str = "systemctl";
pub const DEFAULT_DOCKER_PATH: &str = "docker";

/// Terminates every alert line in a digest
pub const ALERT_LINE_SEPARATOR: &str = "\r\n";

/// Appended to the host label to form the digest subject
pub const ALERT_SUBJECT_SUFFIX: &str = "warning";

/// Fixed identifiers for the host-wide threshold targets
pub const MEMORY_IDENTIFIER: &str = "memory";
pub const CPU_IDENTIFIER: &str = "cpu";
