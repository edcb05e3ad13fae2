//! Structured logging for daemon lifecycle events
//!
//! Events go through the `log` facade (backed by env_logger) as a short
//! message followed by a JSON payload, so they stay greppable in the
//! journal and parseable by log shippers.

use crate::notify::DeliveryOutcome;
use anyhow::{Context, Result};
use log::Level;
use serde_json::json;
use std::time::Duration;

/// Install env_logger as the `log` backend.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_logging(default_level: &str) -> Result<()> {
    let level: log::LevelFilter = default_level
        .parse()
        .with_context(|| format!("Invalid log level: {default_level}"))?;
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp_millis()
        .try_init()
        .context("Failed to set logger")?;
    Ok(())
}

/// Daemon event logger; filtering is left to the `log` backend
#[derive(Debug, Clone, Copy, Default)]
pub struct DaemonLogger;

impl DaemonLogger {
    /// Log daemon startup event
    pub fn log_startup(&self, config_path: &std::path::Path, host: &str, pid: u32) {
        let message = json!({
            "event": "daemon_startup",
            "pid": pid,
            "host": host,
            "config_path": config_path.display().to_string(),
            "version": env!("NODEWATCH_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Info, "Daemon started", &message)
    }

    /// Log daemon shutdown event
    pub fn log_shutdown(&self, reason: &str) {
        let message = json!({
            "event": "daemon_shutdown",
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Info, "Daemon shutting down", &message)
    }

    /// Log the summary of one evaluation pass
    pub fn log_tick(
        &self,
        tick: u64,
        alert_lines: &[String],
        restarts: usize,
        delivery: &DeliveryOutcome,
        elapsed: Duration,
    ) {
        let digest = match delivery {
            DeliveryOutcome::Skipped => "skipped".to_string(),
            DeliveryOutcome::Sent => "sent".to_string(),
            DeliveryOutcome::Failed(reason) => format!("failed: {reason}"),
        };
        let message = json!({
            "event": "tick",
            "tick": tick,
            "alerts": alert_lines,
            "restarts": restarts,
            "digest": digest,
            "elapsed_ms": elapsed.as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(
            Level::Info,
            &format!("Tick {} finished with {} alert(s)", tick, alert_lines.len()),
            &message,
        )
    }

    /// Log error events
    pub fn log_error(&self, error_message: &str, context: Option<&str>) {
        let message = json!({
            "event": "error",
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Error, error_message, &message)
    }

    fn log_structured(&self, level: Level, message: &str, data: &serde_json::Value) {
        log::log!(level, "{} | {}", message, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        assert!(init_logging("chatty").is_err());
    }

    #[test]
    fn test_events_do_not_panic_without_backend() {
        let logger = DaemonLogger::default();
        logger.log_startup(std::path::Path::new("/etc/nodewatch/nodewatch.toml"), "node-1", 42);
        logger.log_tick(1, &["api Not Running".to_string()], 1, &DeliveryOutcome::Sent, Duration::from_millis(12));
        logger.log_error("boom", Some("test"));
        logger.log_shutdown("test");
    }
}
