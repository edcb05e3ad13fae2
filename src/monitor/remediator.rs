//! Automatic restart of failed process targets
//!
//! Restarts are fire-and-forget: each one runs in its own task bounded by
//! the restart timeout, and its outcome is only logged. The returned handle
//! lets tests await completion; the control loop drops it.

use crate::probes::HealthProbe;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How a detached restart ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    Restarted(String),
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Remediator {
    restart_timeout: Duration,
    enabled: bool,
    /// Targets whose restart task has not finished yet
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Remediator {
    pub fn new(restart_timeout: Duration) -> Self {
        Self {
            restart_timeout,
            enabled: true,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Remediator that never restarts anything (one-shot checks)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a detached restart of `probe`.
    ///
    /// Returns None when remediation is disabled, the target kind cannot be
    /// restarted, or a previous restart of the same target is still running.
    pub fn restart(&self, probe: Arc<dyn HealthProbe>) -> Option<JoinHandle<RemediationOutcome>> {
        if !self.enabled {
            debug!("Remediation disabled, not restarting {}", probe.name());
            return None;
        }
        if !probe.supports_restart() {
            debug!("No restart available for {} target {}", probe.kind(), probe.name());
            return None;
        }

        let key = format!("{}:{}", probe.kind(), probe.name());
        if !self.lock_in_flight().insert(key.clone()) {
            info!("Restart of {} still in progress, skipping", probe.name());
            return None;
        }

        let in_flight = self.in_flight.clone();
        let timeout = self.restart_timeout;
        Some(tokio::spawn(async move {
            info!("Restarting {} target {}", probe.kind(), probe.name());
            let outcome = match tokio::time::timeout(timeout, probe.restart()).await {
                Ok(Ok(result)) => {
                    info!("Restart of {} finished: {}", probe.name(), result);
                    RemediationOutcome::Restarted(result)
                }
                Ok(Err(e)) => {
                    error!("Restart of {} failed: {}", probe.name(), e);
                    RemediationOutcome::Failed(e.to_string())
                }
                Err(_) => {
                    warn!("Restart of {} timed out after {:?}", probe.name(), timeout);
                    RemediationOutcome::TimedOut
                }
            };
            in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);
            outcome
        }))
    }
}
