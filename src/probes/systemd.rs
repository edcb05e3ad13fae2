//! systemd unit probe
//!
//! A unit is Running only when its SubState is `running`; any other
//! SubState (dead, exited, failed, auto-restart, ...) is NotRunning.

use super::{run_program_checked, HealthProbe};
use crate::constants::DEFAULT_SYSTEMCTL_PATH;
use crate::models::{ProbeError, ProbeKind, TargetStatus};
use async_trait::async_trait;
use std::sync::Arc;

/// Process-manager capability
#[async_trait]
pub trait UnitManager: Send + Sync {
    /// SubState of the named unit, e.g. "running" or "dead"
    async fn unit_state(&self, unit: &str) -> Result<String, ProbeError>;

    /// Start the unit and wait for the job to finish; returns the job result
    async fn start_unit(&self, unit: &str) -> Result<String, ProbeError>;
}

/// [`UnitManager`] backed by the `systemctl` binary
#[derive(Debug, Clone)]
pub struct SystemctlManager {
    program: String,
}

impl SystemctlManager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemctlManager {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEMCTL_PATH)
    }
}

#[async_trait]
impl UnitManager for SystemctlManager {
    async fn unit_state(&self, unit: &str) -> Result<String, ProbeError> {
        let stdout = run_program_checked(
            &self.program,
            &["show", "--property=SubState", "--value", "--", unit],
        )
        .await?;
        let state = stdout.trim();
        if state.is_empty() {
            return Err(ProbeError::BadOutput {
                program: self.program.clone(),
                detail: format!("empty SubState for {unit}"),
            });
        }
        Ok(state.to_string())
    }

    async fn start_unit(&self, unit: &str) -> Result<String, ProbeError> {
        // Without --no-block systemctl waits for the start job to complete
        run_program_checked(&self.program, &["start", "--", unit]).await?;
        Ok("done".to_string())
    }
}

/// Probe for one systemd unit
pub struct SystemdProbe {
    unit: String,
    manager: Arc<dyn UnitManager>,
}

impl SystemdProbe {
    pub fn new(unit: String, manager: Arc<dyn UnitManager>) -> Self {
        Self { unit, manager }
    }
}

/// Map a unit SubState to a target status
pub fn status_from_substate(substate: &str) -> TargetStatus {
    if substate == "running" {
        TargetStatus::Running
    } else {
        TargetStatus::NotRunning
    }
}

#[async_trait]
impl HealthProbe for SystemdProbe {
    fn name(&self) -> &str {
        &self.unit
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Systemd
    }

    async fn check(&self) -> Result<TargetStatus, ProbeError> {
        let substate = self.manager.unit_state(&self.unit).await?;
        Ok(status_from_substate(&substate))
    }

    fn supports_restart(&self) -> bool {
        true
    }

    async fn restart(&self) -> Result<String, ProbeError> {
        self.manager.start_unit(&self.unit).await
    }
}
