//! Custom command probe
//!
//! Runs `sh -c <check_command>`: exit status 0 is Running, any other exit
//! status is NotRunning. Failing to start the shell at all is an error.

use super::{run_program, run_program_checked, HealthProbe};
use crate::models::{ProbeError, ProbeKind, TargetStatus};
use async_trait::async_trait;

pub struct CommandProbe {
    name: String,
    check_command: String,
    restart_command: Option<String>,
}

impl CommandProbe {
    pub fn new(name: String, check_command: String, restart_command: Option<String>) -> Self {
        Self {
            name,
            check_command,
            restart_command,
        }
    }
}

#[async_trait]
impl HealthProbe for CommandProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Command
    }

    async fn check(&self) -> Result<TargetStatus, ProbeError> {
        let output = run_program("sh", &["-c", &self.check_command]).await?;
        // Killed by a signal: no verdict from the command itself
        if output.status.code().is_none() {
            return Err(ProbeError::CommandFailed {
                program: "sh".to_string(),
                code: None,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(if output.status.success() {
            TargetStatus::Running
        } else {
            TargetStatus::NotRunning
        })
    }

    fn supports_restart(&self) -> bool {
        self.restart_command.is_some()
    }

    async fn restart(&self) -> Result<String, ProbeError> {
        let Some(command) = &self.restart_command else {
            return Err(ProbeError::RestartUnsupported { kind: self.kind() });
        };
        let stdout = run_program_checked("sh", &["-c", command]).await?;
        Ok(stdout.trim().to_string())
    }
}
