//! Health probes for process targets
//!
//! Every process target is a [`HealthProbe`], whatever manages it:
//! - systemd units, checked through their SubState and started on failure
//! - containers, located by image through the container runtime
//! - custom commands, whose exit status is the health signal
//!
//! The scheduler iterates one homogeneous list of probes. Backends are
//! reached through capability traits ([`UnitManager`], [`ContainerRuntime`])
//! so tests can substitute them.

pub mod command;
pub mod container;
pub mod systemd;

pub use command::CommandProbe;
pub use container::{ContainerProbe, ContainerRuntime, DockerCli};
pub use systemd::{SystemctlManager, SystemdProbe, UnitManager};

use crate::daemon::config::ProcessSettings;
use crate::models::{ProbeError, ProbeKind, TargetStatus};
use async_trait::async_trait;
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;

/// A checkable, possibly restartable, process target
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Unit name, image reference or command label
    fn name(&self) -> &str;

    fn kind(&self) -> ProbeKind;

    /// Current run state; errors are reported by the caller as Unknown
    async fn check(&self) -> Result<TargetStatus, ProbeError>;

    /// Whether [`HealthProbe::restart`] can do anything for this target
    fn supports_restart(&self) -> bool {
        false
    }

    /// Attempt to bring the target back; returns a short result description
    async fn restart(&self) -> Result<String, ProbeError> {
        Err(ProbeError::RestartUnsupported { kind: self.kind() })
    }
}

/// Backends shared by all probes built from one configuration
#[derive(Clone)]
pub struct ProbeBackends {
    pub units: Arc<dyn UnitManager>,
    pub containers: Arc<dyn ContainerRuntime>,
}

impl ProbeBackends {
    /// `systemctl` and `docker` from PATH
    pub fn host() -> Self {
        Self {
            units: Arc::new(SystemctlManager::default()),
            containers: Arc::new(DockerCli::default()),
        }
    }
}

/// Build the probe for one configured process target
pub fn build_probe(settings: &ProcessSettings, backends: &ProbeBackends) -> Arc<dyn HealthProbe> {
    match settings.kind {
        ProbeKind::Systemd => Arc::new(SystemdProbe::new(
            settings.name.clone(),
            backends.units.clone(),
        )),
        ProbeKind::Container => Arc::new(ContainerProbe::new(
            settings.name.clone(),
            backends.containers.clone(),
        )),
        ProbeKind::Command => Arc::new(CommandProbe::new(
            settings.name.clone(),
            settings.check_command.clone().unwrap_or_default(),
            settings.restart_command.clone(),
        )),
    }
}

/// Run an external program to completion, capturing its output.
///
/// The child is killed if the returned future is dropped, so a check
/// abandoned on timeout does not leave processes behind.
pub(crate) async fn run_program(program: &str, args: &[&str]) -> Result<Output, ProbeError> {
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::Spawn {
            program: program.to_string(),
            source: e,
        })
}

/// Like [`run_program`] but a non-zero exit status is an error.
pub(crate) async fn run_program_checked(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = run_program(program, args).await?;
    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_program_checked_success() {
        let out = run_program_checked("sh", &["-c", "echo hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_program_checked_failure() {
        let err = run_program_checked("sh", &["-c", "echo oops >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            ProbeError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_program_missing_binary() {
        let err = run_program("/nonexistent/binary", &[]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }

    #[test]
    fn test_build_probe_kinds() {
        let backends = ProbeBackends::host();
        let settings = ProcessSettings {
            kind: ProbeKind::Container,
            name: "worker".to_string(),
            check_command: None,
            restart_command: None,
        };
        let probe = build_probe(&settings, &backends);
        assert_eq!(probe.kind(), ProbeKind::Container);
        assert_eq!(probe.name(), "worker");
        assert!(!probe.supports_restart());
    }
}
