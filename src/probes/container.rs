//! Container probe
//!
//! A container target names the image it runs. The runtime is asked for all
//! containers (running or not) started from that image; exactly one must
//! match, otherwise the target is ambiguous and reported as an error.

use super::{run_program_checked, HealthProbe};
use crate::constants::DEFAULT_DOCKER_PATH;
use crate::models::{ContainerSummary, ProbeError, ProbeKind, TargetStatus};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Container-runtime capability
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers, including stopped ones, created from `image`
    async fn containers_by_image(&self, image: &str) -> Result<Vec<ContainerSummary>, ProbeError>;
}

/// [`ContainerRuntime`] backed by the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_PATH)
    }
}

/// One line of `docker ps --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
}

/// Parse newline-delimited JSON from `docker ps`
pub fn parse_ps_output(program: &str, stdout: &str) -> Result<Vec<ContainerSummary>, ProbeError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<PsLine>(line)
                .map(|ps| ContainerSummary {
                    id: ps.id,
                    state: ps.state,
                    status: ps.status,
                })
                .map_err(|e| ProbeError::BadOutput {
                    program: program.to_string(),
                    detail: e.to_string(),
                })
        })
        .collect()
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn containers_by_image(&self, image: &str) -> Result<Vec<ContainerSummary>, ProbeError> {
        let filter = format!("ancestor={image}");
        let stdout = run_program_checked(
            &self.program,
            &["ps", "--all", "--no-trunc", "--filter", &filter, "--format", "{{json .}}"],
        )
        .await?;
        parse_ps_output(&self.program, &stdout)
    }
}

/// Probe for the single container started from one image
pub struct ContainerProbe {
    image: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerProbe {
    pub fn new(image: String, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { image, runtime }
    }
}

#[async_trait]
impl HealthProbe for ContainerProbe {
    fn name(&self) -> &str {
        &self.image
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Container
    }

    async fn check(&self) -> Result<TargetStatus, ProbeError> {
        let containers = self.runtime.containers_by_image(&self.image).await?;
        match containers.as_slice() {
            [] => Err(ProbeError::NoContainer {
                image: self.image.clone(),
            }),
            [container] if container.state == "running" => Ok(TargetStatus::Running),
            [_] => Ok(TargetStatus::NotRunning),
            many => Err(ProbeError::AmbiguousImage {
                image: self.image.clone(),
                count: many.len(),
            }),
        }
    }
}
