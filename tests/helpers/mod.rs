//! Scripted backends for driving the monitor without a real host
#![allow(dead_code)]

use async_trait::async_trait;
use nodewatch::daemon::config::MonitorConfiguration;
use nodewatch::models::{ContainerSummary, FilesystemUsage, NotifyError, ProbeError, ResourceError};
use nodewatch::monitor::Monitor;
use nodewatch::notify::MailTransport;
use nodewatch::probes::{ContainerRuntime, ProbeBackends, UnitManager};
use nodewatch::resources::ResourceSource;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Unit manager whose SubStates are set by the test
#[derive(Default)]
pub struct ScriptedUnits {
    states: Mutex<HashMap<String, Result<String, String>>>,
    delays: Mutex<HashMap<String, Duration>>,
    started: Mutex<Vec<String>>,
}

impl ScriptedUnits {
    pub fn set_state(&self, unit: &str, state: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(unit.to_string(), Ok(state.to_string()));
    }

    pub fn set_error(&self, unit: &str, error: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(unit.to_string(), Err(error.to_string()));
    }

    pub fn set_delay(&self, unit: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(unit.to_string(), delay);
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl UnitManager for ScriptedUnits {
    async fn unit_state(&self, unit: &str) -> Result<String, ProbeError> {
        let delay = self.delays.lock().unwrap().get(unit).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .get(unit)
            .cloned()
            .unwrap_or_else(|| Err(format!("unit {unit} not scripted")));
        state.map_err(|detail| ProbeError::BadOutput {
            program: "systemctl".to_string(),
            detail,
        })
    }

    async fn start_unit(&self, unit: &str) -> Result<String, ProbeError> {
        self.started.lock().unwrap().push(unit.to_string());
        Ok("done".to_string())
    }
}

/// Container runtime returning a fixed container list per image
#[derive(Default)]
pub struct ScriptedContainers {
    by_image: Mutex<HashMap<String, Vec<ContainerSummary>>>,
}

impl ScriptedContainers {
    pub fn set(&self, image: &str, states: &[&str]) {
        let containers = states
            .iter()
            .enumerate()
            .map(|(i, state)| ContainerSummary {
                id: format!("{image}-{i}"),
                state: state.to_string(),
                status: String::new(),
            })
            .collect();
        self.by_image
            .lock()
            .unwrap()
            .insert(image.to_string(), containers);
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedContainers {
    async fn containers_by_image(&self, image: &str) -> Result<Vec<ContainerSummary>, ProbeError> {
        Ok(self
            .by_image
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_default())
    }
}

/// Resource readings the test changes between ticks
#[derive(Debug, Clone)]
pub struct ResourceScript {
    pub memory: Result<f64, String>,
    pub cpu: Result<f64, String>,
    pub filesystems: HashMap<PathBuf, FilesystemUsage>,
    /// Simulates a hung mount: every filesystem read blocks this long
    pub filesystem_delay: Option<Duration>,
}

impl Default for ResourceScript {
    fn default() -> Self {
        Self {
            memory: Ok(0.10),
            cpu: Ok(0.05),
            filesystems: HashMap::new(),
            filesystem_delay: None,
        }
    }
}

/// Shared handle: the monitor owns one clone, the test keeps another
#[derive(Clone, Default)]
pub struct ScriptedResources(pub Arc<Mutex<ResourceScript>>);

impl ScriptedResources {
    pub fn set_memory(&self, value: f64) {
        self.0.lock().unwrap().memory = Ok(value);
    }

    pub fn set_filesystem_delay(&self, delay: Duration) {
        self.0.lock().unwrap().filesystem_delay = Some(delay);
    }

    pub fn set_filesystem(&self, path: &str, size: u64, used: u64, avail: u64) {
        self.0.lock().unwrap().filesystems.insert(
            PathBuf::from(path),
            FilesystemUsage {
                size_bytes: size,
                used_bytes: used,
                avail_bytes: avail,
                inodes: 1000,
                inodes_free: 500,
            },
        );
    }
}

fn scripted_error(resource: &str, detail: &str) -> ResourceError {
    ResourceError::Unavailable {
        resource: resource.to_string(),
        detail: detail.to_string(),
    }
}

impl ResourceSource for ScriptedResources {
    fn memory_usage(&self) -> Result<f64, ResourceError> {
        self.0
            .lock()
            .unwrap()
            .memory
            .clone()
            .map_err(|d| scripted_error("memory", &d))
    }

    fn cpu_usage(&self) -> Result<f64, ResourceError> {
        self.0
            .lock()
            .unwrap()
            .cpu
            .clone()
            .map_err(|d| scripted_error("cpu", &d))
    }

    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, ResourceError> {
        let delay = self.0.lock().unwrap().filesystem_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.0
            .lock()
            .unwrap()
            .filesystems
            .get(path)
            .copied()
            .ok_or_else(|| ResourceError::NotMounted {
                path: path.display().to_string(),
            })
    }
}

/// One sent message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMail {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// A monitor plus handles on every scripted backend
pub struct Harness {
    pub monitor: Monitor,
    pub units: Arc<ScriptedUnits>,
    pub containers: Arc<ScriptedContainers>,
    pub resources: ScriptedResources,
    pub mail: Arc<RecordingTransport>,
}

pub const BASE_CONFIG: &str = r#"
[monitor]
host = "node-1"
alert_recipients = ["ops@example.com"]
check_timeout = 1.0
restart_timeout = 5.0
"#;

/// Build a monitor from `BASE_CONFIG` followed by `targets`
pub fn harness(targets: &str) -> Harness {
    let config = MonitorConfiguration::from_toml_str(&format!("{BASE_CONFIG}\n{targets}")).unwrap();
    let units = Arc::new(ScriptedUnits::default());
    let containers = Arc::new(ScriptedContainers::default());
    let resources = ScriptedResources::default();
    let mail = Arc::new(RecordingTransport::default());

    let backends = ProbeBackends {
        units: units.clone(),
        containers: containers.clone(),
    };
    let monitor = Monitor::from_config(&config, &backends, mail.clone(), Arc::new(resources.clone()));

    Harness {
        monitor,
        units,
        containers,
        resources,
        mail,
    }
}
