//! systemd service unit generation
//!
//! `nodewatch unit-file` prints (or writes) a unit that runs the daemon in
//! the foreground under systemd supervision.

use crate::constants::{APP_NAME, UNIT_FILE_NAME};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory for locally installed units
pub const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";

/// systemd service unit for the daemon
#[derive(Debug, Clone)]
pub struct ServiceUnit {
    pub description: String,
    /// Executable and arguments for ExecStart
    pub exec_start: Vec<String>,
    /// systemd Restart= policy
    pub restart: String,
    pub restart_sec: u32,
    /// Runtime directory under /run holding the IPC socket
    pub runtime_directory: Option<String>,
    pub environment: BTreeMap<String, String>,
}

impl ServiceUnit {
    /// Unit running `<daemon_path> run --config <config_path>`
    pub fn new(daemon_path: &Path, config_path: &Path) -> Self {
        let mut environment = BTreeMap::new();
        environment.insert("RUST_LOG".to_string(), "info".to_string());

        Self {
            description: "nodewatch host health monitor".to_string(),
            exec_start: vec![
                daemon_path.display().to_string(),
                "run".to_string(),
                "--config".to_string(),
                config_path.display().to_string(),
            ],
            restart: "on-failure".to_string(),
            restart_sec: 5,
            runtime_directory: Some(APP_NAME.to_string()),
            environment,
        }
    }

    /// Render the unit file text
    pub fn generate(&self) -> String {
        let mut unit = String::new();

        unit.push_str("[Unit]\n");
        unit.push_str(&format!("Description={}\n", self.description));
        unit.push_str("After=network-online.target docker.service\n");
        unit.push_str("Wants=network-online.target\n");
        unit.push('\n');

        unit.push_str("[Service]\n");
        unit.push_str("Type=simple\n");
        unit.push_str(&format!("ExecStart={}\n", self.exec_start.join(" ")));
        unit.push_str(&format!("Restart={}\n", self.restart));
        unit.push_str(&format!("RestartSec={}\n", self.restart_sec));
        if let Some(ref dir) = self.runtime_directory {
            unit.push_str(&format!("RuntimeDirectory={}\n", dir));
        }
        for (key, value) in &self.environment {
            unit.push_str(&format!("Environment={}={}\n", key, value));
        }
        unit.push('\n');

        unit.push_str("[Install]\n");
        unit.push_str("WantedBy=multi-user.target\n");

        unit
    }

    /// Default install location of the unit file
    pub fn default_install_path() -> PathBuf {
        Path::new(SYSTEM_UNIT_DIR).join(UNIT_FILE_NAME)
    }

    /// Write the unit file to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.generate())
            .with_context(|| format!("Failed to write unit file: {}", path.display()))
    }
}
