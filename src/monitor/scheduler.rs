//! Fixed-interval control loop
//!
//! One pass per tick: check every process target concurrently, read memory,
//! CPU and each filesystem, update the warning flags, restart targets found
//! NotRunning, send the digest and publish a status snapshot. The pass is
//! the only writer of target state; concurrent checks report back over a
//! channel and never touch a flag themselves.

use super::alerts;
use super::remediator::{RemediationOutcome, Remediator};
use super::state::{ProcessTarget, ThresholdTarget};
use crate::constants::{CPU_IDENTIFIER, MEMORY_IDENTIFIER};
use crate::daemon::config::MonitorConfiguration;
use crate::daemon::logging::DaemonLogger;
use crate::models::{ProbeError, ResourceError, StatusSnapshot, TargetStatus};
use crate::notify::{DeliveryOutcome, Digest, MailTransport, Notifier};
use crate::probes::{build_probe, HealthProbe, ProbeBackends};
use crate::resources::ResourceSource;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of one process check, after timeout handling
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub status: TargetStatus,
    pub error: Option<String>,
}

impl CheckResult {
    fn unknown(error: impl Into<String>) -> Self {
        Self {
            status: TargetStatus::Unknown,
            error: Some(error.into()),
        }
    }
}

/// Run one bounded check. Errors and timeouts become Unknown.
pub async fn run_check(probe: &dyn HealthProbe, timeout: Duration) -> CheckResult {
    match tokio::time::timeout(timeout, probe.check()).await {
        Ok(Ok(status)) => CheckResult { status, error: None },
        Ok(Err(e)) => CheckResult::unknown(e.to_string()),
        Err(_) => CheckResult::unknown(ProbeError::Timeout(timeout).to_string()),
    }
}

/// What one evaluation pass produced
#[derive(Debug)]
pub struct TickReport {
    pub tick: u64,
    /// Newly armed alert lines, in configuration order
    pub alert_lines: Vec<String>,
    /// Detached restarts issued during this pass
    pub restarts: Vec<JoinHandle<RemediationOutcome>>,
    pub delivery: DeliveryOutcome,
}

struct FilesystemTarget {
    path: PathBuf,
    threshold: ThresholdTarget,
}

/// Owns all target state and drives evaluation passes
pub struct Monitor {
    host: String,
    processes: Vec<ProcessTarget>,
    memory: ThresholdTarget,
    cpu: ThresholdTarget,
    filesystems: Vec<FilesystemTarget>,
    resources: Arc<dyn ResourceSource>,
    notifier: Notifier,
    remediator: Remediator,
    check_timeout: Duration,
    ticks: u64,
    /// RFC 3339 time the last pass finished
    last_pass_at: Option<String>,
    snapshot_tx: watch::Sender<Arc<StatusSnapshot>>,
}

impl Monitor {
    /// Build the monitor for a validated configuration
    pub fn from_config(
        config: &MonitorConfiguration,
        backends: &ProbeBackends,
        transport: Arc<dyn MailTransport>,
        resources: Arc<dyn ResourceSource>,
    ) -> Self {
        let host = config.resolved_host();
        let processes = config
            .processes
            .iter()
            .map(|settings| ProcessTarget::new(build_probe(settings, backends)))
            .collect();
        let filesystems = config
            .filesystems
            .iter()
            .map(|fs| FilesystemTarget {
                path: fs.path.clone(),
                threshold: ThresholdTarget::new(fs.path.display().to_string(), fs.limit),
            })
            .collect();
        let notifier = Notifier::new(
            host.clone(),
            config.monitor.alert_recipients.clone(),
            transport,
            config.send_timeout(),
        );

        let mut monitor = Self {
            host,
            processes,
            memory: ThresholdTarget::new(MEMORY_IDENTIFIER, config.memory.limit),
            cpu: ThresholdTarget::new(CPU_IDENTIFIER, config.cpu.limit),
            filesystems,
            resources,
            notifier,
            remediator: Remediator::new(config.restart_timeout()),
            check_timeout: config.check_timeout(),
            ticks: 0,
            last_pass_at: None,
            snapshot_tx: watch::channel(Arc::new(StatusSnapshot::default())).0,
        };
        monitor.snapshot_tx.send_replace(Arc::new(monitor.snapshot()));
        monitor
    }

    /// Replace the remediator (e.g. with [`Remediator::disabled`])
    pub fn with_remediator(mut self, remediator: Remediator) -> Self {
        self.remediator = remediator;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Receiver that always holds the snapshot of the last completed pass
    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Current target state
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            host: self.host.clone(),
            ticks: self.ticks,
            updated_at: self.last_pass_at.clone(),
            processes: self.processes.iter().map(ProcessTarget::to_state).collect(),
            memory: Some(self.memory.to_state()),
            cpu: Some(self.cpu.to_state()),
            filesystems: self
                .filesystems
                .iter()
                .map(|fs| fs.threshold.to_state())
                .collect(),
        }
    }

    /// Check all process targets concurrently; results in configuration order
    async fn check_processes(&self) -> Vec<CheckResult> {
        let (tx, mut rx) = mpsc::channel(self.processes.len().max(1));
        for (index, target) in self.processes.iter().enumerate() {
            let probe = target.probe().clone();
            let tx = tx.clone();
            let timeout = self.check_timeout;
            tokio::spawn(async move {
                let result = run_check(probe.as_ref(), timeout).await;
                // Receiver only goes away if the pass itself was dropped
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut results = vec![CheckResult::unknown("check did not report"); self.processes.len()];
        while let Some((index, result)) = rx.recv().await {
            results[index] = result;
        }
        results
    }

    /// Take one resource reading on a blocking thread, bounded by the check
    /// timeout. A reader stuck in the kernel (hung mount) is abandoned; its
    /// thread finishes on its own.
    async fn read_resource<T, F>(&self, read: F) -> Result<T, ResourceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ResourceSource) -> Result<T, ResourceError> + Send + 'static,
    {
        let source = self.resources.clone();
        let task = tokio::task::spawn_blocking(move || read(source.as_ref()));
        match tokio::time::timeout(self.check_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ResourceError::Task(e.to_string())),
            Err(_) => Err(ResourceError::Timeout(self.check_timeout)),
        }
    }

    /// Run one full evaluation pass
    pub async fn evaluate_tick(&mut self) -> TickReport {
        self.ticks += 1;
        let tick = self.ticks;
        let mut digest = Digest::new();
        let mut restarts = Vec::new();

        let results = self.check_processes().await;
        for (target, result) in self.processes.iter_mut().zip(results) {
            let CheckResult { status, error } = result;
            match &error {
                Some(e) => warn!("Check of {} failed: {}", target.name(), e),
                None => debug!("{} is {}", target.name(), status),
            }
            if target.record(status, error.clone()) {
                digest.push(alerts::process_line(
                    target.kind(),
                    target.name(),
                    status,
                    error.as_deref(),
                ));
            }
            // Remediation is level-triggered; Unknown is never restarted
            if status == TargetStatus::NotRunning {
                if let Some(handle) = self.remediator.restart(target.probe().clone()) {
                    restarts.push(handle);
                }
            }
        }

        match self.read_resource(|source| source.memory_usage()).await {
            Ok(value) => {
                debug!("Memory usage {:.3}", value);
                if self.memory.record_value(value) {
                    digest.push(alerts::memory_exceeded(value, self.memory.limit()));
                }
            }
            Err(e) => {
                warn!("Failed to read memory usage: {}", e);
                let reason = e.to_string();
                if self.memory.record_error(reason.clone()) {
                    digest.push(alerts::memory_unknown(&reason));
                }
            }
        }

        match self.read_resource(|source| source.cpu_usage()).await {
            Ok(value) => {
                debug!("CPU usage {:.3}", value);
                if self.cpu.record_value(value) {
                    digest.push(alerts::cpu_exceeded(value, self.cpu.limit()));
                }
            }
            Err(e) => {
                warn!("Failed to read CPU usage: {}", e);
                let reason = e.to_string();
                if self.cpu.record_error(reason.clone()) {
                    digest.push(alerts::cpu_unknown(&reason));
                }
            }
        }

        for index in 0..self.filesystems.len() {
            let path = self.filesystems[index].path.clone();
            let reading = self
                .read_resource(move |source| source.filesystem_usage(&path))
                .await;
            let fs = &mut self.filesystems[index];
            match reading {
                Ok(usage) => {
                    let ratio = usage.usage_ratio();
                    debug!("Path {} usage {:.3}", fs.path.display(), ratio);
                    if fs.threshold.record_value(ratio) {
                        digest.push(alerts::filesystem_exceeded(&fs.path, ratio, fs.threshold.limit()));
                    }
                }
                Err(e) => {
                    warn!("Failed to read usage of {}: {}", fs.path.display(), e);
                    let reason = e.to_string();
                    if fs.threshold.record_error(reason.clone()) {
                        digest.push(alerts::filesystem_unknown(&fs.path, &reason));
                    }
                }
            }
        }

        let delivery = self.notifier.deliver(&digest).await;
        self.last_pass_at = Some(chrono::Utc::now().to_rfc3339());
        self.snapshot_tx.send_replace(Arc::new(self.snapshot()));

        TickReport {
            tick,
            alert_lines: digest.lines().to_vec(),
            restarts,
            delivery,
        }
    }

    /// Evaluate every `interval` until `shutdown` turns true or its sender
    /// is dropped. A pass that has started always runs to completion.
    pub async fn run(
        &mut self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        logger: &DaemonLogger,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Monitoring {} target(s) every {:?}", self.target_count(), interval);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let report = self.evaluate_tick().await;
                    logger.log_tick(
                        report.tick,
                        &report.alert_lines,
                        report.restarts.len(),
                        &report.delivery,
                        started.elapsed(),
                    );
                }
            }
        }
        info!("Monitoring stopped after {} tick(s)", self.ticks);
    }

    fn target_count(&self) -> usize {
        self.processes.len() + 2 + self.filesystems.len()
    }
}
