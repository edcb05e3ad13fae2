//! Daemon module for running nodewatch as a long-lived service
//!
//! This module provides:
//! - Configuration loading and validation
//! - Inter-process communication for status queries and shutdown
//! - systemd unit generation
//! - Structured logging of daemon events

pub mod config;
pub mod ipc;
pub mod logging;
pub mod unit_file;

use crate::daemon::config::{MailTransportKind, MonitorConfiguration};
use crate::daemon::ipc::IpcServer;
use crate::daemon::logging::DaemonLogger;
use crate::models::StatusSnapshot;
use crate::monitor::{Monitor, Remediator};
use crate::notify::{LogTransport, MailTransport, SendmailTransport, SmtpTransport};
use crate::probes::ProbeBackends;
use crate::resources::{HostResources, ResourceSource};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

/// Mail transport selected by the configuration
pub fn build_transport(config: &MonitorConfiguration) -> Result<Arc<dyn MailTransport>> {
    let mail = &config.mail;
    Ok(match mail.transport {
        MailTransportKind::Sendmail => Arc::new(SendmailTransport::new(
            mail.sendmail_path.clone(),
            mail.from.clone(),
        )),
        MailTransportKind::Smtp => {
            let server = mail.server.as_deref().unwrap_or_default();
            let from = mail.smtp_from().unwrap_or_default();
            let transport = SmtpTransport::new(server, mail.port, mail.smtp_credentials(), from)
                .context("Failed to set up SMTP transport")?;
            Arc::new(transport)
        }
        MailTransportKind::Log => Arc::new(LogTransport),
    })
}

/// Run the monitoring loop until SIGINT, SIGTERM or an IPC shutdown request
pub async fn run_daemon(config_path: &Path, socket_override: Option<PathBuf>) -> Result<()> {
    let config = MonitorConfiguration::load_from_file(config_path)?;
    let logger = DaemonLogger::default();

    let socket_path = socket_override.unwrap_or_else(|| config.monitor.socket_path.clone());
    // Two loops on one host would double every alert and restart
    if ipc::socket_in_use(&socket_path) {
        anyhow::bail!("nodewatch is already running (socket {})", socket_path.display());
    }

    let mut monitor = Monitor::from_config(
        &config,
        &ProbeBackends::host(),
        build_transport(&config)?,
        Arc::new(HostResources::new()),
    );
    logger.log_startup(config_path, monitor.host(), std::process::id());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Status queries are optional; the loop runs even if the socket is unavailable
    let ipc_task = match IpcServer::bind(socket_path, monitor.subscribe(), shutdown_tx.clone()) {
        Ok(server) => Some(tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                warn!("IPC server stopped: {:#}", e);
            }
        })),
        Err(e) => {
            logger.log_error(&format!("{:#}", e), Some("ipc"));
            None
        }
    };

    let signal_task = {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal(&shutdown_tx).await {
                logger.log_error(&format!("{:#}", e), Some("signals"));
            }
        })
    };

    monitor.run(config.tick_duration(), shutdown_rx, &logger).await;

    signal_task.abort();
    if let Some(task) = ipc_task {
        task.abort();
        // Dropping the server removes the socket file
        let _ = task.await;
    }

    logger.log_shutdown("monitoring loop stopped");
    Ok(())
}

/// Flip the shutdown flag on the first SIGINT or SIGTERM
async fn wait_for_signal(shutdown: &watch::Sender<bool>) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let name = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for SIGINT")?;
            "SIGINT"
        }
        _ = sigterm.recv() => "SIGTERM",
    };
    info!("Received {}, stopping after the current tick", name);
    shutdown.send_replace(true);
    Ok(())
}

/// Outcome of a one-shot evaluation
#[derive(Debug)]
pub struct CheckSummary {
    pub snapshot: StatusSnapshot,
    pub alert_lines: Vec<String>,
}

/// Evaluate all targets once without restarting anything.
///
/// The digest is only mailed when `notify` is set; otherwise it is logged.
pub async fn check_once(config: &MonitorConfiguration, notify: bool) -> Result<CheckSummary> {
    let transport: Arc<dyn MailTransport> = if notify {
        build_transport(config)?
    } else {
        Arc::new(LogTransport)
    };

    // Prime the CPU sampler so the single pass sees a real delta
    let resources = Arc::new(HostResources::new());
    if let Err(e) = resources.cpu_usage() {
        warn!("Failed to prime CPU sampler: {}", e);
    }
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

    let mut monitor = Monitor::from_config(config, &ProbeBackends::host(), transport, resources)
        .with_remediator(Remediator::disabled());
    let report = monitor.evaluate_tick().await;

    Ok(CheckSummary {
        snapshot: monitor.snapshot(),
        alert_lines: report.alert_lines,
    })
}
