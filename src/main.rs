#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use nodewatch::cli::{self, CliCommand};
use nodewatch::constants::DEFAULT_SOCKET_PATH;
use nodewatch::daemon::config::MonitorConfiguration;
use nodewatch::daemon::ipc::{self, IpcMessage, IpcResponse};
use nodewatch::daemon::logging::init_logging;
use nodewatch::daemon::unit_file::ServiceUnit;
use nodewatch::daemon::{check_once, run_daemon};
use nodewatch::output;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// How long exit waits for resource readers still blocked in the kernel
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run());
    // A reader stuck on a hung mount must not hold the process open
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run() -> Result<ExitCode> {
    let args = cli::parse_args()?;
    init_logging(&args.log_level)?;

    match args.command {
        CliCommand::Run { config, socket } => {
            run_daemon(&config, socket).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Check { config, json, notify } => {
            let config = MonitorConfiguration::load_from_file(&config)?;
            let summary = check_once(&config, notify).await?;
            if json {
                println!("{}", output::format_status_json(&summary.snapshot)?);
            } else {
                print!("{}", output::format_status_human(&summary.snapshot));
                for line in &summary.alert_lines {
                    println!("alert: {}", line);
                }
            }
            // Non-zero exit lets cron/CI wrappers react to warnings
            Ok(if summary.snapshot.warning_count() > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        CliCommand::Status { config, socket, json } => {
            let socket = resolve_socket(config.as_deref(), socket)?;
            let snapshot = ipc::fetch_status(&socket).await?;
            if json {
                println!("{}", output::format_status_json(&snapshot)?);
            } else {
                print!("{}", output::format_status_human(&snapshot));
            }
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Stop { config, socket } => {
            let socket = resolve_socket(config.as_deref(), socket)?;
            let request = IpcMessage::Shutdown {
                request_id: ipc::generate_request_id(),
            };
            match ipc::send_request(&socket, &request).await? {
                IpcResponse::Success { message, .. } => {
                    println!("{}", message.unwrap_or_else(|| "Shutdown requested".to_string()));
                    Ok(ExitCode::SUCCESS)
                }
                IpcResponse::Error { code, message, .. } => {
                    anyhow::bail!("Daemon error {}: {}", code, message)
                }
            }
        }
        CliCommand::UnitFile { binary, config, output } => {
            let binary = match binary {
                Some(path) => path,
                None => std::env::current_exe().context("Failed to get current executable path")?,
            };
            let unit = ServiceUnit::new(&binary, &config);
            match output {
                Some(path) => {
                    unit.write_to(&path)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", unit.generate()),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `--socket` wins, then the socket_path of `--config`, then the default
fn resolve_socket(config: Option<&Path>, socket: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(socket) = socket {
        return Ok(socket);
    }
    match config {
        Some(path) => Ok(MonitorConfiguration::load_from_file(path)?.monitor.socket_path),
        None => Ok(PathBuf::from(DEFAULT_SOCKET_PATH)),
    }
}
