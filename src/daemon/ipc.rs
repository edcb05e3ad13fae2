//! Inter-process communication for daemon control
//!
//! Provides a Unix domain socket server for status queries and shutdown
//! requests. Each connection carries one newline-terminated JSON request
//! and receives one newline-terminated JSON response.

use crate::models::StatusSnapshot;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use uuid::Uuid;

/// Upper bound on one request line; longer input is rejected as malformed
const MAX_REQUEST_BYTES: u64 = 64 * 1024;

/// IPC message types for daemon communication
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcMessage {
    /// Get the status snapshot of the last completed tick
    GetStatus { request_id: String },
    /// Stop the monitoring loop after the current tick
    Shutdown { request_id: String },
}

/// IPC response types
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IpcResponse {
    /// Successful operation
    Success {
        request_id: String,
        data: Option<serde_json::Value>,
        message: Option<String>,
    },
    /// Operation failed
    Error {
        request_id: String,
        code: u32,
        message: String,
        details: Option<String>,
    },
}

/// Generate unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// IPC server bound to a socket path
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
    handler: IpcServerHandler,
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file when server is dropped
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

/// Handler for individual IPC connections
#[derive(Clone)]
struct IpcServerHandler {
    snapshots: watch::Receiver<Arc<StatusSnapshot>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl IpcServer {
    /// Bind the socket, replacing a stale socket file from a previous run.
    ///
    /// Fails without touching the file when a live daemon still answers on it.
    pub fn bind(
        socket_path: PathBuf,
        snapshots: watch::Receiver<Arc<StatusSnapshot>>,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> Result<Self> {
        if socket_path.exists() {
            if socket_in_use(&socket_path) {
                anyhow::bail!(
                    "Another daemon is already listening on {}",
                    socket_path.display()
                );
            }
            debug!("Removing stale socket {}", socket_path.display());
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {}", socket_path.display()))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind to socket: {}", socket_path.display()))?;
        info!("IPC server listening on {}", socket_path.display());

        Ok(Self {
            socket_path,
            listener,
            handler: IpcServerHandler { snapshots, shutdown },
        })
    }

    /// Accept connections until the listener fails
    pub async fn serve(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle_connection(stream).await {
                            warn!("Error handling IPC connection: {:#}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting IPC connection: {}", e);
                    return Err(e).context("IPC listener failed");
                }
            }
        }
    }
}

impl IpcServerHandler {
    async fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader.take(MAX_REQUEST_BYTES));
        let mut line = String::new();

        reader
            .read_line(&mut line)
            .await
            .context("Failed to read from client")?;

        let response = match serde_json::from_str::<IpcMessage>(line.trim()) {
            Ok(message) => self.process_message(message),
            Err(e) => IpcResponse::Error {
                request_id: String::new(),
                code: 400,
                message: "Failed to parse IPC message".to_string(),
                details: Some(e.to_string()),
            },
        };

        let response_json = serde_json::to_string(&response)
            .context("Failed to serialize response")?;

        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
        writer
            .write_all(b"\n")
            .await
            .context("Failed to write newline")?;

        Ok(())
    }

    fn process_message(&self, message: IpcMessage) -> IpcResponse {
        match message {
            IpcMessage::GetStatus { request_id } => {
                debug!("Status requested ({})", request_id);
                let snapshot = self.snapshots.borrow().clone();
                match serde_json::to_value(snapshot.as_ref()) {
                    Ok(data) => IpcResponse::Success {
                        request_id,
                        data: Some(data),
                        message: None,
                    },
                    Err(e) => IpcResponse::Error {
                        request_id,
                        code: 500,
                        message: "Failed to serialize status".to_string(),
                        details: Some(e.to_string()),
                    },
                }
            }
            IpcMessage::Shutdown { request_id } => {
                info!("Shutdown requested over IPC ({})", request_id);
                self.shutdown.send_replace(true);
                IpcResponse::Success {
                    request_id,
                    data: None,
                    message: Some("Shutdown requested".to_string()),
                }
            }
        }
    }
}

/// Whether something accepts connections on `socket_path`.
///
/// Only a refused connection (nobody listening) counts as free; any other
/// failure is treated as in use so a live socket is never removed.
pub fn socket_in_use(socket_path: &Path) -> bool {
    match std::os::unix::net::UnixStream::connect(socket_path) {
        Ok(_) => true,
        Err(e) => !matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
        ),
    }
}

/// Send one request to a running daemon and wait for its response
pub async fn send_request(socket_path: &Path, message: &IpcMessage) -> Result<IpcResponse> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("Failed to connect to daemon socket: {}", socket_path.display()))?;
    let (reader, mut writer) = stream.into_split();

    let request = serde_json::to_string(message).context("Failed to serialize request")?;
    writer
        .write_all(request.as_bytes())
        .await
        .context("Failed to send request")?;
    writer.write_all(b"\n").await.context("Failed to send request")?;

    let mut line = String::new();
    BufReader::new(reader)
        .read_line(&mut line)
        .await
        .context("Failed to read response")?;
    serde_json::from_str(line.trim()).context("Failed to parse daemon response")
}

/// Fetch the current status snapshot from a running daemon
pub async fn fetch_status(socket_path: &Path) -> Result<StatusSnapshot> {
    let response = send_request(
        socket_path,
        &IpcMessage::GetStatus {
            request_id: generate_request_id(),
        },
    )
    .await?;

    match response {
        IpcResponse::Success { data: Some(data), .. } => {
            serde_json::from_value(data).context("Daemon returned a malformed status")
        }
        IpcResponse::Success { data: None, .. } => anyhow::bail!("Daemon returned no status"),
        IpcResponse::Error { code, message, details, .. } => anyhow::bail!(
            "Daemon error {}: {}{}",
            code,
            message,
            details.map(|d| format!(" ({d})")).unwrap_or_default()
        ),
    }
}
