//! Delivery through a local sendmail-compatible binary
//!
//! The message is written to `sendmail -t -i` on stdin; recipients are taken
//! from the To header, so the MTA handles relaying, TLS and retries.

use super::MailTransport;
use crate::models::NotifyError;
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SendmailTransport {
    program: PathBuf,
    from: Option<String>,
}

impl SendmailTransport {
    pub fn new(program: PathBuf, from: Option<String>) -> Self {
        Self { program, from }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Render a plain-text RFC 5322 message
pub fn format_message(from: Option<&str>, recipients: &[String], subject: &str, body: &str) -> String {
    let mut message = String::new();
    if let Some(from) = from {
        message.push_str(&format!("From: {from}\r\n"));
    }
    message.push_str(&format!("To: {}\r\n", recipients.join(", ")));
    message.push_str(&format!("Subject: {subject}\r\n"));
    message.push_str(&format!("Date: {}\r\n", chrono::Utc::now().to_rfc2822()));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    message.push_str("\r\n");
    message.push_str(body);
    message
}

#[async_trait]
impl MailTransport for SendmailTransport {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            debug!("No alert recipients configured, dropping digest '{}'", subject);
            return Ok(());
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("-t").arg("-i");
        if let Some(from) = &self.from {
            cmd.arg("-f").arg(from);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| NotifyError::Spawn {
            program: self.program_name(),
            source: e,
        })?;

        let message = format_message(self.from.as_deref(), recipients, subject, body);
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(|e| NotifyError::Write {
                    program: self.program_name(),
                    source: e,
                })?;
            // Closing stdin ends the message
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| NotifyError::Spawn {
            program: self.program_name(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(NotifyError::Rejected {
                program: self.program_name(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
