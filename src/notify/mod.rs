//! Alert digest delivery
//!
//! All alert lines produced during one tick are collected into a [`Digest`].
//! A non-empty digest becomes exactly one message, subject `"<host> warning"`,
//! sent to every configured recipient. Delivery failures are logged and
//! dropped; the next tick carries on regardless.

pub mod sendmail;
pub mod smtp;

pub use sendmail::SendmailTransport;
pub use smtp::SmtpTransport;

use crate::constants::{ALERT_LINE_SEPARATOR, ALERT_SUBJECT_SUFFIX};
use crate::models::NotifyError;
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

/// Mail transport capability
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Transport that only writes digests to the log
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(
            "digest for [{}]: {} | {}",
            recipients.join(", "),
            subject,
            body.replace(ALERT_LINE_SEPARATOR, " | ").trim_end_matches(" | ")
        );
        Ok(())
    }
}

/// Alert lines accumulated during one tick, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    lines: Vec<String>,
}

impl Digest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Message body: every line terminated by the record separator
    pub fn body(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{line}{ALERT_LINE_SEPARATOR}"))
            .collect()
    }
}

/// Result of handing one digest to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Nothing to send this tick
    Skipped,
    Sent,
    Failed(String),
}

/// Sends at most one digest per tick
#[derive(Clone)]
pub struct Notifier {
    host: String,
    recipients: Vec<String>,
    transport: Arc<dyn MailTransport>,
    send_timeout: Duration,
}

impl Notifier {
    pub fn new(
        host: String,
        recipients: Vec<String>,
        transport: Arc<dyn MailTransport>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            host,
            recipients,
            transport,
            send_timeout,
        }
    }

    pub fn subject(&self) -> String {
        format!("{} {}", self.host, ALERT_SUBJECT_SUFFIX)
    }

    /// Send the digest if it holds any lines. Never fails; errors are logged.
    pub async fn deliver(&self, digest: &Digest) -> DeliveryOutcome {
        if digest.is_empty() {
            return DeliveryOutcome::Skipped;
        }

        let subject = self.subject();
        let body = digest.body();
        let send = self.transport.send(&self.recipients, &subject, &body);

        let result = match tokio::time::timeout(self.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.send_timeout)),
        };

        match result {
            Ok(()) => {
                info!("Sent digest with {} alert line(s): {}", digest.len(), subject);
                DeliveryOutcome::Sent
            }
            Err(e) => {
                error!("Failed to send digest '{}': {}", subject, e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(Vec<String>, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Rejected {
                    program: "fake".to_string(),
                    code: Some(75),
                    stderr: "relay down".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipients.to_vec(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct StalledTransport;

    #[async_trait]
    impl MailTransport for StalledTransport {
        async fn send(&self, _: &[String], _: &str, _: &str) -> Result<(), NotifyError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    fn notifier(transport: Arc<dyn MailTransport>) -> Notifier {
        Notifier::new(
            "node-1".to_string(),
            vec!["ops@example.com".to_string()],
            transport,
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_digest_body_terminates_every_line() {
        let mut digest = Digest::new();
        digest.push("api Not Running");
        digest.push("MemoryUsage Exceed 0.95 >= 0.90");
        assert_eq!(
            digest.body(),
            "api Not Running\r\nMemoryUsage Exceed 0.95 >= 0.90\r\n"
        );
    }

    #[tokio::test]
    async fn test_empty_digest_not_sent() {
        let transport = Arc::new(RecordingTransport::default());
        let outcome = notifier(transport.clone()).deliver(&Digest::new()).await;
        assert_eq!(outcome, DeliveryOutcome::Skipped);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_message_per_digest() {
        let transport = Arc::new(RecordingTransport::default());
        let mut digest = Digest::new();
        digest.push("a");
        digest.push("b");
        let outcome = notifier(transport.clone()).deliver(&digest).await;
        assert_eq!(outcome, DeliveryOutcome::Sent);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["ops@example.com".to_string()]);
        assert_eq!(sent[0].1, "node-1 warning");
        assert_eq!(sent[0].2, "a\r\nb\r\n");
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let mut digest = Digest::new();
        digest.push("a");
        let outcome = notifier(transport).deliver(&digest).await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(msg) if msg.contains("relay down")));
    }

    #[tokio::test]
    async fn test_stalled_transport_times_out() {
        let mut digest = Digest::new();
        digest.push("a");
        let outcome = notifier(Arc::new(StalledTransport)).deliver(&digest).await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(msg) if msg.contains("timed out")));
    }
}
