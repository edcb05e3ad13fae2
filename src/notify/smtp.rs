//! Delivery by SMTP submission
//!
//! Connects to the relay with STARTTLS (port 587 by default) and logs in
//! when credentials are configured. Hosts without a local MTA use this.

use super::MailTransport;
use crate::models::NotifyError;
use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::debug;

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(
        server: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| NotifyError::Smtp {
                server: server.to_string(),
                detail: e.to_string(),
            })?
            .port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            mailer: builder.build(),
            server: format!("{server}:{port}"),
            from: parse_mailbox(from)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e: AddressError| NotifyError::InvalidAddress {
            address: address.to_string(),
            detail: e.to_string(),
        })
}

/// Build the plain-text digest message
pub fn build_message(
    from: &Mailbox,
    recipients: &[String],
    subject: &str,
    body: &str,
) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for recipient in recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }
    builder
        .body(body.to_string())
        .map_err(|e| NotifyError::InvalidMessage(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            debug!("No alert recipients configured, dropping digest '{}'", subject);
            return Ok(());
        }

        let message = build_message(&self.from, recipients, subject, body)?;
        let response = self.mailer.send(message).await.map_err(|e| NotifyError::Smtp {
            server: self.server.clone(),
            detail: e.to_string(),
        })?;
        debug!("{} accepted digest: {:?}", self.server, response.code());
        Ok(())
    }
}
