//! Email delivery
//!
//! Outgoing mail goes through the [`Mailer`] trait so services can be tested
//! without an SMTP server. The production implementation uses lettre's async
//! SMTP transport; when no SMTP host is configured, messages are logged
//! instead of sent so development setups keep working.

use crate::config::SmtpConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::info;

/// Outgoing email sender
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a plain-text email
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Shared mailer handle
pub type DynMailer = Arc<dyn Mailer>;

/// SMTP mailer backed by lettre.
///
/// With an empty `host` the mailer degrades to logging the message, which is
/// what development and test configurations use.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Create a shared mailer for use with dependency injection
    pub fn shared(config: SmtpConfig) -> DynMailer {
        Arc::new(Self::new(config))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if self.config.host.is_empty() {
            info!(to = %to, subject = %subject, "SMTP not configured; logging email instead of sending");
            info!("email body:\n{}", body);
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from);

        let email = Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.config.port)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}
