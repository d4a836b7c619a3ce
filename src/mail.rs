use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Mutex;
use tracing::info;

use crate::config::MailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatch the password-reset message. A failed send must surface to
    /// the caller, never pass silently.
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> anyhow::Result<()>;
}

fn compose_reset_body(reset_url: &str) -> String {
    format!(
        "To reset your password, visit the following link:\n{reset_url}\n\n\
         If you did not make this request then simply ignore this email \
         and no changes will be made.\n"
    )
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .context("smtp relay")?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.smtp_username.clone(),
                cfg.smtp_password.clone(),
            ))
            .build();
        let from = cfg
            .from_address
            .parse::<Mailbox>()
            .context("parse MAIL_FROM")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        _username: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("recipient address")?)
            .subject("Password Reset Request")
            .body(compose_reset_body(reset_url))
            .context("build reset message")?;

        self.transport.send(message).await.context("smtp send")?;
        info!(%to, "reset email dispatched");
        Ok(())
    }
}

/// Sent-mail record kept by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentReset {
    pub to: String,
    pub username: String,
    pub reset_url: String,
}

/// Test double that records outgoing reset mail instead of dispatching it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentReset>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentReset> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        self.sent.lock().expect("mailer lock").push(SentReset {
            to: to.to_string(),
            username: username.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}
