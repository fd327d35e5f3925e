// src/services/mailer.rs
use crate::config::SmtpConfig;
use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

/// Colaborador de envio de e-mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Envio via SMTP. Porta 465 usa TLS implícito; as restantes STARTTLS.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_mail(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST não configurado"))?;
        let sender = self
            .config
            .sender()
            .ok_or_else(|| anyhow::anyhow!("remetente SMTP não configurado"))?;

        let from: Mailbox = sender.parse()?;
        let to_mailbox: Mailbox = to.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;

        let builder = if self.config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        }
        .port(self.config.port);

        let builder = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        builder.build().send(email).await?;
        tracing::info!(to = %to, subject = %subject, "E-mail enviado");
        Ok(())
    }
}

/// Usado quando o SMTP não está configurado: regista e descarta.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        tracing::warn!(to = %to, subject = %subject, "SMTP não configurado; e-mail não enviado");
        Ok(())
    }
}

pub fn from_config(config: &SmtpConfig) -> Arc<dyn Mailer> {
    if config.is_configured() {
        Arc::new(SmtpMailer::new(config.clone()))
    } else {
        Arc::new(LogMailer)
    }
}
