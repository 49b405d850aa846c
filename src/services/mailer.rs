// src/services/mailer.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{config::Config, error::AppError};

/// A plain-text message to a single recipient.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound e-mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError>;
}

/// Hands messages to an HTTP mail relay as JSON.
pub struct HttpMailer {
    client: Client,
    relay_url: String,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(relay_url: String, from: String) -> Self {
        Self {
            client: Client::new(),
            relay_url,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &mail.to,
            subject: &mail.subject,
            text: &mail.body,
        };

        let resp = self
            .client
            .post(&self.relay_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("Mail relay unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(AppError::InternalServerError(format!(
                "Mail relay answered {}",
                resp.status()
            )));
        }

        Ok(())
    }
}

/// Used when no relay is configured. Only the envelope is logged, never the body.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "No mail relay configured, message dropped");
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.mail_relay_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_from.clone())),
        None => Arc::new(LogMailer),
    }
}

/// Sends on a background task. Failures are logged and otherwise ignored.
pub fn send_in_background(mailer: Arc<dyn Mailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        match mailer.send(&mail).await {
            Ok(()) => tracing::info!(to = %mail.to, "Mail sent"),
            Err(e) => tracing::warn!(to = %mail.to, "Failed to send mail: {}", e),
        }
    });
}
