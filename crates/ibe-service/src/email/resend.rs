//! Resend HTTP API mailer.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{EmailError, EmailMessage, Mailer};
use crate::config::EmailConfig;

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Mailer backed by `POST /emails` on the Resend API.
pub struct ResendMailer {
    client: Client,
    config: EmailConfig,
}

impl ResendMailer {
    /// Create a new Resend mailer.
    #[must_use]
    pub fn new(config: EmailConfig, client: Client) -> Self {
        if config.resend_api_key.is_none() {
            tracing::warn!("Resend API key not configured - confirmation emails will not be sent");
        }
        Self { client, config }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let api_key = self
            .config
            .resend_api_key
            .as_deref()
            .ok_or_else(|| EmailError::NotConfigured("RESEND_API_KEY is not set".into()))?;

        let body = SendEmail {
            from: &self.config.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.config.api_base.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(subject = %message.subject, "Email sent via Resend");
        Ok(())
    }
}
