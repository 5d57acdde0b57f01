//! Outbound email.

mod resend;
pub mod template;

use async_trait::async_trait;
use serde::Serialize;

pub use resend::ResendMailer;
pub use template::{confirmation_email, ConfirmationData};

/// Errors raised when sending email.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// No API key configured.
    #[error("email not configured: {0}")]
    NotConfigured(String),

    /// The email API rejected the message.
    #[error("email API error ({status}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// API message.
        message: String,
    },

    /// The email API could not be reached.
    #[error("email transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Plain-text body.
    pub text: String,
}

/// Sends email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
