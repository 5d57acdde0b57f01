//! `SumUp` API types.

use serde::{Deserialize, Serialize};

/// Body of `POST /checkouts`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckout {
    /// Amount in currency units.
    pub amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant-side reference, unique per checkout.
    pub checkout_reference: String,
    /// Merchant account receiving the funds.
    pub pay_to_email: String,
    /// Shown to the guest.
    pub description: String,
    /// Server-to-server status callback.
    pub return_url: String,
    /// Where the guest's browser goes after paying.
    pub redirect_url: String,
}

/// `SumUp` checkout object.
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    /// Checkout ID.
    pub id: String,
    /// Merchant-side reference.
    #[serde(default)]
    pub checkout_reference: Option<String>,
    /// Amount in currency units.
    #[serde(default)]
    pub amount: f64,
    /// ISO currency code.
    #[serde(default)]
    pub currency: String,
    /// PENDING, PAID, FAILED or EXPIRED.
    #[serde(default)]
    pub status: String,
    /// Merchant code.
    #[serde(default)]
    pub merchant_code: Option<String>,
    /// Creation date.
    #[serde(default)]
    pub date: Option<String>,
    /// Links, including the hosted payment page.
    #[serde(default)]
    pub links: Option<CheckoutLinks>,
    /// Hosted checkout URL, when hosted checkout is enabled.
    #[serde(default)]
    pub hosted_checkout_url: Option<String>,
    /// Transactions attempted against the checkout.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Checkout {
    /// URL of the page the guest pays on, if any.
    #[must_use]
    pub fn payment_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.payment_url.as_deref())
            .or(self.hosted_checkout_url.as_deref())
    }
}

/// Links attached to a checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLinks {
    /// Hosted payment page.
    #[serde(default)]
    pub payment_url: Option<String>,
}

/// Transaction attempted against a checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Payment type (e.g., "ECOM").
    #[serde(default)]
    pub payment_type: Option<String>,
}

/// Inbound `SumUp` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Event type.
    pub event_type: String,
    /// Notification id, when the sender supplies one.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Checkout the event refers to.
    #[serde(default)]
    pub checkout_id: Option<String>,
    /// Checkout id in the short form.
    #[serde(default)]
    pub id: Option<String>,
    /// Top-level status, on status-change notifications.
    #[serde(default)]
    pub status: Option<String>,
    /// Nested payload, on status-change notifications.
    #[serde(default)]
    pub payload: Option<WebhookInner>,
}

/// Nested part of a status-change notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInner {
    /// Checkout the event refers to.
    #[serde(default)]
    pub checkout_id: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookPayload {
    /// Checkout id from whichever field carries it.
    #[must_use]
    pub fn checkout_id(&self) -> Option<String> {
        self.checkout_id
            .clone()
            .or_else(|| self.payload.as_ref().and_then(|p| p.checkout_id.clone()))
            .or_else(|| self.id.clone())
    }

    /// Reported status from whichever field carries it.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.status.as_deref())
            .or(self.status.as_deref())
    }
}

/// `SumUp` API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct SumUpErrorResponse {
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error code.
    #[serde(default)]
    pub error_code: Option<String>,
}
