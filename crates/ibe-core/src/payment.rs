//! Provider-neutral payment types.
//!
//! Every provider adapter translates its own wire objects into these types so
//! the booking flow and the webhook receiver never see provider-specific JSON
//! except through the `raw` fields.

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;
use crate::provider::ProviderName;

/// Open key/value mapping attached to payments.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Normalised payment state shared by all providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Still waiting for the guest or the provider.
    Pending,
    /// Money has been collected.
    Succeeded,
    /// Payment failed, expired or was cancelled.
    Failed,
}

impl PaymentState {
    /// Whether no further transition is expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A provider-side pending payment (Stripe `PaymentIntent`, `SumUp` checkout,
/// Adyen session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-native identifier.
    pub id: String,
    /// Opaque value the client uses to complete the payment.
    pub client_token: Option<String>,
    /// Provider-native status string.
    pub status: String,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO currency code, upper case.
    pub currency: String,
    /// Fields without a cross-provider equivalent (checkout URL, merchant code, ...).
    pub provider_specific: Metadata,
}

/// Result of reading a payment's status from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Provider-native status string.
    pub status: String,
    /// Normalised state.
    pub state: PaymentState,
    /// Whether the payment has been collected.
    pub paid: bool,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO currency code, upper case.
    pub currency: String,
    /// Payment method used, when the provider reports one.
    pub payment_method: Option<String>,
    /// Metadata stored with the payment.
    pub metadata: serde_json::Value,
    /// Raw provider response.
    pub raw: serde_json::Value,
}

/// Result of an explicit confirmation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Whether the payment is now collected.
    pub success: bool,
    /// Provider-native status string.
    pub status: String,
    /// Human-readable summary.
    pub message: String,
    /// The payment that was confirmed.
    pub payment_id: String,
    /// Raw provider response.
    pub raw: serde_json::Value,
}

/// Outcome of processing one inbound provider notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookOutcome {
    /// `false` when the notification reports a failed payment.
    pub success: bool,
    /// Normalised state the notification implies, if any.
    pub state: Option<PaymentState>,
    /// `"succeeded"`, `"failed"` or `"processed"`.
    pub status: String,
    /// Human-readable summary.
    pub message: String,
    /// Provider event type.
    pub event: Option<String>,
    /// Payment the event refers to.
    pub payment_id: Option<String>,
    /// Provider-unique event identifier used for deduplication.
    pub event_id: Option<String>,
    /// Raw notification payload.
    pub raw: serde_json::Value,
    /// Further notifications delivered in the same request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batch: Vec<WebhookOutcome>,
}

impl WebhookOutcome {
    /// Notification reporting a collected payment.
    #[must_use]
    pub fn succeeded(event: String, payment_id: Option<String>, raw: serde_json::Value) -> Self {
        Self {
            success: true,
            state: Some(PaymentState::Succeeded),
            status: "succeeded".into(),
            message: "Payment succeeded".into(),
            event: Some(event),
            payment_id,
            event_id: None,
            raw,
            batch: Vec::new(),
        }
    }

    /// Notification reporting a failed payment.
    #[must_use]
    pub fn failed(event: String, payment_id: Option<String>, raw: serde_json::Value) -> Self {
        Self {
            success: false,
            state: Some(PaymentState::Failed),
            status: "failed".into(),
            message: "Payment failed".into(),
            event: Some(event),
            payment_id,
            event_id: None,
            raw,
            batch: Vec::new(),
        }
    }

    /// Any other notification; acknowledged without a state change.
    #[must_use]
    pub fn processed(event: String, payment_id: Option<String>, raw: serde_json::Value) -> Self {
        Self {
            success: true,
            state: None,
            status: "processed".into(),
            message: format!("Processed {event} event"),
            event: Some(event),
            payment_id,
            event_id: None,
            raw,
            batch: Vec::new(),
        }
    }

    /// Attach the provider's event identifier.
    #[must_use]
    pub fn with_event_id(mut self, event_id: Option<String>) -> Self {
        self.event_id = event_id;
        self
    }

    /// Attach the other notifications of a batched delivery.
    #[must_use]
    pub fn with_batch(mut self, batch: Vec<WebhookOutcome>) -> Self {
        self.batch = batch;
        self
    }
}

/// A payment request already validated and converted to minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Amount in minor currency units, always positive.
    pub amount_minor: i64,
    /// ISO currency code, upper case.
    pub currency: String,
    /// Requested payment method identifiers (unfiltered).
    pub payment_methods: Vec<String>,
    /// Metadata forwarded to the provider.
    pub metadata: Metadata,
}

/// Narrow requested methods to the provider's supported set.
///
/// An empty intersection falls back to the full supported set instead of
/// failing.
#[must_use]
pub fn filter_payment_methods(requested: &[String], supported: &[&str]) -> Vec<String> {
    let filtered: Vec<String> = requested
        .iter()
        .filter(|m| supported.contains(&m.as_str()))
        .cloned()
        .collect();

    if filtered.is_empty() {
        supported.iter().map(|m| (*m).to_string()).collect()
    } else {
        filtered
    }
}

/// Convert a decimal amount in currency units to minor units.
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` for non-finite, zero, negative or
/// out-of-range amounts.
#[allow(clippy::cast_possible_truncation)]
pub fn to_minor_units(amount: f64) -> Result<i64, PaymentError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::InvalidAmount(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    let minor = (amount * 100.0).round();
    if minor < 1.0 || minor > 1e15 {
        return Err(PaymentError::InvalidAmount(format!(
            "amount out of range: {amount}"
        )));
    }
    Ok(minor as i64)
}

/// Convert minor units back to a decimal amount for display and JSON.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Provider name plus identifier, the key under which payments are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentRef {
    /// Provider that owns the payment.
    pub provider: ProviderName,
    /// Provider-native identifier.
    pub payment_id: String,
}

/// Last known state of a payment, as reported by webhooks or status reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Provider and payment id.
    pub payment: PaymentRef,
    /// Normalised state.
    pub state: PaymentState,
    /// Provider-native status string.
    pub status: String,
    /// Event that caused the last update, if any.
    pub last_event: Option<String>,
    /// When the record was last written.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A webhook event that has been processed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// Provider that sent the event.
    pub provider: ProviderName,
    /// Provider-unique event identifier.
    pub event_id: String,
    /// Payment the event referred to.
    pub payment_id: Option<String>,
    /// When the event was first processed.
    pub received_at: chrono::DateTime<chrono::Utc>,
}
