//! Adyen Checkout API v71 types.

use serde::{Deserialize, Serialize};

/// Amount in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    /// ISO currency code.
    pub currency: String,
    /// Value in minor units.
    pub value: i64,
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    /// Amount to authorise.
    pub amount: Amount,
    /// Merchant-side reference.
    pub reference: String,
    /// Where the shopper returns after redirect-based methods.
    pub return_url: String,
    /// Merchant account code.
    pub merchant_account: String,
    /// Payment method types offered to the shopper.
    pub allowed_payment_methods: Vec<String>,
    /// Shopper country.
    pub country_code: String,
    /// Free-form string metadata.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Session object returned by the sessions endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session ID.
    pub id: String,
    /// Opaque data the Drop-in needs.
    #[serde(default)]
    pub session_data: Option<String>,
    /// Session amount, when reported.
    #[serde(default)]
    pub amount: Option<Amount>,
    /// Merchant-side reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Expiry timestamp.
    #[serde(default)]
    pub expires_at: Option<String>,
    /// active, completed, paymentPending, refused, canceled or expired.
    #[serde(default)]
    pub status: Option<String>,
}

/// Standard notification webhook body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// "true" for live notifications.
    #[serde(default)]
    pub live: Option<String>,
    /// Notification items; usually exactly one.
    pub notification_items: Vec<NotificationItem>,
}

/// Wrapper around one notification.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationItem {
    /// The notification.
    #[serde(rename = "NotificationRequestItem")]
    pub item: NotificationRequestItem,
}

/// One notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequestItem {
    /// Extra fields, including `hmacSignature`.
    #[serde(default)]
    pub additional_data: serde_json::Map<String, serde_json::Value>,
    /// Amount concerned.
    pub amount: Amount,
    /// Event type (AUTHORISATION, CANCELLATION, ...).
    pub event_code: String,
    /// Merchant account code.
    #[serde(default)]
    pub merchant_account_code: String,
    /// Merchant-side reference.
    #[serde(default)]
    pub merchant_reference: String,
    /// Reference of the original payment, for modifications.
    #[serde(default)]
    pub original_reference: Option<String>,
    /// Adyen payment reference.
    pub psp_reference: String,
    /// "true" or "false".
    pub success: String,
}

impl NotificationRequestItem {
    /// Whether the notification reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.eq_ignore_ascii_case("true")
    }

    /// Value of an `additionalData` entry as a string.
    #[must_use]
    pub fn additional(&self, key: &str) -> Option<&str> {
        self.additional_data.get(key).and_then(|v| v.as_str())
    }

    /// Payload covered by the notification HMAC.
    #[must_use]
    pub fn signing_string(&self) -> String {
        [
            self.psp_reference.as_str(),
            self.original_reference.as_deref().unwrap_or(""),
            self.merchant_account_code.as_str(),
            self.merchant_reference.as_str(),
            &self.amount.value.to_string(),
            self.amount.currency.as_str(),
            self.event_code.as_str(),
            self.success.as_str(),
        ]
        .join(":")
    }
}

/// Adyen API error response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdyenErrorResponse {
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error code.
    #[serde(default)]
    pub error_code: Option<String>,
}
