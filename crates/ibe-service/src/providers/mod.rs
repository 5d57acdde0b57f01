//! Payment provider adapters.
//!
//! Each adapter translates the provider-neutral contract below into one
//! provider's wire protocol. Adapters hold configuration and a shared HTTP
//! client only, so one instance can serve every request.

pub mod adyen;
pub mod stripe;
pub mod sumup;

use std::time::Duration;

use async_trait::async_trait;
use ibe_core::{
    PaymentConfirmation, PaymentError, PaymentIntent, PaymentRequest, PaymentStatus, ProviderName,
    WebhookOutcome,
};

pub use adyen::AdyenProvider;
pub use stripe::StripeProvider;
pub use sumup::SumUpProvider;

/// Timeout applied to every outbound provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Uniform payment contract implemented by every provider adapter.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Which provider this adapter talks to.
    fn name(&self) -> ProviderName;

    /// Whether the credentials needed for API calls are present.
    fn is_configured(&self) -> bool;

    /// Payment method identifiers this provider accepts.
    fn supported_methods(&self) -> &'static [&'static str] {
        self.name().supported_methods()
    }

    /// Open a pending payment with the provider.
    ///
    /// Requested methods are narrowed to the supported set, falling back to
    /// the full set when nothing matches.
    async fn create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Run the provider's explicit confirmation step, or re-read the status
    /// when the provider has none.
    async fn confirm_payment(&self, payment_id: &str) -> Result<PaymentConfirmation, PaymentError>;

    /// Read the current payment status. Never changes provider state.
    async fn get_payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError>;

    /// Verify and interpret an inbound notification.
    async fn handle_webhook(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError>;
}

/// Build the shared HTTP client used by all adapters.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(PROVIDER_TIMEOUT).build()
}

/// Map a transport-level failure to `PaymentError::Transport`.
pub(crate) fn transport_error(provider: ProviderName, err: &reqwest::Error) -> PaymentError {
    PaymentError::Transport {
        provider,
        message: err.to_string(),
    }
}

/// Decode a JSON body, reporting undecodable responses as transport errors.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    provider: ProviderName,
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    response
        .json()
        .await
        .map_err(|e| transport_error(provider, &e))
}

/// Parse an inbound notification body.
pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(
    payload: &str,
) -> Result<T, PaymentError> {
    serde_json::from_str(payload).map_err(|e| PaymentError::InvalidPayload(e.to_string()))
}
