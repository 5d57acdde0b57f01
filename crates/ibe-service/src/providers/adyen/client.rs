//! Adyen API client implementation.

use async_trait::async_trait;
use reqwest::Client;

use ibe_core::{
    filter_payment_methods, Metadata, PaymentConfirmation, PaymentError, PaymentIntent,
    PaymentRequest, PaymentState, PaymentStatus, ProviderName, WebhookOutcome,
};

use super::types::{
    AdyenErrorResponse, Amount, CreateSession, NotificationRequest, NotificationRequestItem,
    Session,
};
use crate::config::AdyenConfig;
use crate::crypto::{adyen_hmac_base64, constant_time_eq};
use crate::providers::{decode_json, parse_payload, transport_error, PaymentProvider};

const PROVIDER: ProviderName = ProviderName::Adyen;

/// Adyen adapter over Checkout API v71 sessions.
#[derive(Debug, Clone)]
pub struct AdyenProvider {
    client: Client,
    config: AdyenConfig,
    base_url: String,
    site_url: String,
}

impl AdyenProvider {
    /// Create a new Adyen adapter.
    #[must_use]
    pub fn new(config: AdyenConfig, client: Client, site_url: impl Into<String>) -> Self {
        let base_url = config.checkout_base();
        Self {
            client,
            config,
            base_url,
            site_url: site_url.into(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), PaymentError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| PaymentError::Configuration("ADYEN_API_KEY is not configured".into()))?;
        let merchant = self.config.merchant_account.as_deref().ok_or_else(|| {
            PaymentError::Configuration("ADYEN_MERCHANT_ACCOUNT is not configured".into())
        })?;
        Ok((api_key, merchant))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    /// Handle API response and convert errors.
    async fn handle_response(
        response: reqwest::Response,
    ) -> Result<(Session, serde_json::Value), PaymentError> {
        let status = response.status();

        if status.is_success() {
            let raw: serde_json::Value = decode_json(PROVIDER, response).await?;
            let session = serde_json::from_value(raw.clone()).map_err(|e| {
                PaymentError::Transport {
                    provider: PROVIDER,
                    message: format!("unexpected session shape: {e}"),
                }
            })?;
            return Ok((session, raw));
        }

        let message = response
            .json::<AdyenErrorResponse>()
            .await
            .ok()
            .and_then(|e| e.message.or(e.error_code))
            .unwrap_or_else(|| format!("HTTP {status}"));

        Err(PaymentError::ProviderApi {
            provider: PROVIDER,
            status: Some(status.as_u16()),
            message,
        })
    }

    fn verify_item(&self, item: &NotificationRequestItem) -> Result<(), PaymentError> {
        let Some(key) = self.config.webhook_hmac_key.as_deref() else {
            tracing::warn!("Adyen HMAC key not configured - skipping signature verification");
            return Ok(());
        };

        let signature = item
            .additional("hmacSignature")
            .ok_or_else(|| PaymentError::InvalidSignature("missing hmacSignature".into()))?;
        let expected = adyen_hmac_base64(key, &item.signing_string())?;

        if constant_time_eq(&expected, signature) {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature("signature mismatch".into()))
        }
    }
}

/// Map an Adyen session status to the shared state.
fn state_of(status: &str) -> PaymentState {
    match status {
        "completed" => PaymentState::Succeeded,
        "refused" | "canceled" | "expired" => PaymentState::Failed,
        _ => PaymentState::Pending,
    }
}

/// Adyen metadata values must be strings.
fn string_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), serde_json::Value::String(value))
        })
        .collect()
}

#[async_trait]
impl PaymentProvider for AdyenProvider {
    fn name(&self) -> ProviderName {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.merchant_account.is_some()
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let (api_key, merchant) = self.credentials()?;
        let reference = request
            .metadata
            .get("bookingReference")
            .and_then(|v| v.as_str())
            .map_or_else(
                || format!("BOOKING-{}", chrono::Utc::now().timestamp_millis()),
                String::from,
            );

        let body = CreateSession {
            amount: Amount {
                currency: request.currency.clone(),
                value: request.amount_minor,
            },
            reference: reference.clone(),
            return_url: format!("{}/booking-confirmation?payment_provider=adyen", self.site_url),
            merchant_account: merchant.to_string(),
            allowed_payment_methods: filter_payment_methods(
                &request.payment_methods,
                self.supported_methods(),
            ),
            country_code: "DE".into(),
            metadata: string_metadata(&request.metadata),
        };

        tracing::info!(
            amount_minor = %request.amount_minor,
            reference = %reference,
            "Creating Adyen session"
        );

        let response = self
            .client
            .post(self.url("sessions"))
            .header("X-API-Key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        let (session, _raw) = Self::handle_response(response).await?;

        tracing::info!(payment_id = %session.id, "Adyen session created");

        let mut provider_specific = Metadata::new();
        provider_specific.insert("session_id".into(), session.id.clone().into());
        provider_specific.insert("reference".into(), reference.into());
        if let Some(expires_at) = &session.expires_at {
            provider_specific.insert("expires_at".into(), expires_at.clone().into());
        }

        Ok(PaymentIntent {
            id: session.id,
            client_token: session.session_data,
            status: "pending".into(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            provider_specific,
        })
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<PaymentConfirmation, PaymentError> {
        // Sessions complete in the browser; there is no server-side confirm step
        let status = self.get_payment_status(payment_id).await?;

        Ok(PaymentConfirmation {
            success: status.paid,
            message: if status.paid {
                "Payment confirmed".into()
            } else {
                "Payment not confirmed".into()
            },
            status: status.status,
            payment_id: payment_id.to_string(),
            raw: status.raw,
        })
    }

    async fn get_payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError> {
        let (api_key, _) = self.credentials()?;

        let response = self
            .client
            .get(self.url(&format!("sessions/{payment_id}")))
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        let (session, raw) = Self::handle_response(response).await?;
        let status = session.status.unwrap_or_else(|| "active".into());
        let state = state_of(&status);
        let (amount_minor, currency) = session
            .amount
            .map_or((0, String::new()), |a| (a.value, a.currency));

        Ok(PaymentStatus {
            paid: state == PaymentState::Succeeded,
            state,
            status,
            amount_minor,
            currency: currency.to_ascii_uppercase(),
            payment_method: None,
            metadata: raw.get("metadata").cloned().unwrap_or_default(),
            raw,
        })
    }

    async fn handle_webhook(
        &self,
        payload: &str,
        _signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        let request: NotificationRequest = parse_payload(payload)?;
        let raw: serde_json::Value = parse_payload(payload)?;

        let items: Vec<NotificationRequestItem> = request
            .notification_items
            .into_iter()
            .map(|n| n.item)
            .collect();

        // One forged item rejects the whole delivery
        for item in &items {
            self.verify_item(item)?;
        }

        let mut outcomes = items.iter().enumerate().map(|(index, item)| {
            let item_raw = raw
                .pointer(&format!("/notificationItems/{index}/NotificationRequestItem"))
                .cloned()
                .unwrap_or_default();
            item_outcome(item, item_raw)
        });

        let primary = outcomes
            .next()
            .ok_or_else(|| PaymentError::InvalidPayload("no notification items".into()))?;
        let batch: Vec<WebhookOutcome> = outcomes.collect();

        if !batch.is_empty() {
            tracing::info!(items = batch.len() + 1, "Received batched Adyen notifications");
        }

        Ok(primary.with_batch(batch))
    }
}

/// Interpret one notification item.
fn item_outcome(item: &NotificationRequestItem, raw: serde_json::Value) -> WebhookOutcome {
    let payment_id = item
        .additional("checkoutSessionId")
        .map_or_else(|| item.merchant_reference.clone(), String::from);
    let event_id = format!("{}:{}:{}", item.psp_reference, item.event_code, item.success);

    tracing::info!(
        event_code = %item.event_code,
        psp_reference = %item.psp_reference,
        success = %item.success,
        "Received Adyen notification"
    );

    let outcome = match item.event_code.as_str() {
        "AUTHORISATION" if item.is_success() => {
            WebhookOutcome::succeeded(item.event_code.clone(), Some(payment_id), raw)
        }
        "AUTHORISATION" => WebhookOutcome::failed(item.event_code.clone(), Some(payment_id), raw),
        _ => WebhookOutcome::processed(item.event_code.clone(), Some(payment_id), raw),
    };

    outcome.with_event_id(Some(event_id))
}
