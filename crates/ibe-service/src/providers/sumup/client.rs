//! `SumUp` API client implementation.

use async_trait::async_trait;
use reqwest::Client;

use ibe_core::{
    from_minor_units, to_minor_units, PaymentConfirmation, PaymentError, PaymentIntent,
    PaymentRequest, PaymentState, PaymentStatus, ProviderName, WebhookOutcome,
};

use super::types::{Checkout, CreateCheckout, SumUpErrorResponse, WebhookPayload};
use crate::config::SumUpConfig;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::providers::{decode_json, parse_payload, transport_error, PaymentProvider};

const PROVIDER: ProviderName = ProviderName::SumUp;

/// `SumUp` adapter over the checkouts API.
#[derive(Debug, Clone)]
pub struct SumUpProvider {
    client: Client,
    config: SumUpConfig,
    site_url: String,
    merchant_name: String,
}

impl SumUpProvider {
    /// Create a new `SumUp` adapter.
    ///
    /// `site_url` is the public origin used for return and redirect URLs.
    #[must_use]
    pub fn new(
        config: SumUpConfig,
        client: Client,
        site_url: impl Into<String>,
        merchant_name: impl Into<String>,
    ) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("SumUp API key is not configured");
        }
        if config.merchant_email.is_none() {
            tracing::warn!("SumUp merchant email is not configured");
        }
        Self {
            client,
            config,
            site_url: site_url.into(),
            merchant_name: merchant_name.into(),
        }
    }

    fn api_key(&self) -> Result<&str, PaymentError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| PaymentError::Configuration("SUMUP_API_KEY is not configured".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Fetch a checkout, returning the typed object and the raw JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration, transport or API error.
    pub async fn get_checkout(
        &self,
        checkout_id: &str,
    ) -> Result<(Checkout, serde_json::Value), PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("checkouts/{checkout_id}")))
            .bearer_auth(self.api_key()?)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response(
        response: reqwest::Response,
    ) -> Result<(Checkout, serde_json::Value), PaymentError> {
        let status = response.status();

        if status.is_success() {
            let raw: serde_json::Value = decode_json(PROVIDER, response).await?;
            let checkout = serde_json::from_value(raw.clone()).map_err(|e| {
                PaymentError::Transport {
                    provider: PROVIDER,
                    message: format!("unexpected checkout shape: {e}"),
                }
            })?;
            return Ok((checkout, raw));
        }

        let message = response
            .json::<SumUpErrorResponse>()
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

    fn verify_signature(&self, payload: &str, signature: Option<&str>) -> Result<(), PaymentError> {
        let Some(secret) = self.config.webhook_secret.as_deref() else {
            tracing::warn!("SumUp webhook secret not configured - skipping signature verification");
            return Ok(());
        };

        let signature = signature
            .ok_or_else(|| PaymentError::InvalidSignature("missing SumUp signature".into()))?;
        let expected = hmac_sha256_hex(secret, payload);

        if constant_time_eq(&expected, signature.trim()) {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature("signature mismatch".into()))
        }
    }
}

/// Map a `SumUp` checkout status to the shared state.
fn state_of(status: &str) -> PaymentState {
    match status {
        "PAID" => PaymentState::Succeeded,
        "FAILED" | "EXPIRED" => PaymentState::Failed,
        _ => PaymentState::Pending,
    }
}

/// Checkout amounts are always positive; anything else reads as zero.
fn checkout_minor_units(amount: f64) -> i64 {
    to_minor_units(amount).unwrap_or(0)
}

#[async_trait]
impl PaymentProvider for SumUpProvider {
    fn name(&self) -> ProviderName {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.merchant_email.is_some()
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let api_key = self.api_key()?;
        let merchant_email = self.config.merchant_email.clone().ok_or_else(|| {
            PaymentError::Configuration("SUMUP_MERCHANT_EMAIL is not configured".into())
        })?;

        let checkout_reference = request
            .metadata
            .get("bookingReference")
            .and_then(|v| v.as_str())
            .map_or_else(
                || format!("BOOKING-{}", chrono::Utc::now().timestamp_millis()),
                String::from,
            );

        let body = CreateCheckout {
            amount: from_minor_units(request.amount_minor),
            currency: request.currency.clone(),
            checkout_reference: checkout_reference.clone(),
            pay_to_email: merchant_email,
            description: format!("{} Booking {checkout_reference}", self.merchant_name),
            return_url: format!("{}/v1/webhooks/sumup", self.site_url),
            redirect_url: format!("{}/v1/sumup/return", self.site_url),
        };

        tracing::info!(
            amount_minor = %request.amount_minor,
            checkout_reference = %checkout_reference,
            "Creating SumUp checkout"
        );

        let response = self
            .client
            .post(self.url("checkouts"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        let (checkout, _raw) = Self::handle_response(response).await?;

        tracing::info!(payment_id = %checkout.id, "SumUp checkout created");

        let mut provider_specific = ibe_core::Metadata::new();
        provider_specific.insert("checkout_id".into(), checkout.id.clone().into());
        provider_specific.insert("checkout_reference".into(), checkout_reference.into());
        if let Some(url) = checkout.payment_url() {
            provider_specific.insert("checkout_url".into(), url.into());
            provider_specific.insert("payment_url".into(), url.into());
        }
        if let Some(code) = &checkout.merchant_code {
            provider_specific.insert("merchant_code".into(), code.clone().into());
        }
        if let Some(date) = &checkout.date {
            provider_specific.insert("date".into(), date.clone().into());
        }
        provider_specific.insert("status".into(), checkout.status.clone().into());

        Ok(PaymentIntent {
            // SumUp has no client secret; the checkout id plays that role
            client_token: Some(checkout.id.clone()),
            id: checkout.id,
            status: "pending".into(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            provider_specific,
        })
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<PaymentConfirmation, PaymentError> {
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
        let (checkout, raw) = self.get_checkout(payment_id).await?;
        let state = state_of(&checkout.status);

        Ok(PaymentStatus {
            paid: state == PaymentState::Succeeded,
            state,
            amount_minor: checkout_minor_units(checkout.amount),
            currency: checkout.currency.to_ascii_uppercase(),
            payment_method: checkout
                .transactions
                .iter()
                .find_map(|t| t.payment_type.clone()),
            metadata: raw.get("metadata").cloned().unwrap_or_default(),
            status: checkout.status,
            raw,
        })
    }

    async fn handle_webhook(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        self.verify_signature(payload, signature)?;

        let raw: serde_json::Value = parse_payload(payload)?;
        if raw.get("event_type").is_none() {
            return Err(PaymentError::InvalidPayload(
                "SumUp notification without event_type".into(),
            ));
        }
        let event: WebhookPayload = parse_payload(payload)?;
        let payment_id = event.checkout_id();
        let reported = event.status().map(String::from);

        tracing::info!(
            event_type = %event.event_type,
            payment_id = ?payment_id,
            status = ?reported,
            "Received SumUp webhook"
        );

        // SumUp sends no event id; a notification is identified by what it reports
        let event_id = event.event_id.clone().or_else(|| {
            payment_id.as_ref().map(|id| {
                format!(
                    "{}:{id}:{}",
                    event.event_type,
                    reported.as_deref().unwrap_or("-")
                )
            })
        });

        let outcome = match event.event_type.as_str() {
            "PAYMENT_COMPLETE" => WebhookOutcome::succeeded(event.event_type, payment_id, raw),
            "PAYMENT_FAILED" => WebhookOutcome::failed(event.event_type, payment_id, raw),
            t if t.ends_with("_STATUS_CHANGED") => match reported.as_deref().map(state_of) {
                Some(PaymentState::Succeeded) => {
                    WebhookOutcome::succeeded(event.event_type, payment_id, raw)
                }
                Some(PaymentState::Failed) => {
                    WebhookOutcome::failed(event.event_type, payment_id, raw)
                }
                _ => WebhookOutcome::processed(event.event_type, payment_id, raw),
            },
            _ => WebhookOutcome::processed(event.event_type, payment_id, raw),
        };

        Ok(outcome.with_event_id(event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(secret: Option<&str>) -> SumUpProvider {
        let config = SumUpConfig {
            api_key: Some("sup_sk_test".into()),
            merchant_email: Some("merchant@example.com".into()),
            webhook_secret: secret.map(String::from),
            api_base: "http://127.0.0.1:1".into(),
        };
        SumUpProvider::new(config, Client::new(), "https://hotel.example", "Hotel Stern")
    }

    #[test]
    fn sumup_states() {
        assert_eq!(state_of("PAID"), PaymentState::Succeeded);
        assert_eq!(state_of("EXPIRED"), PaymentState::Failed);
        assert_eq!(state_of("PENDING"), PaymentState::Pending);
    }

    #[tokio::test]
    async fn payment_complete_maps_to_succeeded() {
        let outcome = provider(None)
            .handle_webhook(r#"{"event_type":"PAYMENT_COMPLETE","checkout_id":"chk_1"}"#, None)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.state, Some(PaymentState::Succeeded));
        assert_eq!(outcome.payment_id.as_deref(), Some("chk_1"));
        assert!(outcome.event_id.is_some());
    }

    #[tokio::test]
    async fn status_changed_reads_nested_status() {
        let body = r#"{"event_type":"PAYMENT_STATUS_CHANGED","payload":{"checkout_id":"chk_2","status":"FAILED"}}"#;
        let outcome = provider(None).handle_webhook(body, None).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, "failed");
        assert_eq!(outcome.payment_id.as_deref(), Some("chk_2"));
    }

    #[tokio::test]
    async fn payload_without_event_type_is_rejected() {
        let result = provider(None).handle_webhook(r#"{"id":"chk_3"}"#, None).await;
        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn configured_secret_is_enforced() {
        let body = r#"{"event_type":"PAYMENT_COMPLETE","checkout_id":"chk_4"}"#;
        let sumup = provider(Some("hook-secret"));

        assert!(matches!(
            sumup.handle_webhook(body, None).await,
            Err(PaymentError::InvalidSignature(_))
        ));
        assert!(matches!(
            sumup.handle_webhook(body, Some("deadbeef")).await,
            Err(PaymentError::InvalidSignature(_))
        ));

        let signature = hmac_sha256_hex("hook-secret", body);
        let outcome = sumup.handle_webhook(body, Some(&signature)).await.unwrap();
        assert_eq!(outcome.state, Some(PaymentState::Succeeded));
    }
}
