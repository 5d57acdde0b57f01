//! Stripe API client implementation.

use async_trait::async_trait;
use reqwest::Client;

use ibe_core::{
    filter_payment_methods, Metadata, PaymentConfirmation, PaymentError, PaymentIntent,
    PaymentRequest, PaymentState, PaymentStatus, ProviderName, WebhookOutcome,
};

use super::types::{self, StripeErrorResponse, WebhookEvent};
use crate::config::StripeConfig;
use crate::crypto::verify_stripe_signature;
use crate::providers::{decode_json, parse_payload, transport_error, PaymentProvider};

const PROVIDER: ProviderName = ProviderName::Stripe;

/// Stripe adapter over the `PaymentIntents` API.
#[derive(Debug, Clone)]
pub struct StripeProvider {
    client: Client,
    config: StripeConfig,
}

impl StripeProvider {
    /// Create a new Stripe adapter.
    #[must_use]
    pub fn new(config: StripeConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str, PaymentError> {
        self.config
            .secret_key
            .as_deref()
            .ok_or_else(|| PaymentError::Configuration("STRIPE_SECRET_KEY is not configured".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Retrieve a payment intent, returning the typed object and the raw JSON.
    async fn retrieve(
        &self,
        payment_id: &str,
    ) -> Result<(types::PaymentIntent, serde_json::Value), PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("payment_intents/{payment_id}")))
            .basic_auth(self.api_key()?, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response(
        response: reqwest::Response,
    ) -> Result<(types::PaymentIntent, serde_json::Value), PaymentError> {
        let status = response.status();

        if status.is_success() {
            let raw: serde_json::Value = decode_json(PROVIDER, response).await?;
            let intent = serde_json::from_value(raw.clone()).map_err(|e| {
                PaymentError::Transport {
                    provider: PROVIDER,
                    message: format!("unexpected payment intent shape: {e}"),
                }
            })?;
            return Ok((intent, raw));
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;
        let message = match error_body {
            Ok(stripe_error) => {
                tracing::warn!(
                    error_type = %stripe_error.error.error_type,
                    code = ?stripe_error.error.code,
                    "Stripe API error"
                );
                stripe_error.error.message
            }
            Err(_) => format!("HTTP {status}"),
        };

        Err(PaymentError::ProviderApi {
            provider: PROVIDER,
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Map a Stripe status to the shared state.
fn state_of(status: &str) -> PaymentState {
    match status {
        "succeeded" => PaymentState::Succeeded,
        "canceled" => PaymentState::Failed,
        _ => PaymentState::Pending,
    }
}

/// Flatten metadata into Stripe's `metadata[key]` form fields.
fn metadata_params(metadata: &Metadata) -> Vec<(String, String)> {
    metadata
        .iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (format!("metadata[{key}]"), value)
        })
        .collect()
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> ProviderName {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.config.secret_key.is_some()
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let api_key = self.api_key()?;
        let methods = filter_payment_methods(&request.payment_methods, self.supported_methods());

        let mut params = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.to_ascii_lowercase()),
            (
                "payment_method_options[card][request_three_d_secure]".to_string(),
                "automatic".to_string(),
            ),
        ];
        for (i, method) in methods.iter().enumerate() {
            params.push((format!("payment_method_types[{i}]"), method.clone()));
        }
        if methods.iter().any(|m| m == "sofort") {
            params.push((
                "payment_method_options[sofort][preferred_language]".to_string(),
                "de".to_string(),
            ));
        }
        params.extend(metadata_params(&request.metadata));

        tracing::info!(
            amount_minor = %request.amount_minor,
            methods = ?methods,
            "Creating Stripe payment intent"
        );

        let response = self
            .client
            .post(self.url("payment_intents"))
            .basic_auth(api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        let (intent, _raw) = Self::handle_response(response).await?;

        tracing::info!(payment_id = %intent.id, status = %intent.status, "Stripe payment intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_token: intent.client_secret,
            status: intent.status,
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            provider_specific: Metadata::new(),
        })
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<PaymentConfirmation, PaymentError> {
        let (intent, raw) = self.retrieve(payment_id).await?;

        if intent.status == "requires_confirmation" {
            let response = self
                .client
                .post(self.url(&format!("payment_intents/{payment_id}/confirm")))
                .basic_auth(self.api_key()?, Option::<&str>::None)
                .send()
                .await
                .map_err(|e| transport_error(PROVIDER, &e))?;
            let (confirmed, raw) = Self::handle_response(response).await?;

            tracing::info!(payment_id = %payment_id, status = %confirmed.status, "Stripe payment confirmed");

            return Ok(PaymentConfirmation {
                success: true,
                status: confirmed.status,
                message: "Payment confirmed".into(),
                payment_id: payment_id.to_string(),
                raw,
            });
        }

        Ok(PaymentConfirmation {
            success: intent.status == "succeeded",
            message: format!("Payment is in {} state", intent.status),
            status: intent.status,
            payment_id: intent.id,
            raw,
        })
    }

    async fn get_payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError> {
        let (intent, raw) = self.retrieve(payment_id).await?;
        let state = state_of(&intent.status);

        Ok(PaymentStatus {
            paid: state == PaymentState::Succeeded,
            state,
            status: intent.status,
            amount_minor: intent.amount,
            currency: intent.currency.to_ascii_uppercase(),
            payment_method: intent.payment_method_types.into_iter().next(),
            metadata: intent.metadata,
            raw,
        })
    }

    async fn handle_webhook(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        let (Some(signature), Some(secret)) = (signature, self.config.webhook_secret.as_deref())
        else {
            return Err(PaymentError::InvalidSignature(
                "missing webhook signature or secret".into(),
            ));
        };

        verify_stripe_signature(payload, signature, secret, chrono::Utc::now().timestamp())?;

        let event: WebhookEvent = parse_payload(payload)?;
        let raw: serde_json::Value = parse_payload(payload)?;
        let payment_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from);

        tracing::info!(
            event_type = %event.event_type,
            event_id = %event.id,
            "Received Stripe webhook"
        );

        let outcome = match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                WebhookOutcome::succeeded(event.event_type, payment_id, raw)
            }
            "payment_intent.payment_failed" => {
                WebhookOutcome::failed(event.event_type, payment_id, raw)
            }
            _ => WebhookOutcome::processed(event.event_type, payment_id, raw),
        };

        Ok(outcome.with_event_id(Some(event.id)))
    }
}
