//! Payment provider webhook handlers.
//!
//! One endpoint serves every provider. The provider comes from the path, a
//! `provider` query parameter, or the signature header the request carries,
//! in that order, and defaults to the active provider.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ibe_core::{PaymentRecord, PaymentRef, ProcessedEvent, ProviderName, WebhookOutcome};
use ibe_store::StoreError;

use crate::error::ApiError;
use crate::state::AppState;

/// Signature headers in lookup order, with the provider each one implies.
const SIGNATURE_HEADERS: &[(&str, Option<ProviderName>)] = &[
    ("stripe-signature", Some(ProviderName::Stripe)),
    ("x-sumup-signature", Some(ProviderName::SumUp)),
    ("x-webhook-signature", None),
    ("x-signature", None),
];

/// Query parameters accepted on webhook deliveries.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    /// Provider override.
    pub provider: Option<String>,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `false` when the event reports a failed payment.
    pub success: bool,
    /// Summary.
    pub message: String,
    /// Provider event type.
    pub event_type: Option<String>,
}

// =============================================================================
// Event Delivery
// =============================================================================

/// Receive a webhook; the provider comes from the query or the headers.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    process(&state, query.provider, &headers, &body).await
}

/// Receive a webhook for the provider named in the path.
pub async fn receive_provider_webhook(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    process(&state, Some(provider), &headers, &body).await
}

async fn process(
    state: &AppState,
    provider: Option<String>,
    headers: &HeaderMap,
    body: &str,
) -> Result<Json<WebhookResponse>, ApiError> {
    let (signature, implied) = signature_header(headers);
    let provider = provider.or_else(|| implied.map(|p| p.as_str().to_string()));

    let (provider, outcome) = state
        .payments
        .handle_webhook(body, signature, provider.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook rejected");
            ApiError::from(e)
        })?;

    tracing::info!(
        provider = %provider,
        event = ?outcome.event,
        payment_id = ?outcome.payment_id,
        status = %outcome.status,
        "Webhook received"
    );

    for item in &outcome.batch {
        let applied = apply(state, provider, item)?;
        tracing::info!(
            provider = %provider,
            event = ?item.event,
            payment_id = ?item.payment_id,
            status = %item.status,
            result = applied.as_str(),
            "Batched webhook item applied"
        );
    }

    let message = match apply(state, provider, &outcome)? {
        Applied::Duplicate => {
            return Ok(Json(WebhookResponse {
                success: true,
                message: "Duplicate event ignored".into(),
                event_type: outcome.event,
            }));
        }
        Applied::AlreadyFinal => "Payment already final, event ignored".to_string(),
        Applied::Recorded | Applied::NoStateChange => outcome.message,
    };

    Ok(Json(WebhookResponse {
        success: outcome.success,
        message,
        event_type: outcome.event,
    }))
}

/// What persisting an outcome did.
enum Applied {
    Recorded,
    AlreadyFinal,
    NoStateChange,
    Duplicate,
}

impl Applied {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::AlreadyFinal => "already_final",
            Self::NoStateChange => "no_state_change",
            Self::Duplicate => "duplicate",
        }
    }
}

fn apply(
    state: &AppState,
    provider: ProviderName,
    outcome: &WebhookOutcome,
) -> Result<Applied, ApiError> {
    let now = Utc::now();
    let record = outcome
        .state
        .zip(outcome.payment_id.clone())
        .map(|(payment_state, payment_id)| PaymentRecord {
            payment: PaymentRef {
                provider,
                payment_id,
            },
            state: payment_state,
            status: outcome.status.clone(),
            last_event: outcome.event.clone(),
            updated_at: now,
        });

    let Some(event_id) = outcome.event_id.clone() else {
        let Some(record) = record else {
            return Ok(Applied::NoStateChange);
        };
        if let Some(existing) = state.store.get_payment_record(&record.payment)? {
            if existing.state.is_terminal() {
                return Ok(Applied::AlreadyFinal);
            }
        }
        state.store.put_payment_record(&record)?;
        return Ok(Applied::Recorded);
    };

    let event = ProcessedEvent {
        provider,
        event_id,
        payment_id: outcome.payment_id.clone(),
        received_at: now,
    };

    match state.store.record_webhook(&event, record.as_ref()) {
        Ok(true) => Ok(Applied::Recorded),
        Ok(false) if record.is_some() => {
            tracing::info!(
                provider = %provider,
                payment_id = ?event.payment_id,
                "Payment already final, event ignored"
            );
            Ok(Applied::AlreadyFinal)
        }
        Ok(false) => Ok(Applied::NoStateChange),
        Err(StoreError::DuplicateEvent { event_id }) => {
            tracing::info!(provider = %provider, event_id = %event_id, "Duplicate webhook event");
            Ok(Applied::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

fn signature_header(headers: &HeaderMap) -> (Option<&str>, Option<ProviderName>) {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|(name, provider)| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(|sig| (Some(sig), *provider))
        })
        .unwrap_or((None, None))
}

// =============================================================================
// Verification Challenge
// =============================================================================

/// Query parameters providers send when registering a webhook URL.
const CHALLENGE_PARAMS: &[&str] = &["hub_challenge", "hub.challenge", "verification", "challenge"];

/// Answer a registration challenge by echoing it, or report the endpoint live.
pub async fn webhook_challenge(Query(params): Query<HashMap<String, String>>) -> Response {
    if let Some(challenge) = CHALLENGE_PARAMS.iter().find_map(|p| params.get(*p)) {
        tracing::info!("Answering webhook verification challenge");
        return challenge.clone().into_response();
    }

    Json(serde_json::json!({
        "success": true,
        "message": "Webhook endpoint is active",
    }))
    .into_response()
}

/// Challenge for a provider-specific webhook URL.
pub async fn provider_webhook_challenge(
    Path(_provider): Path<String>,
    query: Query<HashMap<String, String>>,
) -> Response {
    webhook_challenge(query).await
}
