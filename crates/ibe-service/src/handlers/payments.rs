//! Payment intent, confirmation and status handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ibe_core::{from_minor_units, Metadata, PaymentState};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Create Payment Intent
// =============================================================================

/// Create payment intent request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Amount in currency units (e.g. `129.00`).
    pub amount: f64,
    /// Requested payment methods; narrowed to what the provider supports.
    #[serde(default, alias = "payment_methods")]
    pub payment_methods: Vec<String>,
    /// Metadata forwarded to the provider.
    #[serde(default)]
    pub metadata: Metadata,
    /// Provider override; the active provider when absent.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Payment intent response.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    /// Provider payment id.
    pub id: String,
    /// Token the client completes the payment with.
    pub client_secret: Option<String>,
    /// Provider-native status.
    pub status: String,
    /// Amount in currency units.
    pub amount: f64,
    /// ISO currency.
    pub currency: String,
    /// Provider that opened the payment.
    pub provider: String,
    /// Provider-specific fields (checkout URL, session id, ...).
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub provider_specific: Metadata,
}

/// Open a payment with the active (or requested) provider.
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let (provider, intent) = state
        .payments
        .create_payment_intent(
            request.amount,
            request.payment_methods,
            request.metadata,
            request.provider.as_deref(),
        )
        .await?;

    tracing::info!(
        payment_id = %intent.id,
        provider = %provider,
        amount_minor = intent.amount_minor,
        "Payment intent created"
    );

    Ok(Json(PaymentIntentResponse {
        id: intent.id,
        client_secret: intent.client_token,
        status: intent.status,
        amount: from_minor_units(intent.amount_minor),
        currency: intent.currency,
        provider: provider.as_str().to_string(),
        provider_specific: intent.provider_specific,
    }))
}

// =============================================================================
// Confirm Payment
// =============================================================================

/// Confirm payment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    /// Provider payment id.
    #[serde(alias = "payment_id")]
    pub payment_id: String,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Confirm payment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    /// Whether the payment is collected.
    pub success: bool,
    /// Provider-native status.
    pub status: String,
    /// Summary.
    pub message: String,
    /// The confirmed payment.
    pub payment_id: String,
}

/// Run the provider's confirmation step.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    if request.payment_id.trim().is_empty() {
        return Err(ApiError::BadRequest("paymentId is required".into()));
    }

    let confirmation = state
        .payments
        .confirm_payment(&request.payment_id, request.provider.as_deref())
        .await?;

    Ok(Json(ConfirmPaymentResponse {
        success: confirmation.success,
        status: confirmation.status,
        message: confirmation.message,
        payment_id: confirmation.payment_id,
    }))
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment status query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery {
    /// Provider payment id.
    #[serde(default, alias = "payment_id")]
    pub payment_id: Option<String>,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Payment status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    /// Provider-native status.
    pub status: String,
    /// Normalised state.
    pub state: PaymentState,
    /// Whether the payment is collected.
    pub paid: bool,
    /// Amount in currency units.
    pub amount: f64,
    /// ISO currency.
    pub currency: String,
    /// Method used, when known.
    pub payment_method: Option<String>,
    /// Metadata stored with the payment.
    pub metadata: serde_json::Value,
}

/// Read a payment's status from its provider.
pub async fn get_payment_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentStatusQuery>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let payment_id = query
        .payment_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("paymentId is required".into()))?;

    let status = state
        .payments
        .get_payment_status(&payment_id, query.provider.as_deref())
        .await?;

    Ok(Json(PaymentStatusResponse {
        status: status.status,
        state: status.state,
        paid: status.paid,
        amount: from_minor_units(status.amount_minor),
        currency: status.currency,
        payment_method: status.payment_method,
        metadata: status.metadata,
    }))
}
