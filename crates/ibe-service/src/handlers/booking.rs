//! Booking confirmation handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use ibe_core::{BookingState, Cart};

use crate::booking::ConfirmBooking;
use crate::error::ApiError;
use crate::state::AppState;

/// Confirm booking request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingRequest {
    /// Provider payment id.
    #[serde(default, alias = "paymentId")]
    pub payment_intent_id: Option<String>,
    /// Provider the guest paid with.
    #[serde(default)]
    pub payment_provider: Option<String>,
    /// Client-declared status (`SumUp` redirect flow).
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Guest cart.
    #[serde(default)]
    pub cart: Option<serde_json::Value>,
}

/// Confirm booking response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingResponse {
    /// Always `true`; failures are answered by [`ApiError`].
    pub success: bool,
    /// PMS reservation number.
    pub booking_reference: String,
    /// PMS booking id.
    pub booking_id: String,
    /// Provider status that verified the payment.
    pub payment_status: String,
    /// Final state of the booking run.
    pub state: BookingState,
    /// Whether this booking was already confirmed earlier.
    pub replayed: bool,
}

/// Verify the payment, create the reservation and send the confirmation.
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<ConfirmBookingResponse>, ApiError> {
    let payment_id = request
        .payment_intent_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("paymentIntentId is required".into()))?;

    let cart = request
        .cart
        .ok_or_else(|| ApiError::BadRequest("cart is required".into()))?;
    let cart: Cart = serde_json::from_value(cart)
        .map_err(|e| ApiError::BadRequest(format!("invalid cart: {e}")))?;

    tracing::info!(
        payment_id = %payment_id,
        provider = ?request.payment_provider,
        "Confirming booking"
    );

    let confirmation = state
        .orchestrator
        .confirm_booking(ConfirmBooking {
            payment_id,
            provider: request.payment_provider,
            client_status: request.payment_status,
            cart,
        })
        .await?;

    Ok(Json(ConfirmBookingResponse {
        success: true,
        booking_reference: confirmation.booking.reservation_number,
        booking_id: confirmation.booking.booking_id,
        payment_status: confirmation.payment_status,
        state: confirmation.state,
        replayed: confirmation.replayed,
    }))
}
