//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ibe_core::{BookingError, PaymentError};
use ibe_store::StoreError;

use crate::pms::PmsError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Webhook signature missing or invalid.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A required credential is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A payment provider rejected the call or could not be reached.
    #[error("{0}")]
    Provider(String),

    /// The payment is not provably collected.
    #[error("{0}")]
    PaymentNotVerified(String),

    /// Cart amounts disagree with the payment.
    #[error("{0}")]
    AmountMismatch(String),

    /// The PMS rejected the reservation.
    #[error("{0}")]
    Reservation(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::InvalidSignature(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_signature",
                format!("Invalid webhook signature: {msg}"),
            ),
            Self::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    msg.clone(),
                )
            }
            Self::Provider(msg) => (StatusCode::BAD_GATEWAY, "provider_error", msg.clone()),
            Self::PaymentNotVerified(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_not_verified",
                msg.clone(),
            ),
            Self::AmountMismatch(msg) => (StatusCode::CONFLICT, "amount_mismatch", msg.clone()),
            Self::Reservation(msg) => (
                StatusCode::BAD_GATEWAY,
                "reservation_failed",
                msg.clone(),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Configuration(msg) => Self::Configuration(msg),
            PaymentError::InvalidSignature(msg) => Self::InvalidSignature(msg),
            PaymentError::InvalidPayload(_) | PaymentError::InvalidAmount(_) => {
                Self::BadRequest(err.to_string())
            }
            PaymentError::ProviderApi { .. } | PaymentError::Transport { .. } => {
                tracing::warn!(error = %err, "Payment provider call failed");
                Self::Provider(err.to_string())
            }
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidCart(_) => Self::BadRequest(err.to_string()),
            BookingError::PaymentNotVerified { .. } => Self::PaymentNotVerified(err.to_string()),
            BookingError::AmountMismatch(_) => Self::AmountMismatch(err.to_string()),
            BookingError::Payment(inner) => inner.into(),
            BookingError::Reservation(_) => Self::Reservation(err.to_string()),
            BookingError::Store(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<PmsError> for ApiError {
    fn from(err: PmsError) -> Self {
        match err {
            PmsError::NotConfigured(msg) => Self::Configuration(msg),
            PmsError::InvalidRequest(msg) => Self::BadRequest(msg),
            other => Self::Reservation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibe_core::ProviderName;

    #[test]
    fn booking_errors_map_to_status_codes() {
        let cases = [
            (
                ApiError::from(BookingError::PaymentNotVerified {
                    status: "requires_action".into(),
                }),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                BookingError::AmountMismatch("x".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                BookingError::Reservation("x".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BookingError::InvalidCart("x".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn payment_errors_map_to_status_codes() {
        let provider = ApiError::from(PaymentError::ProviderApi {
            provider: ProviderName::Stripe,
            status: Some(402),
            message: "card declined".into(),
        });
        assert_eq!(provider.into_response().status(), StatusCode::BAD_GATEWAY);

        let config = ApiError::from(PaymentError::Configuration("missing key".into()));
        assert_eq!(
            config.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let signature = ApiError::from(PaymentError::InvalidSignature("bad".into()));
        assert_eq!(signature.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
