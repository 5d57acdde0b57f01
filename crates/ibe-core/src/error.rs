//! Error taxonomy for payments and bookings.

use crate::provider::ProviderName;

/// Errors raised by payment provider adapters.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// A required credential or secret is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The provider rejected the call.
    #[error("{provider} API error: {message}")]
    ProviderApi {
        /// Provider that rejected the call.
        provider: ProviderName,
        /// HTTP status returned by the provider, if any.
        status: Option<u16>,
        /// Provider message, safe to show to callers.
        message: String,
    },

    /// The provider could not be reached or answered with garbage.
    #[error("{provider} transport error: {message}")]
    Transport {
        /// Provider that was called.
        provider: ProviderName,
        /// Underlying error description.
        message: String,
    },

    /// Webhook signature missing or invalid.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Webhook payload could not be interpreted.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Amount not acceptable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Errors raised by the confirm-booking flow.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// The cart is missing data required to book.
    #[error("invalid cart: {0}")]
    InvalidCart(String),

    /// The payment is not provably collected.
    #[error("payment not verified (status: {status})")]
    PaymentNotVerified {
        /// Provider status observed during verification.
        status: String,
    },

    /// Cart amounts disagree with what the provider authorised.
    #[error("amount mismatch: {0}")]
    AmountMismatch(String),

    /// The provider could not be queried.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The reservation system rejected the booking. The payment stays captured.
    #[error("reservation failed: {0}")]
    Reservation(String),

    /// Local bookkeeping failed before any external side effect.
    #[error("storage error: {0}")]
    Store(String),
}
