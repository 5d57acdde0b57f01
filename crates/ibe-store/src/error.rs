//! Error types for booking-engine storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Webhook event already processed.
    #[error("duplicate event: {event_id}")]
    DuplicateEvent {
        /// The event ID that was duplicated.
        event_id: String,
    },

    /// A booking already exists for this payment.
    #[error("booking already recorded for payment {payment_id}")]
    DuplicateBooking {
        /// Payment the existing booking belongs to.
        payment_id: String,
    },
}

impl From<StoreError> for ibe_core::BookingError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
