//! Property-management system integration.
//!
//! The booking flow only needs two things from the PMS: create a reservation
//! and look up what can be sold. Both are traits so the orchestrator and the
//! inventory handlers can run against fakes.

mod apaleo;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;

use ibe_core::BookingResult;

pub use apaleo::ApaleoClient;
pub use types::{DailyAvailability, OfferQuery, ReservationRequest, UnitGroupAvailability};

/// Errors raised by the PMS client.
#[derive(Debug, thiserror::Error)]
pub enum PmsError {
    /// Credentials or property id missing.
    #[error("PMS not configured: {0}")]
    NotConfigured(String),

    /// The token endpoint refused the client credentials.
    #[error("PMS authentication failed: {0}")]
    Auth(String),

    /// The PMS rejected the call.
    #[error("PMS API error ({status}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// PMS message.
        message: String,
    },

    /// The PMS could not be reached.
    #[error("PMS transport error: {0}")]
    Transport(String),

    /// The request could not be built from the cart.
    #[error("invalid reservation request: {0}")]
    InvalidRequest(String),

    /// The PMS answered with something we cannot read.
    #[error("unexpected PMS response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PmsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Creates reservations.
#[async_trait]
pub trait ReservationSystem: Send + Sync {
    /// Create a reservation for a verified payment.
    ///
    /// `request.payment_id` is the idempotency key: the same key must never
    /// produce a second reservation.
    async fn create_booking(&self, request: &ReservationRequest)
        -> Result<BookingResult, PmsError>;
}

/// Answers availability and offer queries.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Sellable units per night between `from` and `to`.
    async fn availability(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAvailability>, PmsError>;

    /// Bookable rate-plan offers for a stay, as returned by the PMS.
    async fn offers(&self, query: &OfferQuery) -> Result<Vec<serde_json::Value>, PmsError>;
}
