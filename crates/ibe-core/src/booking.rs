//! Booking results and the confirm-booking state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderName;

/// Reservation created in the property-management system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResult {
    /// PMS booking id.
    pub booking_id: String,
    /// Reservation number shown to the guest.
    pub reservation_number: String,
    /// Raw PMS response.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// States of one confirm-booking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    /// Nothing checked yet.
    AwaitingVerification,
    /// The provider reports the payment as collected.
    Verified,
    /// The PMS accepted the reservation.
    ReservationCreated,
    /// The confirmation email went out.
    ConfirmationSent,
    /// The payment could not be verified. Nothing was booked.
    VerificationFailed,
    /// The PMS rejected the reservation. The payment stays captured.
    ReservationFailed,
}

impl BookingState {
    /// Whether the run ends here.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ConfirmationSent | Self::VerificationFailed | Self::ReservationFailed
        )
    }

    /// Whether the guest holds a reservation in this state.
    #[must_use]
    pub const fn is_booked(self) -> bool {
        matches!(self, Self::ReservationCreated | Self::ConfirmationSent)
    }

    /// Whether `next` is a legal successor.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::AwaitingVerification,
                Self::Verified | Self::VerificationFailed
            ) | (Self::Verified, Self::ReservationCreated | Self::ReservationFailed)
                | (Self::ReservationCreated, Self::ConfirmationSent)
        )
    }
}

/// Illegal state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal booking transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    /// State before.
    pub from: BookingState,
    /// Requested state.
    pub to: BookingState,
}

/// Tracks one confirm-booking attempt through its states.
#[derive(Debug, Clone)]
pub struct BookingRun {
    payment_id: String,
    state: BookingState,
    history: Vec<BookingState>,
}

impl BookingRun {
    /// Start a run for a payment.
    #[must_use]
    pub fn new(payment_id: impl Into<String>) -> Self {
        Self {
            payment_id: payment_id.into(),
            state: BookingState::AwaitingVerification,
            history: vec![BookingState::AwaitingVerification],
        }
    }

    /// Payment this run belongs to.
    #[must_use]
    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BookingState {
        self.state
    }

    /// Every state visited so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[BookingState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `next` is not a legal successor.
    pub fn advance(&mut self, next: BookingState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// Completed booking kept in the ledger, keyed by payment id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Payment the reservation was paid with.
    pub payment_id: String,
    /// Provider that collected the payment.
    pub provider: ProviderName,
    /// PMS result.
    pub result: BookingResult,
    /// Final state of the run.
    pub state: BookingState,
    /// When the reservation was created.
    pub created_at: DateTime<Utc>,
}

/// Captured payment without a reservation, awaiting manual refund or retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    /// Captured payment.
    pub payment_id: String,
    /// Provider that holds the money.
    pub provider: ProviderName,
    /// Authorised amount in minor units.
    pub amount_minor: i64,
    /// ISO currency.
    pub currency: String,
    /// Guest email, for contacting the guest.
    pub guest_email: Option<String>,
    /// Why the reservation failed.
    pub error: String,
    /// When the failure happened.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut run = BookingRun::new("pi_123");
        run.advance(BookingState::Verified).unwrap();
        run.advance(BookingState::ReservationCreated).unwrap();
        run.advance(BookingState::ConfirmationSent).unwrap();
        assert!(run.state().is_terminal());
        assert_eq!(run.history().len(), 4);
    }

    #[test]
    fn cannot_reserve_before_verification() {
        let mut run = BookingRun::new("pi_123");
        let err = run.advance(BookingState::ReservationCreated).unwrap_err();
        assert_eq!(err.from, BookingState::AwaitingVerification);
        assert_eq!(run.state(), BookingState::AwaitingVerification);
    }

    #[test]
    fn failed_states_are_terminal() {
        let mut run = BookingRun::new("pi_123");
        run.advance(BookingState::VerificationFailed).unwrap();
        assert!(run.state().is_terminal());
        assert!(run.advance(BookingState::Verified).is_err());
    }

    #[test]
    fn reservation_created_counts_as_booked() {
        assert!(BookingState::ReservationCreated.is_booked());
        assert!(!BookingState::ReservationCreated.is_terminal());
        assert!(!BookingState::ReservationFailed.is_booked());
    }
}
