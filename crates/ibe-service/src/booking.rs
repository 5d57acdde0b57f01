//! Booking orchestrator: verify payment, reserve with the PMS, confirm by email.
//!
//! One call to [`BookingOrchestrator::confirm_booking`] is one run of the
//! [`BookingRun`] state machine:
//!
//! 1. the payment is verified with its provider (fatal on failure)
//! 2. the reservation is created with the payment id as idempotency key
//!    (fatal on failure; the captured payment is queued for reconciliation)
//! 3. the confirmation email is sent (failure is logged and ignored)
//!
//! Steps 2 and 3 run on a spawned task so a dropped client connection cannot
//! abandon a reservation call that is already in flight. Runs for the same
//! payment id are serialised: a second confirm waits for the first and then
//! replays its ledger entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use ibe_core::{
    BookingError, BookingRecord, BookingResult, BookingRun, BookingState, Cart, PaymentState,
    ProviderName, ReconciliationItem,
};
use ibe_store::{Store, StoreError};

use crate::config::HotelInfo;
use crate::email::{confirmation_email, Mailer};
use crate::payment::PaymentService;
use crate::pms::{ReservationRequest, ReservationSystem};

/// Input of one confirm-booking run.
#[derive(Debug, Clone)]
pub struct ConfirmBooking {
    /// Provider payment id.
    pub payment_id: String,
    /// Provider the client paid with; the active provider when absent.
    pub provider: Option<String>,
    /// Client-declared payment status. Only read for `SumUp` in trust mode.
    pub client_status: Option<String>,
    /// Guest cart.
    pub cart: Cart,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    /// PMS booking.
    pub booking: BookingResult,
    /// Final state of the run.
    pub state: BookingState,
    /// Provider status that verified the payment.
    pub payment_status: String,
    /// `true` when the booking came from the ledger instead of the PMS.
    pub replayed: bool,
}

/// What verification established about the payment.
#[derive(Debug)]
struct VerifiedPayment {
    provider: ProviderName,
    status: String,
    amount_minor: i64,
    currency: String,
}

/// Drives the confirm-booking flow.
#[derive(Clone)]
pub struct BookingOrchestrator {
    payments: Arc<PaymentService>,
    pms: Arc<dyn ReservationSystem>,
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn Store>,
    hotel: HotelInfo,
    sumup_trust_client_status: bool,
    in_flight: Arc<InFlight>,
}

// ============================================================================
// Per-Payment Claims
// ============================================================================

/// Payment ids with a confirm currently running in this process.
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InFlight {
    /// Wait until no other run holds `payment_id`, then hold it.
    async fn claim(self: &Arc<Self>, payment_id: &str) -> Claim {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(payment_id.to_string()).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;
        Claim {
            owner: Arc::clone(self),
            payment_id: payment_id.to_string(),
            slot,
            _guard: guard,
        }
    }
}

/// Exclusive hold on one payment id, released on drop.
struct Claim {
    owner: Arc<InFlight>,
    payment_id: String,
    slot: Arc<tokio::sync::Mutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut slots = self
            .owner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Map entry, this claim and its guard; any further reference is a waiter
        if Arc::strong_count(&self.slot) <= 3 {
            slots.remove(&self.payment_id);
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

impl BookingOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        payments: Arc<PaymentService>,
        pms: Arc<dyn ReservationSystem>,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn Store>,
        hotel: HotelInfo,
        sumup_trust_client_status: bool,
    ) -> Self {
        Self {
            payments,
            pms,
            mailer,
            store,
            hotel,
            sumup_trust_client_status,
            in_flight: Arc::default(),
        }
    }

    /// Confirm a booking for a paid cart.
    ///
    /// # Errors
    ///
    /// - `InvalidCart` if the cart cannot be booked
    /// - `PaymentNotVerified` if the provider does not report the payment as paid
    /// - `AmountMismatch` if the cart disagrees with the authorised amount
    /// - `Payment` if the provider cannot be queried
    /// - `Reservation` if the PMS rejects the booking
    pub async fn confirm_booking(
        &self,
        request: ConfirmBooking,
    ) -> Result<BookingConfirmation, BookingError> {
        request.cart.validate()?;

        if request.payment_id.trim().is_empty() {
            return Err(BookingError::InvalidCart("payment id is required".into()));
        }

        let claim = self.in_flight.claim(&request.payment_id).await;

        if let Some(record) = self.store.get_booking(&request.payment_id)? {
            tracing::info!(
                payment_id = %request.payment_id,
                booking_id = %record.result.booking_id,
                "Booking already recorded for payment, returning stored result"
            );
            return Ok(replay(record));
        }

        let mut run = BookingRun::new(request.payment_id.clone());

        let verified = match self.verify(&request).await {
            Ok(verified) => verified,
            Err(err) => {
                advance(&mut run, BookingState::VerificationFailed);
                tracing::warn!(
                    payment_id = %request.payment_id,
                    error = %err,
                    "Payment verification failed, no reservation attempted"
                );
                return Err(err);
            }
        };

        if let Err(err) = check_amounts(&request.cart, &verified, self.payments.currency()) {
            advance(&mut run, BookingState::VerificationFailed);
            tracing::warn!(payment_id = %request.payment_id, error = %err, "Cart rejected");
            return Err(err);
        }

        advance(&mut run, BookingState::Verified);

        tracing::info!(
            payment_id = %request.payment_id,
            provider = %verified.provider,
            amount_minor = verified.amount_minor,
            "Payment verified, creating reservation"
        );

        // Run to completion even if the caller goes away
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let _claim = claim;
            this.reserve(run, request, verified).await
        });

        handle.await.map_err(|e| {
            tracing::error!(error = %e, "Booking task aborted");
            BookingError::Reservation(format!("booking task aborted: {e}"))
        })?
    }

    async fn verify(&self, request: &ConfirmBooking) -> Result<VerifiedPayment, BookingError> {
        let adapter = match request.provider.as_deref() {
            Some(name) => self.payments.registry().get_provider_by_name(name),
            None => self.payments.registry().get_provider(),
        };
        let provider = adapter.name();

        if provider == ProviderName::SumUp && self.sumup_trust_client_status {
            let declared = request.client_status.as_deref().unwrap_or_default();
            tracing::warn!(
                payment_id = %request.payment_id,
                declared = %declared,
                "Trusting client-declared SumUp payment status without re-verification"
            );
            if !declared.eq_ignore_ascii_case("PAID") {
                return Err(BookingError::PaymentNotVerified {
                    status: declared.to_string(),
                });
            }
            return Ok(VerifiedPayment {
                provider,
                status: "PAID".into(),
                amount_minor: request.cart.deposit_minor().unwrap_or_default(),
                currency: self.payments.currency().to_string(),
            });
        }

        let status = adapter.get_payment_status(&request.payment_id).await?;

        if !status.paid || status.state != PaymentState::Succeeded {
            return Err(BookingError::PaymentNotVerified {
                status: status.status,
            });
        }

        Ok(VerifiedPayment {
            provider,
            status: status.status,
            amount_minor: status.amount_minor,
            currency: if status.currency.is_empty() {
                self.payments.currency().to_string()
            } else {
                status.currency
            },
        })
    }

    async fn reserve(
        self,
        mut run: BookingRun,
        request: ConfirmBooking,
        verified: VerifiedPayment,
    ) -> Result<BookingConfirmation, BookingError> {
        let reservation = ReservationRequest {
            cart: request.cart,
            payment_id: request.payment_id,
            prepayment_minor: verified.amount_minor,
            currency: verified.currency,
        };

        let booking = match self.pms.create_booking(&reservation).await {
            Ok(booking) => booking,
            Err(err) => {
                // Another instance may have booked this payment meanwhile
                if let Ok(Some(record)) = self.store.get_booking(&reservation.payment_id) {
                    tracing::info!(
                        payment_id = %reservation.payment_id,
                        booking_id = %record.result.booking_id,
                        error = %err,
                        "PMS refused a booking the ledger already holds, returning stored result"
                    );
                    return Ok(replay(record));
                }

                advance(&mut run, BookingState::ReservationFailed);
                tracing::error!(
                    payment_id = %reservation.payment_id,
                    provider = %verified.provider,
                    error = %err,
                    "Reservation failed after payment was captured"
                );
                self.queue_reconciliation(&reservation, verified.provider, &err.to_string());
                return Err(BookingError::Reservation(err.to_string()));
            }
        };

        advance(&mut run, BookingState::ReservationCreated);

        let record = BookingRecord {
            payment_id: reservation.payment_id.clone(),
            provider: verified.provider,
            result: booking.clone(),
            state: BookingState::ReservationCreated,
            created_at: Utc::now(),
        };
        match self.store.put_booking(&record) {
            Ok(()) => {}
            Err(StoreError::DuplicateBooking { .. }) => {
                tracing::info!(
                    payment_id = %reservation.payment_id,
                    booking_id = %booking.booking_id,
                    "Concurrent confirm already recorded this booking, skipping confirmation email"
                );
                return Ok(BookingConfirmation {
                    booking,
                    state: run.state(),
                    payment_status: verified.status,
                    replayed: true,
                });
            }
            Err(err) => {
                tracing::error!(
                    payment_id = %reservation.payment_id,
                    error = %err,
                    "Failed to record booking in ledger"
                );
            }
        }

        if self.send_confirmation(&reservation.cart, &booking).await {
            advance(&mut run, BookingState::ConfirmationSent);
        }

        tracing::info!(
            payment_id = %reservation.payment_id,
            booking_id = %booking.booking_id,
            state = ?run.state(),
            "Booking confirmed"
        );

        Ok(BookingConfirmation {
            booking,
            state: run.state(),
            payment_status: verified.status,
            replayed: false,
        })
    }

    /// Send the confirmation. Never fails the booking.
    async fn send_confirmation(&self, cart: &Cart, booking: &BookingResult) -> bool {
        let message = match confirmation_email(cart, booking, &self.hotel) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Could not render confirmation email");
                return false;
            }
        };

        match self.mailer.send(&message).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    booking_id = %booking.booking_id,
                    error = %err,
                    "Failed to send confirmation email"
                );
                false
            }
        }
    }

    fn queue_reconciliation(
        &self,
        reservation: &ReservationRequest,
        provider: ProviderName,
        error: &str,
    ) {
        let item = ReconciliationItem {
            payment_id: reservation.payment_id.clone(),
            provider,
            amount_minor: reservation.prepayment_minor,
            currency: reservation.currency.clone(),
            guest_email: reservation
                .cart
                .personal_data
                .as_ref()
                .map(|p| p.email.clone()),
            error: error.to_string(),
            created_at: Utc::now(),
        };

        if let Err(err) = self.store.put_reconciliation(&item) {
            tracing::error!(
                payment_id = %item.payment_id,
                error = %err,
                "Failed to queue payment for reconciliation"
            );
        }
    }
}

fn replay(record: BookingRecord) -> BookingConfirmation {
    BookingConfirmation {
        booking: record.result,
        state: record.state,
        payment_status: "succeeded".into(),
        replayed: true,
    }
}

/// Move the run forward, logging transitions the state machine refuses.
fn advance(run: &mut BookingRun, next: BookingState) {
    if let Err(err) = run.advance(next) {
        tracing::error!(payment_id = %run.payment_id(), error = %err, "Booking state error");
    }
}

/// Bound-check the cart against what the provider authorised.
fn check_amounts(
    cart: &Cart,
    verified: &VerifiedPayment,
    currency: &str,
) -> Result<(), BookingError> {
    if !verified.currency.eq_ignore_ascii_case(currency) {
        return Err(BookingError::AmountMismatch(format!(
            "payment currency {} does not match {currency}",
            verified.currency
        )));
    }
    if verified.amount_minor <= 0 {
        return Ok(());
    }

    let Some(deposit) = cart.deposit_minor() else {
        return Err(BookingError::AmountMismatch(format!(
            "cart declares no deposit for captured amount {}",
            verified.amount_minor
        )));
    };
    if deposit > verified.amount_minor {
        return Err(BookingError::AmountMismatch(format!(
            "cart deposit {deposit} exceeds authorised amount {}",
            verified.amount_minor
        )));
    }

    match cart.total_minor() {
        Some(total) if total >= verified.amount_minor => Ok(()),
        total => Err(BookingError::AmountMismatch(format!(
            "cart total {} is below captured amount {}",
            total.unwrap_or_default(),
            verified.amount_minor
        ))),
    }
}
