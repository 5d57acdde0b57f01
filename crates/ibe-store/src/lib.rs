//! Storage layer for the booking engine.
//!
//! The store keeps the small amount of state the booking flow needs to be
//! safe under retries and replays:
//!
//! - `webhook_events`: processed provider notifications, for deduplication
//! - `payments`: last known state per payment, fed by webhooks
//! - `bookings`: the booking ledger, one reservation per payment id
//! - `reconciliation`: captured payments whose reservation failed
//!
//! Two backends are provided: [`MemoryStore`] (always available) and
//! `RocksStore` behind the `rocksdb-backend` feature.
//!
//! # Example
//!
//! ```
//! use ibe_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! assert!(store.get_booking("pi_123").unwrap().is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use ibe_core::{
    BookingRecord, PaymentRecord, PaymentRef, ProcessedEvent, ProviderName, ReconciliationItem,
};

/// The storage trait defining all database operations.
///
/// Implementations must be safe to share between request handlers and
/// background booking tasks.
pub trait Store: Send + Sync {
    // =========================================================================
    // Webhook Events
    // =========================================================================

    /// Check whether a provider event was already processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_webhook_event(&self, provider: ProviderName, event_id: &str) -> Result<bool>;

    /// Drop processed events received before `older_than`.
    ///
    /// Returns the number of events removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_webhook_events(&self, older_than: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Payment Records
    // =========================================================================

    /// Get the last known state of a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment_record(&self, payment: &PaymentRef) -> Result<Option<PaymentRecord>>;

    /// Insert or update a payment record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_payment_record(&self, record: &PaymentRecord) -> Result<()>;

    // =========================================================================
    // Booking Ledger
    // =========================================================================

    /// Get the booking created for a payment, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_booking(&self, payment_id: &str) -> Result<Option<BookingRecord>>;

    /// Record a booking.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateBooking` if the payment already has one.
    fn put_booking(&self, record: &BookingRecord) -> Result<()>;

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Queue a captured payment for manual follow-up.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_reconciliation(&self, item: &ReconciliationItem) -> Result<()>;

    /// List queued items, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_reconciliation(&self, limit: usize) -> Result<Vec<ReconciliationItem>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Mark an event as processed and apply its state change atomically.
    ///
    /// A record whose stored state is already terminal is left untouched.
    /// Returns `true` when the payment record was written.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateEvent` if the event was already processed.
    fn record_webhook(
        &self,
        event: &ProcessedEvent,
        record: Option<&PaymentRecord>,
    ) -> Result<bool>;
}

/// Whether a new payment record may replace `existing`.
///
/// Terminal states are final.
pub(crate) fn should_apply(existing: Option<&PaymentRecord>) -> bool {
    existing.map_or(true, |r| !r.state.is_terminal())
}
