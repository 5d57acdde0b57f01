//! Column families used by the `RocksDB` backend.

/// Column family names.
pub mod cf {
    /// Processed webhook events, keyed by `provider:event_id`.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";

    /// Last known payment state, keyed by `provider:payment_id`.
    pub const PAYMENTS: &str = "payments";

    /// Booking ledger, keyed by payment id.
    pub const BOOKINGS: &str = "bookings";

    /// Captured payments without a reservation, keyed by
    /// `created_at_millis (8 bytes BE) || payment_id`.
    pub const RECONCILIATION: &str = "reconciliation";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::WEBHOOK_EVENTS,
        cf::PAYMENTS,
        cf::BOOKINGS,
        cf::RECONCILIATION,
    ]
}
