//! Key encoding shared by the storage backends.

use chrono::{DateTime, Utc};
use ibe_core::{PaymentRef, ProviderName};

/// Key for a processed webhook event.
///
/// Event ids are only unique per provider, so the provider is part of the key.
#[must_use]
pub fn webhook_event_key(provider: ProviderName, event_id: &str) -> Vec<u8> {
    format!("{}:{event_id}", provider.as_str()).into_bytes()
}

/// Key for a payment record.
#[must_use]
pub fn payment_key(payment: &PaymentRef) -> Vec<u8> {
    format!("{}:{}", payment.provider.as_str(), payment.payment_id).into_bytes()
}

/// Key for a booking ledger entry.
#[must_use]
pub fn booking_key(payment_id: &str) -> Vec<u8> {
    payment_id.as_bytes().to_vec()
}

/// Key for a reconciliation entry.
///
/// Format: `created_at_millis (8 bytes BE) || payment_id`, so keys sort by
/// creation time.
#[must_use]
pub fn reconciliation_key(created_at: DateTime<Utc>, payment_id: &str) -> Vec<u8> {
    let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
    let mut key = Vec::with_capacity(8 + payment_id.len());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(payment_id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_keys_are_scoped_by_provider() {
        assert_ne!(
            webhook_event_key(ProviderName::Stripe, "evt_1"),
            webhook_event_key(ProviderName::SumUp, "evt_1")
        );
        assert_eq!(webhook_event_key(ProviderName::Adyen, "psp"), b"adyen:psp");
    }

    #[test]
    fn reconciliation_keys_sort_by_time() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let a = reconciliation_key(early, "zzz");
        let b = reconciliation_key(late, "aaa");
        assert!(a < b);
        assert_eq!(&b[8..], b"aaa");
    }
}
