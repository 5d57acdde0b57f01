//! In-memory storage backend.
//!
//! Used by default and in tests. State is lost on restart, which only
//! weakens webhook deduplication and booking replay across restarts.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use ibe_core::{
    BookingRecord, PaymentRecord, PaymentRef, ProcessedEvent, ProviderName, ReconciliationItem,
};

use crate::error::{Result, StoreError};
use crate::{keys, should_apply, Store};

#[derive(Default)]
struct Inner {
    webhook_events: HashMap<Vec<u8>, ProcessedEvent>,
    payments: HashMap<Vec<u8>, PaymentRecord>,
    bookings: HashMap<Vec<u8>, BookingRecord>,
    reconciliation: Vec<ReconciliationItem>,
}

/// `HashMap`-backed store behind a single lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn has_webhook_event(&self, provider: ProviderName, event_id: &str) -> Result<bool> {
        let key = keys::webhook_event_key(provider, event_id);
        Ok(self.read()?.webhook_events.contains_key(&key))
    }

    fn purge_webhook_events(&self, older_than: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.webhook_events.len();
        inner
            .webhook_events
            .retain(|_, event| event.received_at >= older_than);
        Ok(before - inner.webhook_events.len())
    }

    fn get_payment_record(&self, payment: &PaymentRef) -> Result<Option<PaymentRecord>> {
        let key = keys::payment_key(payment);
        Ok(self.read()?.payments.get(&key).cloned())
    }

    fn put_payment_record(&self, record: &PaymentRecord) -> Result<()> {
        let key = keys::payment_key(&record.payment);
        self.write()?.payments.insert(key, record.clone());
        Ok(())
    }

    fn get_booking(&self, payment_id: &str) -> Result<Option<BookingRecord>> {
        let key = keys::booking_key(payment_id);
        Ok(self.read()?.bookings.get(&key).cloned())
    }

    fn put_booking(&self, record: &BookingRecord) -> Result<()> {
        let key = keys::booking_key(&record.payment_id);
        let mut inner = self.write()?;
        if inner.bookings.contains_key(&key) {
            return Err(StoreError::DuplicateBooking {
                payment_id: record.payment_id.clone(),
            });
        }
        inner.bookings.insert(key, record.clone());
        Ok(())
    }

    fn put_reconciliation(&self, item: &ReconciliationItem) -> Result<()> {
        self.write()?.reconciliation.push(item.clone());
        Ok(())
    }

    fn list_reconciliation(&self, limit: usize) -> Result<Vec<ReconciliationItem>> {
        let inner = self.read()?;
        let mut items = inner.reconciliation.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit);
        Ok(items)
    }

    fn record_webhook(
        &self,
        event: &ProcessedEvent,
        record: Option<&PaymentRecord>,
    ) -> Result<bool> {
        let event_key = keys::webhook_event_key(event.provider, &event.event_id);
        let mut inner = self.write()?;

        if inner.webhook_events.contains_key(&event_key) {
            return Err(StoreError::DuplicateEvent {
                event_id: event.event_id.clone(),
            });
        }
        inner.webhook_events.insert(event_key, event.clone());

        let Some(record) = record else {
            return Ok(false);
        };
        let payment_key = keys::payment_key(&record.payment);
        if !should_apply(inner.payments.get(&payment_key)) {
            return Ok(false);
        }
        inner.payments.insert(payment_key, record.clone());
        Ok(true)
    }
}
