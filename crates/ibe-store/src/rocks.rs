//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use ibe_core::{
    BookingRecord, PaymentRecord, PaymentRef, ProcessedEvent, ProviderName, ReconciliationItem,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{should_apply, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serialises check-then-write sequences (dedup, ledger insert).
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Webhook Events
    // =========================================================================

    fn has_webhook_event(&self, provider: ProviderName, event_id: &str) -> Result<bool> {
        let cf = self.cf(cf::WEBHOOK_EVENTS)?;
        let key = keys::webhook_event_key(provider, event_id);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    fn purge_webhook_events(&self, older_than: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::WEBHOOK_EVENTS)?;

        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let event: ProcessedEvent = Self::deserialize(&value)?;
            if event.received_at < older_than {
                batch.delete_cf(&cf, key);
                removed += 1;
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if removed > 0 {
            tracing::debug!(removed, "Purged expired webhook events");
        }
        Ok(removed)
    }

    // =========================================================================
    // Payment Records
    // =========================================================================

    fn get_payment_record(&self, payment: &PaymentRef) -> Result<Option<PaymentRecord>> {
        self.get(cf::PAYMENTS, &keys::payment_key(payment))
    }

    fn put_payment_record(&self, record: &PaymentRecord) -> Result<()> {
        self.put(cf::PAYMENTS, &keys::payment_key(&record.payment), record)
    }

    // =========================================================================
    // Booking Ledger
    // =========================================================================

    fn get_booking(&self, payment_id: &str) -> Result<Option<BookingRecord>> {
        self.get(cf::BOOKINGS, &keys::booking_key(payment_id))
    }

    fn put_booking(&self, record: &BookingRecord) -> Result<()> {
        let _guard = self.lock()?;
        let key = keys::booking_key(&record.payment_id);

        if self.get::<BookingRecord>(cf::BOOKINGS, &key)?.is_some() {
            return Err(StoreError::DuplicateBooking {
                payment_id: record.payment_id.clone(),
            });
        }

        self.put(cf::BOOKINGS, &key, record)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    fn put_reconciliation(&self, item: &ReconciliationItem) -> Result<()> {
        let key = keys::reconciliation_key(item.created_at, &item.payment_id);
        self.put(cf::RECONCILIATION, &key, item)
    }

    fn list_reconciliation(&self, limit: usize) -> Result<Vec<ReconciliationItem>> {
        let cf = self.cf(cf::RECONCILIATION)?;

        // Keys start with the creation time, so reverse iteration is newest first
        let mut items = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            if items.len() >= limit {
                break;
            }
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            items.push(Self::deserialize(&value)?);
        }

        Ok(items)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn record_webhook(
        &self,
        event: &ProcessedEvent,
        record: Option<&PaymentRecord>,
    ) -> Result<bool> {
        let _guard = self.lock()?;

        if self.has_webhook_event(event.provider, &event.event_id)? {
            return Err(StoreError::DuplicateEvent {
                event_id: event.event_id.clone(),
            });
        }

        let cf_events = self.cf(cf::WEBHOOK_EVENTS)?;
        let cf_payments = self.cf(cf::PAYMENTS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_events,
            keys::webhook_event_key(event.provider, &event.event_id),
            Self::serialize(event)?,
        );

        let mut applied = false;
        if let Some(record) = record {
            let key = keys::payment_key(&record.payment);
            let existing: Option<PaymentRecord> = self.get(cf::PAYMENTS, &key)?;
            if should_apply(existing.as_ref()) {
                batch.put_cf(&cf_payments, &key, Self::serialize(record)?);
                applied = true;
            }
        }

        // Write atomically
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(applied)
    }
}
