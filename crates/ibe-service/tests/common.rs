//! Common test utilities for booking engine integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::NaiveDate;
use serde_json::{json, Value};

use ibe_core::{
    filter_payment_methods, BookingResult, Metadata, PaymentConfirmation, PaymentError,
    PaymentIntent, PaymentRequest, PaymentState, PaymentStatus, ProviderName, WebhookOutcome,
};
use ibe_service::email::{EmailError, EmailMessage, Mailer};
use ibe_service::pms::{
    DailyAvailability, InventorySource, OfferQuery, PmsError, ReservationRequest,
    ReservationSystem, UnitGroupAvailability,
};
use ibe_service::{create_router, AppState, PaymentProvider, ProviderRegistry, ServiceConfig};
use ibe_store::MemoryStore;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test_secret";

// ============================================================================
// Fake Payment Provider
// ============================================================================

/// In-process provider whose reported status can be changed by the test.
pub struct FakeProvider {
    name: ProviderName,
    status: Mutex<String>,
    amount_minor: i64,
    status_calls: AtomicUsize,
    last_request: Mutex<Option<PaymentRequest>>,
}

impl FakeProvider {
    pub fn new(name: ProviderName, status: &str, amount_minor: i64) -> Arc<Self> {
        Arc::new(Self {
            name,
            status: Mutex::new(status.to_string()),
            amount_minor,
            status_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PaymentRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn current(&self) -> (String, PaymentState) {
        let status = self.status.lock().unwrap().clone();
        let state = match status.as_str() {
            "succeeded" | "PAID" | "completed" => PaymentState::Succeeded,
            "canceled" | "FAILED" => PaymentState::Failed,
            _ => PaymentState::Pending,
        };
        (status, state)
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        *self.last_request.lock().unwrap() = Some(request.clone());

        let methods = filter_payment_methods(&request.payment_methods, self.supported_methods());
        let mut provider_specific = Metadata::new();
        provider_specific.insert("payment_method_types".into(), json!(methods));

        Ok(PaymentIntent {
            id: format!("pi_fake_{}", uuid::Uuid::new_v4().simple()),
            client_token: Some("pi_fake_secret".into()),
            status: "requires_payment_method".into(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            provider_specific,
        })
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<PaymentConfirmation, PaymentError> {
        let (status, state) = self.current();
        Ok(PaymentConfirmation {
            success: state == PaymentState::Succeeded,
            message: format!("Payment {status}"),
            status,
            payment_id: payment_id.to_string(),
            raw: Value::Null,
        })
    }

    async fn get_payment_status(&self, _payment_id: &str) -> Result<PaymentStatus, PaymentError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let (status, state) = self.current();
        Ok(PaymentStatus {
            paid: state == PaymentState::Succeeded,
            status,
            state,
            amount_minor: self.amount_minor,
            currency: "EUR".into(),
            payment_method: Some("card".into()),
            metadata: json!({}),
            raw: Value::Null,
        })
    }

    async fn handle_webhook(
        &self,
        payload: &str,
        _signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        let raw: Value = serde_json::from_str(payload)
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;
        Ok(WebhookOutcome::processed("fake".into(), None, raw))
    }
}

// ============================================================================
// Fake PMS
// ============================================================================

/// Reservation system that rejects reused idempotency keys.
#[derive(Default)]
pub struct FakePms {
    calls: AtomicUsize,
    keys: Mutex<HashMap<String, BookingResult>>,
    requests: Mutex<Vec<ReservationRequest>>,
    fail: AtomicBool,
    replay_reused_keys: AtomicBool,
    rendezvous: Mutex<Option<Arc<tokio::sync::Barrier>>>,
}

impl FakePms {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bookings(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ReservationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Answer a reused idempotency key with the original booking, as Apaleo
    /// does for a retried request.
    pub fn replay_reused_keys(&self) {
        self.replay_reused_keys.store(true, Ordering::SeqCst);
    }

    /// Hold every booking call until `callers` calls are in flight.
    pub fn rendezvous(&self, callers: usize) {
        *self.rendezvous.lock().unwrap() = Some(Arc::new(tokio::sync::Barrier::new(callers)));
    }
}

#[async_trait]
impl ReservationSystem for FakePms {
    async fn create_booking(
        &self,
        request: &ReservationRequest,
    ) -> Result<BookingResult, PmsError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        let rendezvous = self.rendezvous.lock().unwrap().clone();
        match rendezvous {
            Some(barrier) => {
                barrier.wait().await;
            }
            None => tokio::task::yield_now().await,
        }

        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(PmsError::Api {
                status: 422,
                message: "No availability for the requested unit group".into(),
            });
        }

        let mut keys = self.keys.lock().unwrap();
        if let Some(existing) = keys.get(&request.payment_id) {
            if self.replay_reused_keys.load(Ordering::SeqCst) {
                return Ok(existing.clone());
            }
            return Err(PmsError::Api {
                status: 409,
                message: format!("idempotency key {} already used", request.payment_id),
            });
        }

        let booking = BookingResult {
            booking_id: format!("BOOK-{n}"),
            reservation_number: format!("BOOK-{n}-1"),
            raw: json!({"id": format!("BOOK-{n}")}),
        };
        keys.insert(request.payment_id.clone(), booking.clone());
        Ok(booking)
    }
}

// ============================================================================
// Fake Inventory
// ============================================================================

/// Inventory with fixed answers.
#[derive(Default)]
pub struct FakeInventory {
    fail: AtomicBool,
}

impl FakeInventory {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn availability(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAvailability>, PmsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PmsError::Transport("connection refused".into()));
        }
        Ok(from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|date| DailyAvailability {
                date,
                total_sellable_count: 5,
                unit_groups: vec![
                    UnitGroupAvailability {
                        code: "DZ".into(),
                        sellable_count: 3,
                    },
                    UnitGroupAvailability {
                        code: "EZ".into(),
                        sellable_count: 2,
                    },
                ],
            })
            .collect())
    }

    async fn offers(&self, query: &OfferQuery) -> Result<Vec<Value>, PmsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PmsError::Transport("connection refused".into()));
        }
        Ok(vec![json!({
            "ratePlan": {"id": "STERN-DZ-FLEX", "code": "FLEX"},
            "arrival": query.arrival.to_string(),
            "departure": query.departure.to_string(),
            "adults": query.adults,
        })])
    }
}

// ============================================================================
// Fake Mailer
// ============================================================================

/// Mailer that records messages and can be told to fail.
#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl FakeMailer {
    pub fn failing() -> Arc<Self> {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::SeqCst);
        Arc::new(mailer)
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Api {
                status: 500,
                message: "mail relay unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Storage shared with the service.
    pub store: Arc<MemoryStore>,
    /// Stripe stand-in, `None` when the real adapter is used.
    pub stripe: Option<Arc<FakeProvider>>,
    /// `SumUp` stand-in.
    pub sumup: Arc<FakeProvider>,
    /// PMS stand-in.
    pub pms: Arc<FakePms>,
    /// Inventory stand-in.
    pub inventory: Arc<FakeInventory>,
    /// Mailer stand-in.
    pub mailer: Arc<FakeMailer>,
}

/// Configuration used by every harness.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: "/tmp/ibe-test".into(),
        public_site_url: "https://hotel.example".into(),
        admin_api_key: Some(ADMIN_KEY.into()),
        ..ServiceConfig::default()
    };
    config.stripe.secret_key = Some("sk_test_fake".into());
    config.stripe.webhook_secret = Some(STRIPE_WEBHOOK_SECRET.into());
    config
}

impl TestHarness {
    /// Harness with a fake Stripe reporting `succeeded` for 129.00 EUR.
    pub fn new() -> Self {
        Self::with_stripe_status("succeeded")
    }

    /// Harness with a fake Stripe reporting `status`.
    pub fn with_stripe_status(status: &str) -> Self {
        Self::build(
            test_config(),
            Some(FakeProvider::new(ProviderName::Stripe, status, 12900)),
            Arc::new(FakeMailer::default()),
        )
    }

    /// Harness using the real Stripe adapter (for signature checks).
    pub fn with_real_stripe() -> Self {
        Self::build(test_config(), None, Arc::new(FakeMailer::default()))
    }

    /// Harness with full control over configuration and collaborators.
    pub fn build(
        config: ServiceConfig,
        stripe: Option<Arc<FakeProvider>>,
        mailer: Arc<FakeMailer>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sumup = FakeProvider::new(ProviderName::SumUp, "PAID", 12900);
        let pms = Arc::new(FakePms::default());
        let inventory = Arc::new(FakeInventory::default());

        let registry = Arc::new(ProviderRegistry::new(config.clone(), reqwest::Client::new()));
        if let Some(stripe) = &stripe {
            registry.register(stripe.clone());
        }
        registry.register(sumup.clone());

        let state = AppState::with_components(
            config,
            store.clone(),
            registry,
            pms.clone(),
            inventory.clone(),
            mailer.clone(),
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            stripe,
            sumup,
            pms,
            inventory,
            mailer,
        }
    }

    /// A second service instance sharing this harness's store, PMS and mailer.
    pub fn second_instance(&self) -> TestServer {
        let config = test_config();
        let registry = Arc::new(ProviderRegistry::new(config.clone(), reqwest::Client::new()));
        if let Some(stripe) = &self.stripe {
            registry.register(stripe.clone());
        }
        registry.register(self.sumup.clone());

        let state = AppState::with_components(
            config,
            self.store.clone(),
            registry,
            self.pms.clone(),
            self.inventory.clone(),
            self.mailer.clone(),
        );
        TestServer::new(create_router(state)).expect("Failed to create test server")
    }

    /// Number of payments waiting for reconciliation.
    pub async fn reconciliation_count(&self) -> u64 {
        let response = self
            .server
            .get("/v1/admin/reconciliation")
            .add_header("x-admin-key", ADMIN_KEY)
            .await;
        response.assert_status_ok();
        response.json::<Value>()["count"].as_u64().unwrap()
    }

    /// The fake Stripe provider.
    pub fn stripe(&self) -> &FakeProvider {
        self.stripe.as_deref().expect("harness uses the real Stripe adapter")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Cart for two adults, 2025-07-01 to 2025-07-04, 129.00 EUR deposit.
pub fn cart() -> Value {
    json!({
        "personalData": {
            "firstName": "Anna",
            "lastName": "Schmidt",
            "email": "anna.schmidt@example.com",
            "phone": "+49 30 1234567",
            "street": "Hauptstr. 1",
            "zipCode": "10115",
            "city": "Berlin",
            "country": "DE",
            "comments": "Late arrival around 22:00"
        },
        "searchData": {
            "startDate": "2025-07-01",
            "endDate": "2025-07-04",
            "adults": 2,
            "children": 0
        },
        "calculatedAmounts": {
            "total": {"gross": 387.0},
            "deposit": {"gross": 129.0}
        },
        "ratePlan": {"longRatePlan": "STERN-DZ-FLEX"},
        "offer": {
            "title": "Doppelzimmer Komfort",
            "services": [
                {"name": "Frühstück", "code": "BRKF", "price": 18.5, "vat": 7, "selected": true}
            ]
        }
    })
}

/// Sign a Stripe webhook body the way Stripe does.
pub fn stripe_signature(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signature =
        ibe_service::crypto::hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    format!("t={timestamp},v1={signature}")
}
