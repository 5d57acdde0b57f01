//! Payment intent, confirmation, status and provider report integration tests.

mod common;

use common::TestHarness;
use serde_json::{json, Value};

use ibe_core::ProviderName;

// ============================================================================
// Payment Intent
// ============================================================================

#[tokio::test]
async fn create_payment_intent_returns_pending_intent() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payment-intent")
        .json(&json!({
            "amount": 129.00,
            "paymentMethods": ["card", "sepa_debit"],
            "metadata": {"bookingReference": "BOOKING-1"}
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["amount"], 129.0);
    assert_eq!(body["status"], "requires_payment_method");
    assert_eq!(body["provider"], "stripe");
    assert_eq!(body["currency"], "EUR");
    assert!(body["client_secret"].is_string());
    assert!(body["id"].as_str().unwrap().starts_with("pi_fake_"));
}

#[tokio::test]
async fn create_payment_intent_adds_audit_metadata() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/payment-intent")
        .json(&json!({"amount": 50.5, "metadata": {"bookingReference": "BOOKING-2"}}))
        .await
        .assert_status_ok();

    let request = harness.stripe().last_request().expect("provider was called");
    assert_eq!(request.amount_minor, 5050);
    assert_eq!(request.metadata["provider"], "stripe");
    assert_eq!(request.metadata["bookingReference"], "BOOKING-2");
    assert!(request.metadata["created_at"].is_string());
}

#[tokio::test]
async fn unknown_methods_fall_back_to_supported_set() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payment-intent")
        .json(&json!({"amount": 10.0, "paymentMethods": ["unknown_method"]}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let methods: Vec<String> =
        serde_json::from_value(body["provider_specific"]["payment_method_types"].clone())
            .unwrap();
    let supported: Vec<String> = ProviderName::Stripe
        .supported_methods()
        .iter()
        .map(|m| (*m).to_string())
        .collect();
    assert_eq!(methods, supported);
}

#[tokio::test]
async fn explicit_provider_overrides_active() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payment-intent")
        .json(&json!({"amount": 129.0, "provider": "sumup"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["provider"], "sumup");
    assert!(harness.sumup.last_request().is_some());
    assert!(harness.stripe().last_request().is_none());
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let harness = TestHarness::new();

    for amount in [0.0, -10.0] {
        let response = harness
            .server
            .post("/v1/payment-intent")
            .json(&json!({"amount": amount}))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
    assert!(harness.stripe().last_request().is_none());
}

// ============================================================================
// Payment Status
// ============================================================================

#[tokio::test]
async fn payment_status_reports_paid() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/payment-status")
        .add_query_param("paymentId", "pi_123")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["paid"], true);
    assert_eq!(body["amount"], 129.0);
    assert_eq!(body["currency"], "EUR");
}

#[tokio::test]
async fn payment_status_read_is_repeatable() {
    let harness = TestHarness::with_stripe_status("requires_action");

    let first: Value = harness
        .server
        .get("/v1/payment-status")
        .add_query_param("paymentId", "pi_123")
        .await
        .json();
    let second: Value = harness
        .server
        .get("/v1/payment-status")
        .add_query_param("paymentId", "pi_123")
        .await
        .json();

    assert_eq!(first["paid"], false);
    assert_eq!(first["paid"], second["paid"]);
    assert_eq!(first["status"], second["status"]);
    assert_eq!(harness.stripe().status_calls(), 2);
}

#[tokio::test]
async fn payment_status_requires_payment_id() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/payment-status").await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "bad_request");
}

// ============================================================================
// Confirm Payment
// ============================================================================

#[tokio::test]
async fn confirm_payment_reports_provider_status() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payment/confirm")
        .json(&json!({"paymentId": "pi_123"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["paymentId"], "pi_123");
}

// ============================================================================
// Provider Report
// ============================================================================

#[tokio::test]
async fn providers_report_lists_all_providers() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/providers").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["active"], "stripe");
    assert_eq!(body["supported"], json!(["stripe", "sumup", "adyen"]));

    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 3);

    let sumup = providers.iter().find(|p| p["name"] == "sumup").unwrap();
    assert_eq!(sumup["payment_methods"], json!(["card"]));
    assert_eq!(sumup["capabilities"]["bank_transfers"], false);

    // Adyen runs on the real adapter without credentials
    let adyen = providers.iter().find(|p| p["name"] == "adyen").unwrap();
    assert_eq!(adyen["configured"], false);
}
