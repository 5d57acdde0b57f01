//! Webhook receiver, verification challenge and `SumUp` return integration tests.

mod common;

use common::{stripe_signature, TestHarness, STRIPE_WEBHOOK_SECRET};
use serde_json::{json, Value};

use ibe_core::{PaymentRef, PaymentState, ProviderName};
use ibe_store::Store;

fn stripe_event(event_id: &str, event_type: &str, payment_id: &str) -> String {
    json!({
        "id": event_id,
        "type": event_type,
        "data": {"object": {"id": payment_id, "object": "payment_intent"}}
    })
    .to_string()
}

fn stored_state(harness: &TestHarness, payment_id: &str) -> Option<PaymentState> {
    provider_state(harness, ProviderName::Stripe, payment_id)
}

fn provider_state(
    harness: &TestHarness,
    provider: ProviderName,
    payment_id: &str,
) -> Option<PaymentState> {
    harness
        .store
        .get_payment_record(&PaymentRef {
            provider,
            payment_id: payment_id.into(),
        })
        .unwrap()
        .map(|r| r.state)
}

fn adyen_item(psp_reference: &str, session_id: &str, success: &str) -> Value {
    json!({
        "NotificationRequestItem": {
            "additionalData": {"checkoutSessionId": session_id},
            "amount": {"currency": "EUR", "value": 12900},
            "eventCode": "AUTHORISATION",
            "merchantAccountCode": "HotelSternECOM",
            "merchantReference": "BOOKING-1",
            "pspReference": psp_reference,
            "success": success
        }
    })
}

// ============================================================================
// Signature Verification
// ============================================================================

#[tokio::test]
async fn invalid_stripe_signature_is_rejected() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_bad", "payment_intent.succeeded", "pi_1");

    let response = harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header("stripe-signature", stripe_signature(&payload, "whsec_wrong"))
        .text(payload)
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "invalid_signature");
    assert_eq!(stored_state(&harness, "pi_1"), None);
}

#[tokio::test]
async fn unsigned_stripe_webhook_is_rejected() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_nosig", "payment_intent.succeeded", "pi_1");

    let response = harness
        .server
        .post("/v1/webhooks")
        .add_query_param("provider", "stripe")
        .text(payload)
        .await;

    response.assert_status_bad_request();
    assert_eq!(stored_state(&harness, "pi_1"), None);
}

// ============================================================================
// Event Processing
// ============================================================================

#[tokio::test]
async fn signed_success_event_updates_payment_state() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_1", "payment_intent.succeeded", "pi_1");

    // Provider inferred from the signature header
    let response = harness
        .server
        .post("/v1/webhooks")
        .add_header(
            "stripe-signature",
            stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
        )
        .text(payload)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["event_type"], "payment_intent.succeeded");
    assert_eq!(stored_state(&harness, "pi_1"), Some(PaymentState::Succeeded));
}

#[tokio::test]
async fn failed_payment_event_is_acknowledged_with_success_false() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_2", "payment_intent.payment_failed", "pi_2");

    let response = harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
        )
        .text(payload)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["event_type"], "payment_intent.payment_failed");
    assert_eq!(stored_state(&harness, "pi_2"), Some(PaymentState::Failed));
}

#[tokio::test]
async fn other_events_are_processed_without_state_change() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_3", "payment_intent.created", "pi_3");

    let response = harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
        )
        .text(payload)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(stored_state(&harness, "pi_3"), None);
}

// ============================================================================
// Deduplication
// ============================================================================

#[tokio::test]
async fn duplicate_event_is_a_no_op() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_dup", "payment_intent.succeeded", "pi_dup");

    for _ in 0..2 {
        harness
            .server
            .post("/v1/webhooks/stripe")
            .add_header(
                "stripe-signature",
                stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
            )
            .text(payload.clone())
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
        )
        .text(payload)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Duplicate event ignored");
    assert!(harness
        .store
        .has_webhook_event(ProviderName::Stripe, "evt_dup")
        .unwrap());
}

#[tokio::test]
async fn every_item_of_an_adyen_batch_is_recorded() {
    let harness = TestHarness::new();
    let payload = json!({
        "live": "false",
        "notificationItems": [
            adyen_item("PSP1", "CS123", "true"),
            adyen_item("PSP2", "CS456", "false")
        ]
    })
    .to_string();

    let response = harness
        .server
        .post("/v1/webhooks/adyen")
        .text(payload)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["event_type"], "AUTHORISATION");

    assert_eq!(
        provider_state(&harness, ProviderName::Adyen, "CS123"),
        Some(PaymentState::Succeeded)
    );
    assert_eq!(
        provider_state(&harness, ProviderName::Adyen, "CS456"),
        Some(PaymentState::Failed)
    );
    assert!(harness
        .store
        .has_webhook_event(ProviderName::Adyen, "PSP2:AUTHORISATION:false")
        .unwrap());
}

#[tokio::test]
async fn late_event_for_final_payment_is_ignored() {
    let harness = TestHarness::with_real_stripe();

    let succeeded = stripe_event("evt_a", "payment_intent.succeeded", "pi_final");
    harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&succeeded, STRIPE_WEBHOOK_SECRET),
        )
        .text(succeeded)
        .await
        .assert_status_ok();

    let failed = stripe_event("evt_b", "payment_intent.payment_failed", "pi_final");
    let response = harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&failed, STRIPE_WEBHOOK_SECRET),
        )
        .text(failed)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Payment already final, event ignored");
    assert_eq!(
        stored_state(&harness, "pi_final"),
        Some(PaymentState::Succeeded)
    );
}

#[tokio::test]
async fn expired_events_are_purged() {
    let harness = TestHarness::with_real_stripe();
    let payload = stripe_event("evt_old", "payment_intent.succeeded", "pi_old");

    harness
        .server
        .post("/v1/webhooks/stripe")
        .add_header(
            "stripe-signature",
            stripe_signature(&payload, STRIPE_WEBHOOK_SECRET),
        )
        .text(payload)
        .await
        .assert_status_ok();

    // Nothing is older than the retention window yet
    let purged = ibe_service::state::purge_webhook_events(harness.store.as_ref(), 72).unwrap();
    assert_eq!(purged, 0);

    // A negative window puts the cutoff in the future
    let purged = ibe_service::state::purge_webhook_events(harness.store.as_ref(), -1).unwrap();
    assert_eq!(purged, 1);
    assert!(!harness
        .store
        .has_webhook_event(ProviderName::Stripe, "evt_old")
        .unwrap());
}

// ============================================================================
// Verification Challenge
// ============================================================================

#[tokio::test]
async fn challenge_is_echoed_verbatim() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/webhooks")
        .add_query_param("hub_challenge", "abc123")
        .await;

    response.assert_status_ok();
    response.assert_text("abc123");
}

#[tokio::test]
async fn provider_challenge_is_echoed() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/webhooks/sumup")
        .add_query_param("verification", "token-42")
        .await;

    response.assert_status_ok();
    response.assert_text("token-42");
}

#[tokio::test]
async fn get_without_challenge_reports_endpoint_active() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/webhooks").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Webhook endpoint is active");
}

// ============================================================================
// SumUp Return
// ============================================================================

#[tokio::test]
async fn sumup_return_redirects_with_verified_status() {
    let harness = TestHarness::new();
    harness.sumup.set_status("PENDING");

    let response = harness
        .server
        .get("/v1/sumup/return")
        .add_query_param("checkout_id", "chk_1")
        .await;

    response.assert_status(axum::http::StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        "https://hotel.example/booking-confirmation?payment_provider=sumup&status=PENDING&checkout_id=chk_1"
    );
    assert_eq!(harness.sumup.status_calls(), 1);
}

#[tokio::test]
async fn sumup_return_without_checkout_fails() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/sumup/return").await;

    response.assert_status(axum::http::StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        "https://hotel.example/booking-failed?error=missing_checkout_id"
    );
}
