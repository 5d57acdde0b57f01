//! Availability and offers integration tests.

mod common;

use common::TestHarness;
use serde_json::Value;

// ============================================================================
// Availability
// ============================================================================

#[tokio::test]
async fn availability_lists_each_night() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/availability")
        .add_query_param("from", "2025-07-01")
        .add_query_param("to", "2025-07-03")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let days = body["availability"].as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["date"], "2025-07-01");
    assert_eq!(days[0]["totalSellableCount"], 5);
    assert_eq!(days[0]["unitGroups"][0]["code"], "DZ");
    assert_eq!(days[0]["unitGroups"][0]["sellableCount"], 3);
}

#[tokio::test]
async fn availability_rejects_reversed_range() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/availability")
        .add_query_param("from", "2025-07-03")
        .add_query_param("to", "2025-07-01")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn availability_rejects_malformed_dates() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/availability")
        .add_query_param("from", "July 1st")
        .add_query_param("to", "2025-07-03")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn availability_failure_is_reported() {
    let harness = TestHarness::new();
    harness.inventory.fail();

    let response = harness
        .server
        .get("/v1/availability")
        .add_query_param("from", "2025-07-01")
        .add_query_param("to", "2025-07-03")
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
}

// ============================================================================
// Offers
// ============================================================================

#[tokio::test]
async fn offers_are_returned() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/offers")
        .add_query_param("arrival", "2025-07-01")
        .add_query_param("departure", "2025-07-04")
        .add_query_param("adults", 2)
        .add_query_param("childrenAges", "4,7")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["offers"].as_array().unwrap().len(), 1);
    assert_eq!(body["offers"][0]["ratePlan"]["id"], "STERN-DZ-FLEX");
}

#[tokio::test]
async fn missing_offer_params_answer_empty_list() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/offers")
        .add_query_param("arrival", "2025-07-01")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["offers"], serde_json::json!([]));
}

#[tokio::test]
async fn offers_failure_answers_empty_list() {
    let harness = TestHarness::new();
    harness.inventory.fail();

    let response = harness
        .server
        .get("/v1/offers")
        .add_query_param("arrival", "2025-07-01")
        .add_query_param("departure", "2025-07-04")
        .add_query_param("adults", 2)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["offers"], serde_json::json!([]));
}
