//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, booking, health, inventory, payments, providers, sumup, webhooks};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent booking confirmations.
/// Each one holds a PMS call open, so they get a tighter limit.
const BOOKING_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Payments
/// - `POST /v1/payment-intent` - Open a payment with a provider
/// - `POST /v1/payment/confirm` - Run the provider's confirmation step
/// - `GET /v1/payment-status` - Read a payment's status
/// - `GET /v1/providers` - Active provider and capability report
///
/// ## Booking (rate-limited)
/// - `POST /v1/confirm-booking` - Verify payment, reserve, send confirmation
///
/// ## Inventory
/// - `GET /v1/availability` - Sellable units per night
/// - `GET /v1/offers` - Bookable offers for a stay
///
/// ## Admin (API key auth)
/// - `GET /v1/admin/reconciliation` - Captured payments without a reservation
///
/// ## Provider callbacks (no rate limit)
/// - `POST /v1/webhooks`, `POST /v1/webhooks/:provider` - Payment webhooks
/// - `GET /v1/webhooks`, `GET /v1/webhooks/:provider` - Registration challenge
/// - `GET /v1/sumup/return` - `SumUp` hosted checkout return
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let booking_routes = Router::new()
        .route("/", post(booking::confirm_booking))
        .layer(ConcurrencyLimitLayer::new(BOOKING_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Payments
        .route("/payment-intent", post(payments::create_payment_intent))
        .route("/payment/confirm", post(payments::confirm_payment))
        .route("/payment-status", get(payments::get_payment_status))
        .route("/providers", get(providers::list_providers))
        // Booking (with its own concurrency limit)
        .nest("/confirm-booking", booking_routes)
        // Inventory
        .route("/availability", get(inventory::get_availability))
        .route("/offers", get(inventory::get_offers))
        // Admin
        .route("/admin/reconciliation", get(admin::list_reconciliation))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    // Provider callbacks (no rate limit - controlled by external services)
    let callback_routes = Router::new()
        .route(
            "/webhooks",
            post(webhooks::receive_webhook).get(webhooks::webhook_challenge),
        )
        .route(
            "/webhooks/:provider",
            post(webhooks::receive_provider_webhook).get(webhooks::provider_webhook_challenge),
        )
        .route("/sumup/return", get(sumup::sumup_return));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes.merge(callback_routes))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
