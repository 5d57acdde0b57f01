//! Hotel booking engine HTTP API service.
//!
//! This crate provides the HTTP API of the booking engine, including:
//!
//! - Payment intents, confirmation and status across Stripe, `SumUp` and Adyen
//! - Booking confirmation: verify payment, reserve in Apaleo, email the guest
//! - Provider webhooks with event deduplication
//! - Availability and offer lookups
//!
//! # Providers
//!
//! The active provider is chosen by `PAYMENT_PROVIDER`. Requests may name a
//! different provider explicitly; adapters are created lazily and cached by
//! the [`ProviderRegistry`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers stay async for a uniform router

pub mod auth;
pub mod booking;
pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod handlers;
pub mod payment;
pub mod pms;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod state;

pub use booking::{BookingConfirmation, BookingOrchestrator, ConfirmBooking};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use payment::PaymentService;
pub use providers::PaymentProvider;
pub use registry::ProviderRegistry;
pub use routes::create_router;
pub use state::AppState;
