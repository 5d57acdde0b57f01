//! Stripe `PaymentIntents` adapter.

mod client;
pub mod types;

pub use client::StripeProvider;
