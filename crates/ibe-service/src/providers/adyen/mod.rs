//! Adyen Checkout (sessions flow) adapter.

mod client;
pub mod types;

pub use client::AdyenProvider;
