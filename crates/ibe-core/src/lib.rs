//! Core types for the hotel booking engine.
//!
//! This crate provides the foundational types shared by the store and the
//! HTTP service:
//!
//! - **Providers**: `ProviderName`, `Capabilities`
//! - **Payments**: `PaymentIntent`, `PaymentStatus`, `PaymentConfirmation`, `WebhookOutcome`
//! - **Cart**: `Cart`, `PersonalData`, `SearchData`, `Offer`
//! - **Bookings**: `BookingResult`, `BookingState`, `BookingRun`, `ReconciliationItem`
//! - **Errors**: `PaymentError`, `BookingError`
//!
//! # Amounts
//!
//! Amounts travel as `i64` minor units (cents). Decimal amounts only appear at
//! the HTTP boundary and inside the client-supplied cart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod booking;
pub mod cart;
pub mod error;
pub mod payment;
pub mod provider;

pub use booking::{
    BookingRecord, BookingResult, BookingRun, BookingState, InvalidTransition, ReconciliationItem,
};
pub use cart::{
    CalculatedAmounts, Cart, GrossAmount, Guest, Offer, OfferService, PersonalData, RatePlan,
    SearchData,
};
pub use error::{BookingError, PaymentError};
pub use payment::{
    filter_payment_methods, from_minor_units, to_minor_units, Metadata, PaymentConfirmation,
    PaymentIntent, PaymentRecord, PaymentRef, PaymentRequest, PaymentState, PaymentStatus,
    ProcessedEvent, WebhookOutcome,
};
pub use provider::{Capabilities, ProviderName, UnsupportedProvider};
