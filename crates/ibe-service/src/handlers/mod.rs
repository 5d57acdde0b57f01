//! API handlers.

pub mod admin;
pub mod booking;
pub mod health;
pub mod inventory;
pub mod payments;
pub mod providers;
pub mod sumup;
pub mod webhooks;
