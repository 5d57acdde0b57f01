//! `SumUp` hosted checkout adapter.

mod client;
pub mod types;

pub use client::SumUpProvider;
