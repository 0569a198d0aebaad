//! Inbound HTTP adapters.

pub mod checkout;
