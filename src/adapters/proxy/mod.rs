//! Outbound adapter for the remote payment service.

pub mod client;

pub use client::ProxyHttpClient;
