//! PayPal Proxy Client - Delegated PayPal checkout for storefronts
//!
//! This crate lets a storefront without PayPal credentials accept PayPal
//! payments by delegating the capture to a trusted partner site. The
//! storefront registers orders with the partner over an HMAC-signed
//! handshake, embeds the partner's hosted PayPal buttons in an iframe, and
//! only releases an order once the partner has verified the capture.

pub mod adapters;
pub mod application;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod ports;
