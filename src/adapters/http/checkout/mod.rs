//! HTTP adapter for the checkout endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::CheckoutAppState;
pub use routes::{checkout_router, checkout_routes};
