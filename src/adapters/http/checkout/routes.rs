//! Axum router configuration for checkout endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    complete_order, create_order, payment_callback, validate_checkout, CheckoutAppState,
};

/// Create the checkout API router.
///
/// # Routes
///
/// ## Checkout page endpoints (JSON envelope responses)
/// - `POST /validate` - Validate the checkout form ahead of payment
/// - `POST /create-order` - Create a pending order and register it upstream
/// - `POST /complete-order` - Verify the capture and finalize the order
///
/// ## Browser redirect endpoints
/// - `GET /callback` - Redirect target for the remote payment service
pub fn checkout_routes() -> Router<CheckoutAppState> {
    Router::new()
        .route("/validate", post(validate_checkout))
        .route("/create-order", post(create_order))
        .route("/complete-order", post(complete_order))
        .route("/callback", get(payment_callback))
}

/// Create the complete checkout module router, suitable for mounting at the
/// application root.
pub fn checkout_router() -> Router<CheckoutAppState> {
    Router::new().nest("/checkout", checkout_routes())
}
