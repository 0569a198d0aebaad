//! HTTP DTOs for the checkout endpoints.
//!
//! These types define the JSON request/response structure for the checkout
//! API. Responses use the `{success, data}` envelope the checkout page's
//! script expects; errors travel inside the envelope with HTTP 200 so the
//! script has one decode path.

use serde::{Deserialize, Serialize};

use crate::domain::{CheckoutForm, ValidationOutcome};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to validate the checkout form ahead of payment.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCheckoutRequest {
    pub session_id: String,
    /// Single-use request token; peeked but not consumed by validation.
    pub nonce: String,
    #[serde(flatten)]
    pub form: CheckoutForm,
}

/// Request to create a pending order from the submitted form.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub session_id: String,
    /// Single-use request token; consumed.
    pub nonce: String,
    #[serde(flatten)]
    pub form: CheckoutForm,
}

/// Request to finalize an order after iframe approval.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteOrderRequest {
    pub session_id: String,
    pub nonce: String,
    pub order_id: u64,
    pub paypal_order_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Query parameters on the redirect callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub order_id: u64,
    pub status: String,
    pub hash: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// The `{success, data}` envelope on every checkout response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error payload inside a `success: false` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub message: String,
    /// Per-field messages when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<std::collections::BTreeMap<String, String>>,
}

/// Response data for a successful validation call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub errors: std::collections::BTreeMap<String, String>,
}

impl From<ValidationOutcome> for ValidateResponse {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            valid: outcome.valid,
            errors: outcome.errors,
        }
    }
}

/// Response data for a created order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: u64,
    pub order_key: String,
    /// Opaque payload from the remote service, forwarded to the iframe.
    pub proxy_data: serde_json::Value,
}

/// Response data for a completed order.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteOrderResponse {
    pub redirect: String,
}
