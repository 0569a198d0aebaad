//! Payment proxy port: the storefront's view of the remote payment service.
//!
//! The remote service holds the PayPal credentials; the storefront only ever
//! registers orders with it and asks it to verify captures. Both operations
//! are single-attempt; a failure surfaces immediately and the caller must
//! not advance order status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Order;

/// Port for the remote payment service.
#[async_trait]
pub trait PaymentProxy: Send + Sync {
    /// Register an order ahead of payment so the remote service can match
    /// the eventual PayPal capture against it.
    async fn register_order(&self, order: &Order) -> Result<ProxyAck, ProxyError>;

    /// Confirm with the remote service that a PayPal capture actually
    /// occurred for this order. Only a successful ack may release goods.
    async fn verify_payment(
        &self,
        paypal_order_id: &str,
        order: &Order,
    ) -> Result<ProxyAck, ProxyError>;
}

/// Successful response from the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAck {
    /// Optional human-readable message from the service.
    pub message: Option<String>,

    /// Full response body; forwarded opaquely to the iframe as `proxy_data`.
    pub data: serde_json::Value,
}

/// Errors from payment proxy operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyError {
    pub code: ProxyErrorCode,
    pub message: String,
}

impl ProxyError {
    pub fn new(code: ProxyErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorCode::NetworkError, message)
    }

    pub fn bad_status(status: u16) -> Self {
        Self::new(
            ProxyErrorCode::BadStatus,
            format!("Proxy returned HTTP {}", status),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorCode::MalformedResponse, message)
    }

    /// Application-level rejection: the service answered `{success:false}`.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorCode::Rejected, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorCode::InvalidRequest, message)
    }
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProxyError {}

/// Proxy error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyErrorCode {
    /// Connection or transport failure.
    NetworkError,

    /// The request deadline elapsed.
    Timeout,

    /// Non-200 HTTP response.
    BadStatus,

    /// Response body was not valid JSON.
    MalformedResponse,

    /// Service answered with `{success:false}`.
    Rejected,

    /// Request could not be constructed.
    InvalidRequest,
}

impl std::fmt::Display for ProxyErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProxyErrorCode::NetworkError => "network_error",
            ProxyErrorCode::Timeout => "timeout",
            ProxyErrorCode::BadStatus => "bad_status",
            ProxyErrorCode::MalformedResponse => "malformed_response",
            ProxyErrorCode::Rejected => "rejected",
            ProxyErrorCode::InvalidRequest => "invalid_request",
        };
        write!(f, "{}", s)
    }
}
