//! HTTP client for the remote payment service.
//!
//! All requests are GETs against the service's `/wppps/v1` namespace and
//! carry `{api_key, timestamp, hash}` plus scheme-specific parameters.
//! Structured payloads travel as base64-encoded JSON in a single query
//! parameter. Requests are single-attempt with a 30 second timeout; any
//! failure is surfaced to the caller and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{format_amount, Order, RequestSigner};
use crate::ports::{PaymentProxy, ProxyAck, ProxyError};

/// Per-request deadline covering connect, send and read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the remote payment service's handshake endpoints.
pub struct ProxyHttpClient {
    base_url: String,
    site_url: String,
    signer: RequestSigner,
    http: reqwest::Client,
}

// ════════════════════════════════════════════════════════════════════════════
// Wire payloads
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct OrderEnvelope<'a> {
    order_id: u64,
    order_key: &'a str,
    order_total: String,
    currency: &'a str,
    customer_email: &'a str,
    customer_name: String,
    items: Vec<ItemEnvelope<'a>>,
    site_url: &'a str,
}

#[derive(Debug, Serialize)]
struct ItemEnvelope<'a> {
    product_id: u64,
    name: &'a str,
    quantity: u32,
    price: String,
    line_total: String,
    sku: &'a str,
}

impl ProxyHttpClient {
    pub fn new(base_url: impl Into<String>, site_url: impl Into<String>, signer: RequestSigner) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            site_url: site_url.into(),
            signer,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/wppps/v1/{}", self.base_url, name)
    }

    /// URL for the hosted PayPal buttons iframe, with the amount and
    /// currency bound into the signed session.
    pub fn buttons_url(
        &self,
        amount: &str,
        currency: &str,
        callback_url: &str,
        page_title: &str,
    ) -> Result<String, ProxyError> {
        let timestamp = Utc::now().timestamp();
        let hash = self.signer.sign_button_session(timestamp, amount, currency);

        let mut url = reqwest::Url::parse(&self.endpoint("paypal-buttons"))
            .map_err(|e| ProxyError::invalid_request(format!("invalid proxy URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api_key", self.signer.api_key())
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("hash", &hash)
            .append_pair("amount", amount)
            .append_pair("currency", currency)
            .append_pair("callback_url", &BASE64.encode(callback_url))
            .append_pair("site_url", &BASE64.encode(&self.site_url))
            .append_pair("page_title", page_title);
        Ok(url.into())
    }

    /// Issue a signed GET and decode the `{success, ...}` envelope.
    async fn send(
        &self,
        operation: &str,
        url: reqwest::Url,
    ) -> Result<ProxyAck, ProxyError> {
        debug!(operation, "sending proxy request");

        let response = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                warn!(operation, error = %e, "proxy request failed");
                if e.is_timeout() {
                    ProxyError::new(
                        crate::ports::ProxyErrorCode::Timeout,
                        format!("{} timed out after {}s", operation, REQUEST_TIMEOUT.as_secs()),
                    )
                } else {
                    ProxyError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(operation, status = status.as_u16(), "proxy returned error status");
            return Err(ProxyError::bad_status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProxyError::malformed(e.to_string()))?;

        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(String::from);

        if !success {
            // HTTP 200 with success:false is how the service reports
            // application-level rejections.
            let reason = message.unwrap_or_else(|| format!("{} rejected by proxy", operation));
            warn!(operation, reason = %reason, "proxy rejected request");
            return Err(ProxyError::rejected(reason));
        }

        debug!(operation, "proxy request succeeded");
        Ok(ProxyAck { message, data: body })
    }
}

#[async_trait]
impl PaymentProxy for ProxyHttpClient {
    async fn register_order(&self, order: &Order) -> Result<ProxyAck, ProxyError> {
        let timestamp = Utc::now().timestamp();
        let order_total = order.total_string();
        let hash =
            self.signer
                .sign_order_registration(timestamp, order.id.value(), &order_total);

        let envelope = OrderEnvelope {
            order_id: order.id.value(),
            order_key: order.key.as_str(),
            order_total: order_total.clone(),
            currency: &order.currency,
            customer_email: order.customer_email(),
            customer_name: order.customer_name(),
            items: order
                .items
                .iter()
                .map(|item| ItemEnvelope {
                    product_id: item.product_id,
                    name: &item.name,
                    quantity: item.quantity,
                    price: format_amount(item.unit_price_minor),
                    line_total: format_amount(item.line_total_minor),
                    sku: &item.sku,
                })
                .collect(),
            site_url: &self.site_url,
        };
        let order_data = serde_json::to_string(&envelope)
            .map_err(|e| ProxyError::invalid_request(e.to_string()))?;

        let mut url = reqwest::Url::parse(&self.endpoint("register-order"))
            .map_err(|e| ProxyError::invalid_request(format!("invalid proxy URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api_key", self.signer.api_key())
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("hash", &hash)
            .append_pair("order_data", &BASE64.encode(order_data));

        self.send("register-order", url).await
    }

    async fn verify_payment(
        &self,
        paypal_order_id: &str,
        order: &Order,
    ) -> Result<ProxyAck, ProxyError> {
        let timestamp = Utc::now().timestamp();
        let hash =
            self.signer
                .sign_payment_verification(timestamp, paypal_order_id, order.id.value());

        let mut url = reqwest::Url::parse(&self.endpoint("verify-payment"))
            .map_err(|e| ProxyError::invalid_request(format!("invalid proxy URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api_key", self.signer.api_key())
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("hash", &hash)
            .append_pair("paypal_order_id", paypal_order_id)
            .append_pair("order_id", &order.id.value().to_string())
            .append_pair("order_total", &order.total_string())
            .append_pair("currency", &order.currency);

        self.send("verify-payment", url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_client() -> ProxyHttpClient {
        ProxyHttpClient::new(
            "https://proxy.example.com/",
            "https://shop.example.com",
            RequestSigner::new("key_test", SecretString::new("secret_test".to_string())),
        )
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = test_client();
        assert_eq!(
            client.endpoint("register-order"),
            "https://proxy.example.com/wppps/v1/register-order"
        );
    }

    #[test]
    fn buttons_url_carries_signed_session() {
        let client = test_client();
        let url = client
            .buttons_url(
                "19.99",
                "USD",
                "https://shop.example.com/checkout/callback",
                "Checkout",
            )
            .unwrap();

        let parsed = reqwest::Url::parse(&url).unwrap();
        assert!(parsed.path().ends_with("/wppps/v1/paypal-buttons"));

        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().collect();
        assert_eq!(pairs.get("api_key").map(AsRef::as_ref), Some("key_test"));
        assert_eq!(pairs.get("amount").map(AsRef::as_ref), Some("19.99"));
        assert_eq!(pairs.get("currency").map(AsRef::as_ref), Some("USD"));
        assert!(pairs.contains_key("timestamp"));
        assert!(pairs.contains_key("hash"));

        // URLs travel base64-encoded.
        let callback = pairs.get("callback_url").unwrap();
        let decoded = BASE64.decode(callback.as_bytes()).unwrap();
        assert_eq!(decoded, b"https://shop.example.com/checkout/callback");
    }

    #[test]
    fn buttons_url_hash_verifies() {
        let client = test_client();
        let url = client.buttons_url("5.00", "EUR", "https://cb", "t").unwrap();
        let parsed = reqwest::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().collect();

        let timestamp: i64 = pairs.get("timestamp").unwrap().parse().unwrap();
        let signer = RequestSigner::new("key_test", SecretString::new("secret_test".to_string()));
        let expected = signer.sign_button_session(timestamp, "5.00", "EUR");
        assert_eq!(pairs.get("hash").map(AsRef::as_ref), Some(expected.as_str()));
    }

    #[test]
    fn order_envelope_serializes_amounts_as_strings() {
        let envelope = ItemEnvelope {
            product_id: 7,
            name: "Widget",
            quantity: 2,
            price: format_amount(500),
            line_total: format_amount(1000),
            sku: "W-7",
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["price"], "5.00");
        assert_eq!(json["line_total"], "10.00");
    }
}
