//! Cross-window message contract between the checkout page and the hosted
//! payment iframe.
//!
//! Every message carries a `source` tag so unrelated postMessage traffic on
//! the page is ignored. Inbound events are additionally filtered by origin:
//! only messages from the iframe's exact origin are accepted unless the
//! policy was explicitly relaxed. Messages that fail any filter are dropped
//! silently; the page must not react to untrusted senders.

use serde_json::{json, Value};
use tracing::{debug, warn};

/// `source` tag on events sent by the payment iframe.
pub const IFRAME_SOURCE: &str = "paypal-proxy";

/// `source` tag on messages sent by the checkout page.
pub const PARENT_SOURCE: &str = "storefront";

/// Where outbound messages may be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostTarget {
    /// Deliver only to this origin. The default.
    Exact(String),

    /// Deliver to any origin. Opt-in for local development against hosts
    /// that rewrite origins; logged loudly when selected.
    Wildcard,
}

impl PostTarget {
    /// Target for the given iframe URL: its exact origin.
    pub fn for_iframe_url(url: &str) -> Option<Self> {
        origin_of(url).map(PostTarget::Exact)
    }

    /// The string handed to `postMessage` as targetOrigin.
    pub fn as_target_origin(&self) -> &str {
        match self {
            PostTarget::Exact(origin) => origin.as_str(),
            PostTarget::Wildcard => "*",
        }
    }
}

/// Derive the ASCII origin of a URL.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let origin = parsed.origin().ascii_serialization();
    // Opaque origins serialize as "null" and cannot be used as a target.
    if origin == "null" {
        return None;
    }
    Some(origin)
}

/// Payload of an approval event from the iframe.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ApprovalPayload {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "transactionID", default)]
    pub transaction_id: Option<String>,
}

/// Events the iframe sends to the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IframeEvent {
    /// PayPal buttons finished rendering inside the iframe.
    ButtonLoaded,

    /// The shopper clicked the PayPal button.
    ButtonClicked,

    /// The shopper approved the payment.
    OrderApproved(ApprovalPayload),

    /// The shopper dismissed the PayPal window.
    PaymentCancelled,

    /// The iframe reported a payment error.
    PaymentError { message: String },
}

impl IframeEvent {
    /// Parse a raw postMessage into an event.
    ///
    /// Returns `None` when the message is not for us: wrong origin, wrong
    /// source tag, or an unknown action. Dropping is silent apart from a
    /// debug line.
    pub fn parse(origin: &str, expected_origin: &PostTarget, raw: &Value) -> Option<Self> {
        if let PostTarget::Exact(expected) = expected_origin {
            if origin != expected {
                debug!(origin, expected, "dropping message from unexpected origin");
                return None;
            }
        }

        if raw.get("source").and_then(Value::as_str) != Some(IFRAME_SOURCE) {
            return None;
        }

        let action = raw.get("action").and_then(Value::as_str)?;
        match action {
            "button_loaded" => Some(IframeEvent::ButtonLoaded),
            "button_clicked" => Some(IframeEvent::ButtonClicked),
            "order_approved" => {
                let payload = raw.get("payload")?;
                match serde_json::from_value(payload.clone()) {
                    Ok(payload) => Some(IframeEvent::OrderApproved(payload)),
                    Err(e) => {
                        warn!(error = %e, "malformed order_approved payload");
                        None
                    }
                }
            }
            "payment_cancelled" => Some(IframeEvent::PaymentCancelled),
            "payment_error" => Some(IframeEvent::PaymentError {
                message: raw
                    .get("payload")
                    .and_then(|p| p.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("Payment failed")
                    .to_string(),
            }),
            other => {
                debug!(action = other, "ignoring unknown iframe action");
                None
            }
        }
    }
}

/// Messages the checkout page sends into the iframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentMessage {
    /// Hand the registered order to the iframe so it can create the PayPal
    /// order and open the approval flow.
    CreatePaypalOrder {
        order_id: u64,
        order_key: String,
        proxy_data: Value,
    },

    /// Order creation failed on the storefront; the iframe resets its
    /// buttons.
    OrderCreationFailed { message: String },

    /// Forward a submit-button click to the real PayPal button.
    TriggerPaypalButton,
}

impl ParentMessage {
    /// Serialize with the `source` tag the iframe filters on.
    pub fn to_json(&self) -> Value {
        match self {
            ParentMessage::CreatePaypalOrder {
                order_id,
                order_key,
                proxy_data,
            } => json!({
                "source": PARENT_SOURCE,
                "action": "create_paypal_order",
                "payload": {
                    "order_id": order_id,
                    "order_key": order_key,
                    "proxy_data": proxy_data,
                },
            }),
            ParentMessage::OrderCreationFailed { message } => json!({
                "source": PARENT_SOURCE,
                "action": "order_creation_failed",
                "payload": { "message": message },
            }),
            ParentMessage::TriggerPaypalButton => json!({
                "source": PARENT_SOURCE,
                "action": "trigger_paypal_button",
            }),
        }
    }
}
