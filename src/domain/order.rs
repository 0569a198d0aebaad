//! Order model shared between the orchestrator and the order store.
//!
//! The order store itself is external; these types cover only the fields the
//! payment flow reads and mutates. Monetary amounts are carried in minor
//! units (cents) and rendered as decimal strings on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque order identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(u64);

impl OrderId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque order token used for idempotent lookups and receipt URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey(String);

impl OrderKey {
    /// Generate a fresh key from a v4 UUID.
    pub fn generate() -> Self {
        Self(format!("order_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a minor-unit amount as a two-decimal string, e.g. `1999` → `"19.99"`.
pub fn format_amount(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, (minor % 100).abs())
}

/// Billing or shipping address snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postcode: String,
    pub country: String,
}

impl Address {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A product line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    pub name: String,
    pub quantity: u32,
    /// Unit price in minor units.
    pub unit_price_minor: i64,
    /// Line total in minor units.
    pub line_total_minor: i64,
    #[serde(default)]
    pub sku: String,
}

/// A shipping charge on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLine {
    pub method_id: String,
    pub method_title: String,
    /// Shipping cost in minor units.
    pub total_minor: i64,
}

/// Order lifecycle status.
///
/// Transitions are monotonic forward except explicit cancellation; terminal
/// states accept no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// Returns true if transition from self to target is valid.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Cancelled)
        )
    }

    /// Returns all valid target states from the current state.
    pub fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Processing, Completed, Cancelled, Failed],
            Processing => vec![Completed, Cancelled],
            Completed | Cancelled | Failed => vec![],
        }
    }

    /// Performs the transition with validation.
    pub fn transition_to(&self, target: Self) -> Result<Self, OrderError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(OrderError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// No valid outgoing transitions remain.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Wire representation used in callback hashes and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by order-level invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is already paid")]
    AlreadyPaid,
}

/// An order as seen by the payment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub key: OrderKey,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_method: String,
    pub billing: Address,
    pub shipping: Address,
    pub items: Vec<LineItem>,
    pub shipping_lines: Vec<ShippingLine>,
    /// PayPal's order identifier, recorded at completion.
    pub paypal_order_id: Option<String>,
    /// Capture transaction identifier, recorded at completion.
    pub transaction_id: Option<String>,
    /// Set exactly once, when payment is confirmed.
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn items_total_minor(&self) -> i64 {
        self.items.iter().map(|i| i.line_total_minor).sum()
    }

    pub fn shipping_total_minor(&self) -> i64 {
        self.shipping_lines.iter().map(|l| l.total_minor).sum()
    }

    pub fn total_minor(&self) -> i64 {
        self.items_total_minor() + self.shipping_total_minor()
    }

    /// Total as the decimal string used in signed requests.
    pub fn total_string(&self) -> String {
        format_amount(self.total_minor())
    }

    pub fn customer_email(&self) -> &str {
        self.billing.email.as_deref().unwrap_or("")
    }

    pub fn customer_name(&self) -> String {
        self.billing.full_name()
    }

    /// Record payment on the order. Fails if the order was already paid.
    pub fn mark_paid(
        &mut self,
        paypal_order_id: Option<String>,
        transaction_id: Option<String>,
    ) -> Result<(), OrderError> {
        if self.paid {
            return Err(OrderError::AlreadyPaid);
        }
        self.paid = true;
        if paypal_order_id.is_some() {
            self.paypal_order_id = paypal_order_id;
        }
        if transaction_id.is_some() {
            self.transaction_id = transaction_id;
        }
        Ok(())
    }
}
