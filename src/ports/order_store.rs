//! Order store port.
//!
//! The storefront's order records live behind this trait; the payment flow
//! only needs a handful of operations on them. Status updates go through the
//! store so the transition rules in the domain layer are enforced in one
//! place.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Address, LineItem, Order, OrderId, OrderKey, OrderStatus, ShippingLine};

/// Fields needed to create an order. Id and timestamps are assigned by the
/// store; new orders always start out pending.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub key: OrderKey,
    pub currency: String,
    pub payment_method: String,
    pub billing: Address,
    pub shipping: Address,
    pub items: Vec<LineItem>,
    pub shipping_lines: Vec<ShippingLine>,
}

/// Payment identifiers recorded when an order is marked paid.
#[derive(Debug, Clone, Default)]
pub struct PaymentReference {
    pub paypal_order_id: Option<String>,
    pub transaction_id: Option<String>,
}

/// Result of a mark-paid attempt.
///
/// Marking an already-paid order is not an error at this level; callers
/// decide whether to treat the repeat as idempotent success.
#[derive(Debug, Clone)]
pub enum MarkPaidOutcome {
    Marked(Order),
    AlreadyPaid(Order),
}

impl MarkPaidOutcome {
    pub fn order(&self) -> &Order {
        match self {
            MarkPaidOutcome::Marked(order) | MarkPaidOutcome::AlreadyPaid(order) => order,
        }
    }
}

/// Errors from order store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order store error: {0}")]
    Backend(String),
}

/// Port for the storefront's order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create a pending order and assign it an id.
    async fn create(&self, new_order: NewOrder) -> Result<Order, StoreError>;

    /// Load an order by id.
    async fn find(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Append a shipping line to an existing order.
    async fn add_shipping_line(
        &self,
        id: OrderId,
        line: ShippingLine,
    ) -> Result<Order, StoreError>;

    /// Record payment on the order. At most once; a repeat reports
    /// `AlreadyPaid` with the stored order untouched.
    async fn mark_paid(
        &self,
        id: OrderId,
        reference: PaymentReference,
    ) -> Result<MarkPaidOutcome, StoreError>;

    /// Move the order to `status`, validating the transition. Setting the
    /// current status again is a no-op.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, StoreError>;
}
