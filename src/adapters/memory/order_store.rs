//! In-memory order store.
//!
//! Backing store for tests and single-process deployments. Ids are assigned
//! from a process-local counter; all mutation goes through a single write
//! lock so status checks and updates are atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{Order, OrderId, OrderStatus, ShippingLine};
use crate::ports::{MarkPaidOutcome, NewOrder, OrderStore, PaymentReference, StoreError};

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<u64, Order>>,
    next_id: AtomicU64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, new_order: NewOrder) -> Result<Order, StoreError> {
        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let order = Order {
            id,
            key: new_order.key,
            currency: new_order.currency,
            status: OrderStatus::Pending,
            payment_method: new_order.payment_method,
            billing: new_order.billing,
            shipping: new_order.shipping,
            items: new_order.items,
            shipping_lines: new_order.shipping_lines,
            paypal_order_id: None,
            transaction_id: None,
            paid: false,
            created_at: Utc::now(),
        };

        self.orders.write().await.insert(id.value(), order.clone());
        debug!(order_id = id.value(), "order created");
        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id.value()).cloned())
    }

    async fn add_shipping_line(
        &self,
        id: OrderId,
        line: ShippingLine,
    ) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id.value())
            .ok_or(StoreError::NotFound(id))?;
        order.shipping_lines.push(line);
        Ok(order.clone())
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        reference: PaymentReference,
    ) -> Result<MarkPaidOutcome, StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id.value())
            .ok_or(StoreError::NotFound(id))?;

        if order.paid {
            return Ok(MarkPaidOutcome::AlreadyPaid(order.clone()));
        }
        order
            .mark_paid(reference.paypal_order_id, reference.transaction_id)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(order_id = id.value(), "order marked paid");
        Ok(MarkPaidOutcome::Marked(order.clone()))
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id.value())
            .ok_or(StoreError::NotFound(id))?;

        if order.status != status {
            order.status = order.status.transition_to(status).map_err(|_| {
                StoreError::InvalidTransition {
                    from: order.status,
                    to: status,
                }
            })?;
            debug!(order_id = id.value(), status = %status, "order status updated");
        }
        Ok(order.clone())
    }
}
