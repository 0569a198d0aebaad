//! Redirect callback handler.
//!
//! The remote payment service sends the shopper's browser back here after a
//! redirect-style payment, carrying the outcome and an HMAC over
//! `{order_id, status, api_key}`. The hash proves the parameters were not
//! tampered with in transit through the browser; a bad hash is rejected
//! before any order is touched.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::StorefrontConfig;
use crate::domain::{OrderId, OrderStatus, RequestSigner};
use crate::ports::{MarkPaidOutcome, OrderStore, PaymentReference, StoreError};

/// Parameters carried on the callback redirect.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    pub order_id: u64,
    pub status: String,
    pub hash: String,
}

/// Errors surfaced by callback handling.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Hash did not verify; the parameters cannot be trusted.
    #[error("callback hash verification failed")]
    Forbidden,

    #[error("order {0} not found")]
    NotFound(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a handled callback: where to send the shopper next.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub redirect: String,
}

pub struct CallbackHandler {
    store: Arc<dyn OrderStore>,
    signer: Arc<RequestSigner>,
    storefront: StorefrontConfig,
}

impl CallbackHandler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        signer: Arc<RequestSigner>,
        storefront: StorefrontConfig,
    ) -> Self {
        Self {
            store,
            signer,
            storefront,
        }
    }

    /// Move the order to `status`, tolerating orders that already reached a
    /// state the transition table will not leave.
    async fn apply_status(&self, id: OrderId, status: OrderStatus) -> Result<(), CallbackError> {
        match self.store.update_status(id, status).await {
            Ok(_) => Ok(()),
            Err(StoreError::InvalidTransition { from, to }) => {
                warn!(order_id = id.value(), %from, %to, "callback status not applied");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn handle(&self, request: CallbackRequest) -> Result<CallbackOutcome, CallbackError> {
        // 1. Verify the hash before reading anything else
        if !self
            .signer
            .verify_callback(request.order_id, &request.status, &request.hash)
        {
            warn!(order_id = request.order_id, "callback hash mismatch");
            return Err(CallbackError::Forbidden);
        }

        // 2. Load the order
        let id = OrderId::new(request.order_id);
        let order = self
            .store
            .find(id)
            .await?
            .ok_or(CallbackError::NotFound(request.order_id))?;

        // 3. Apply the reported outcome
        let redirect = match request.status.as_str() {
            "completed" => {
                match self.store.mark_paid(id, PaymentReference::default()).await? {
                    MarkPaidOutcome::Marked(_) => {
                        info!(order_id = request.order_id, "callback recorded payment");
                    }
                    MarkPaidOutcome::AlreadyPaid(_) => {
                        // Raced with iframe completion; nothing more to do.
                        info!(order_id = request.order_id, "callback for paid order");
                    }
                }
                self.apply_status(id, OrderStatus::Processing).await?;
                self.storefront
                    .receipt_url(request.order_id, order.key.as_str())
            }
            "cancelled" => {
                self.apply_status(id, OrderStatus::Cancelled).await?;
                self.storefront.cart_url()
            }
            other => {
                warn!(order_id = request.order_id, status = other, "payment failed");
                self.apply_status(id, OrderStatus::Failed).await?;
                self.storefront.checkout_url()
            }
        };

        Ok(CallbackOutcome { redirect })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderStore;
    use crate::domain::{Address, LineItem, OrderKey};
    use crate::ports::NewOrder;
    use secrecy::SecretString;

    fn signer() -> Arc<RequestSigner> {
        Arc::new(RequestSigner::new(
            "key_test",
            SecretString::new("secret_test".to_string()),
        ))
    }

    fn storefront() -> StorefrontConfig {
        StorefrontConfig {
            site_url: "https://shop.example.com".to_string(),
            currency: "USD".to_string(),
        }
    }

    async fn store_with_order() -> (Arc<InMemoryOrderStore>, u64, String) {
        let store = Arc::new(InMemoryOrderStore::new());
        let order = store
            .create(NewOrder {
                key: OrderKey::generate(),
                currency: "USD".to_string(),
                payment_method: "paypal_proxy".to_string(),
                billing: Address::default(),
                shipping: Address::default(),
                items: vec![LineItem {
                    product_id: 1,
                    name: "Widget".to_string(),
                    quantity: 1,
                    unit_price_minor: 1999,
                    line_total_minor: 1999,
                    sku: String::new(),
                }],
                shipping_lines: vec![],
            })
            .await
            .unwrap();
        let key = order.key.as_str().to_string();
        (store, order.id.value(), key)
    }

    fn signed_request(order_id: u64, status: &str) -> CallbackRequest {
        let hash = RequestSigner::new("key_test", SecretString::new("secret_test".to_string()))
            .sign_callback(order_id, status);
        CallbackRequest {
            order_id,
            status: status.to_string(),
            hash,
        }
    }

    #[tokio::test]
    async fn completed_callback_marks_paid_and_redirects_to_receipt() {
        let (store, order_id, key) = store_with_order().await;
        let handler = CallbackHandler::new(store.clone(), signer(), storefront());

        let outcome = handler
            .handle(signed_request(order_id, "completed"))
            .await
            .unwrap();
        assert_eq!(
            outcome.redirect,
            format!(
                "https://shop.example.com/checkout/order-received/{}?key={}",
                order_id, key
            )
        );

        let order = store.find(OrderId::new(order_id)).await.unwrap().unwrap();
        assert!(order.paid);
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn cancelled_callback_redirects_to_cart() {
        let (store, order_id, _) = store_with_order().await;
        let handler = CallbackHandler::new(store.clone(), signer(), storefront());

        let outcome = handler
            .handle(signed_request(order_id, "cancelled"))
            .await
            .unwrap();
        assert_eq!(outcome.redirect, "https://shop.example.com/cart");

        let order = store.find(OrderId::new(order_id)).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(!order.paid);
    }

    #[tokio::test]
    async fn unknown_status_fails_order_and_redirects_to_checkout() {
        let (store, order_id, _) = store_with_order().await;
        let handler = CallbackHandler::new(store.clone(), signer(), storefront());

        let outcome = handler
            .handle(signed_request(order_id, "error"))
            .await
            .unwrap();
        assert_eq!(outcome.redirect, "https://shop.example.com/checkout");

        let order = store.find(OrderId::new(order_id)).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn tampered_hash_is_forbidden_and_order_untouched() {
        let (store, order_id, _) = store_with_order().await;
        let handler = CallbackHandler::new(store.clone(), signer(), storefront());

        // Hash signed for "cancelled" but status flipped to "completed".
        let mut request = signed_request(order_id, "cancelled");
        request.status = "completed".to_string();

        let result = handler.handle(request).await;
        assert!(matches!(result, Err(CallbackError::Forbidden)));

        let order = store.find(OrderId::new(order_id)).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.paid);
    }

    #[tokio::test]
    async fn non_ascii_hash_is_forbidden_not_a_panic() {
        let (store, order_id, _) = store_with_order().await;
        let handler = CallbackHandler::new(store.clone(), signer(), storefront());

        let result = handler
            .handle(CallbackRequest {
                order_id,
                status: "completed".to_string(),
                hash: "€€€€".to_string(),
            })
            .await;
        assert!(matches!(result, Err(CallbackError::Forbidden)));

        let order = store.find(OrderId::new(order_id)).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.paid);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (store, _, _) = store_with_order().await;
        let handler = CallbackHandler::new(store, signer(), storefront());

        let result = handler.handle(signed_request(404, "completed")).await;
        assert!(matches!(result, Err(CallbackError::NotFound(404))));
    }

    #[tokio::test]
    async fn completed_callback_tolerates_already_paid_order() {
        let (store, order_id, _) = store_with_order().await;
        store
            .mark_paid(OrderId::new(order_id), PaymentReference::default())
            .await
            .unwrap();
        store
            .update_status(OrderId::new(order_id), OrderStatus::Processing)
            .await
            .unwrap();

        let handler = CallbackHandler::new(store.clone(), signer(), storefront());
        let outcome = handler
            .handle(signed_request(order_id, "completed"))
            .await
            .unwrap();
        assert!(outcome.redirect.contains("order-received"));
    }
}
