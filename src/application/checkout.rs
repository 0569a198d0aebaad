//! Checkout command handlers: validate, create order, complete order.
//!
//! These orchestrate the storefront side of the delegated checkout. Order
//! creation registers the order with the remote payment service before the
//! shopper approves payment; completion verifies the capture with the
//! service before any order advances past pending. Proxy failures leave the
//! order exactly where it was.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::StorefrontConfig;
use crate::domain::{
    validate_required_fields, CheckoutForm, LineItem, OrderId, OrderKey, OrderStatus,
    ShippingLine, ValidationOutcome,
};
use crate::ports::{
    MarkPaidOutcome, NewOrder, OrderStore, PaymentProxy, PaymentReference, ProxyError, StoreError,
};

use super::session::SessionStore;

/// Errors surfaced by the checkout handlers.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Missing or already-used request token.
    #[error("authentication failed")]
    Authentication,

    /// Required checkout fields are missing.
    #[error("checkout validation failed")]
    Validation { outcome: ValidationOutcome },

    /// The remote payment service refused or could not be reached.
    #[error("payment service error: {0}")]
    Upstream(#[from] ProxyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    InvalidRequest(String),
}

impl CheckoutError {
    /// Message safe to show the shopper.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Authentication => "Your session has expired. Please refresh the page and try again.".to_string(),
            CheckoutError::Validation { .. } => {
                "Please fill in all required fields.".to_string()
            }
            CheckoutError::Upstream(_) => {
                "Payment could not be processed. Please try again.".to_string()
            }
            CheckoutError::Store(_) => "Something went wrong. Please try again.".to_string(),
            CheckoutError::InvalidRequest(msg) => msg.clone(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Validate checkout
// ════════════════════════════════════════════════════════════════════════════

/// Handler for pre-payment form validation.
///
/// Pure with respect to order state: no order is created and the request
/// token is only peeked, so the same token still authorizes the subsequent
/// create-order call.
pub struct ValidateCheckoutHandler {
    sessions: Arc<SessionStore>,
}

impl ValidateCheckoutHandler {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn handle(
        &self,
        session_id: &str,
        token: &str,
        form: &CheckoutForm,
    ) -> Result<ValidationOutcome, CheckoutError> {
        if !self.sessions.token_is_valid(session_id, token).await {
            return Err(CheckoutError::Authentication);
        }
        Ok(validate_required_fields(form))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Create order
// ════════════════════════════════════════════════════════════════════════════

/// Command result: the local order plus the data the iframe needs to start
/// the PayPal approval.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: u64,
    pub order_key: String,
    /// Opaque response body from the remote service, forwarded to the iframe.
    pub proxy_data: serde_json::Value,
}

/// Handler for creating a pending order and registering it with the remote
/// payment service.
pub struct CreateOrderHandler {
    store: Arc<dyn OrderStore>,
    proxy: Arc<dyn PaymentProxy>,
    sessions: Arc<SessionStore>,
    storefront: StorefrontConfig,
}

impl CreateOrderHandler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        proxy: Arc<dyn PaymentProxy>,
        sessions: Arc<SessionStore>,
        storefront: StorefrontConfig,
    ) -> Self {
        Self {
            store,
            proxy,
            sessions,
            storefront,
        }
    }

    pub async fn handle(
        &self,
        session_id: &str,
        token: &str,
        form: &CheckoutForm,
    ) -> Result<CreatedOrder, CheckoutError> {
        // 1. Consume the single-use request token
        if !self.sessions.consume_token(session_id, token).await {
            warn!(session_id, "create-order with invalid or replayed token");
            return Err(CheckoutError::Authentication);
        }

        // 2. Re-validate the form; the client-side check is advisory only
        let outcome = validate_required_fields(form);
        if !outcome.valid {
            return Err(CheckoutError::Validation { outcome });
        }

        // 3. Snapshot the cart
        let cart = self.sessions.cart(session_id).await;
        if cart.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "Your cart is empty.".to_string(),
            ));
        }
        let items: Vec<LineItem> = cart
            .into_iter()
            .map(|item| {
                let line_total_minor = item.line_total_minor();
                LineItem {
                    product_id: item.product_id,
                    name: item.name,
                    quantity: item.quantity,
                    unit_price_minor: item.unit_price_minor,
                    line_total_minor,
                    sku: item.sku,
                }
            })
            .collect();

        let shipping_lines = self
            .sessions
            .shipping_rate(session_id)
            .await
            .map(|rate| ShippingLine {
                method_id: rate.method_id,
                method_title: rate.method_title,
                total_minor: rate.cost_minor,
            })
            .into_iter()
            .collect();

        // 4. Create the pending order
        let order = self
            .store
            .create(NewOrder {
                key: OrderKey::generate(),
                currency: self.storefront.currency.clone(),
                payment_method: "paypal_proxy".to_string(),
                billing: form.billing_address(),
                shipping: form.shipping_address(),
                items,
                shipping_lines,
            })
            .await?;

        // 5. Register it with the remote service; on failure the order
        //    stays pending and the shopper can retry
        let ack = self.proxy.register_order(&order).await.map_err(|e| {
            warn!(order_id = order.id.value(), error = %e, "order registration failed");
            e
        })?;

        info!(
            order_id = order.id.value(),
            total = %order.total_string(),
            "order created and registered"
        );
        Ok(CreatedOrder {
            order_id: order.id.value(),
            order_key: order.key.as_str().to_string(),
            proxy_data: ack.data,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Complete order
// ════════════════════════════════════════════════════════════════════════════

/// Command result: where to send the shopper after payment is recorded.
#[derive(Debug, Clone)]
pub struct CompletedOrder {
    pub redirect: String,
}

/// Handler for finalizing an order after the shopper approved payment in
/// the iframe.
pub struct CompleteOrderHandler {
    store: Arc<dyn OrderStore>,
    proxy: Arc<dyn PaymentProxy>,
    sessions: Arc<SessionStore>,
    storefront: StorefrontConfig,
}

impl CompleteOrderHandler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        proxy: Arc<dyn PaymentProxy>,
        sessions: Arc<SessionStore>,
        storefront: StorefrontConfig,
    ) -> Self {
        Self {
            store,
            proxy,
            sessions,
            storefront,
        }
    }

    pub async fn handle(
        &self,
        session_id: &str,
        token: &str,
        order_id: u64,
        paypal_order_id: &str,
        transaction_id: Option<&str>,
    ) -> Result<CompletedOrder, CheckoutError> {
        // 1. Consume the single-use request token
        if !self.sessions.consume_token(session_id, token).await {
            warn!(session_id, "complete-order with invalid or replayed token");
            return Err(CheckoutError::Authentication);
        }

        // 2. Reject malformed identifiers before touching the store
        if order_id == 0 || paypal_order_id.trim().is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "Invalid order data".to_string(),
            ));
        }

        // 3. Load the order
        let id = OrderId::new(order_id);
        let order = self
            .store
            .find(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        // 4. Idempotent completion: a paid order just redirects again
        if order.paid {
            info!(order_id, "completion repeated for paid order");
            return Ok(CompletedOrder {
                redirect: self.storefront.receipt_url(order_id, order.key.as_str()),
            });
        }

        // 5. Repair a missing shipping line so the verified total matches
        //    what the shopper approved
        let order = if order.shipping_total_minor() == 0 {
            match self.sessions.shipping_rate(session_id).await {
                Some(rate) if rate.cost_minor > 0 => {
                    self.store
                        .add_shipping_line(
                            id,
                            ShippingLine {
                                method_id: rate.method_id,
                                method_title: rate.method_title,
                                total_minor: rate.cost_minor,
                            },
                        )
                        .await?
                }
                _ => order,
            }
        } else {
            order
        };

        // 6. Verify the capture with the remote service; on failure the
        //    order status is left untouched
        self.proxy
            .verify_payment(paypal_order_id, &order)
            .await
            .map_err(|e| {
                warn!(order_id, error = %e, "payment verification failed");
                e
            })?;

        // 7. Record payment and advance to processing
        let outcome = self
            .store
            .mark_paid(
                id,
                PaymentReference {
                    paypal_order_id: Some(paypal_order_id.to_string()),
                    transaction_id: transaction_id.map(String::from),
                },
            )
            .await?;
        if matches!(outcome, MarkPaidOutcome::AlreadyPaid(_)) {
            // Raced with the redirect callback; payment is recorded either way.
            info!(order_id, "order was already paid at completion");
        }
        let order = self.store.update_status(id, OrderStatus::Processing).await?;

        // 8. The purchase is done; drop the cart
        self.sessions.clear_cart(session_id).await;

        info!(order_id, paypal_order_id, "order completed");
        Ok(CompletedOrder {
            redirect: self.storefront.receipt_url(order_id, order.key.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderStore;
    use crate::application::session::{CartItem, ShippingRate};
    use crate::domain::Order;
    use crate::ports::{ProxyAck, ProxyErrorCode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════

    struct MockProxy {
        register_calls: AtomicUsize,
        verify_calls: AtomicUsize,
        fail_register: Mutex<Option<ProxyError>>,
        fail_verify: Mutex<Option<ProxyError>>,
    }

    impl MockProxy {
        fn new() -> Self {
            Self {
                register_calls: AtomicUsize::new(0),
                verify_calls: AtomicUsize::new(0),
                fail_register: Mutex::new(None),
                fail_verify: Mutex::new(None),
            }
        }

        fn failing_verify(error: ProxyError) -> Self {
            let proxy = Self::new();
            *proxy.fail_verify.lock().unwrap() = Some(error);
            proxy
        }

        fn failing_register(error: ProxyError) -> Self {
            let proxy = Self::new();
            *proxy.fail_register.lock().unwrap() = Some(error);
            proxy
        }
    }

    #[async_trait]
    impl PaymentProxy for MockProxy {
        async fn register_order(&self, _order: &Order) -> Result<ProxyAck, ProxyError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_register.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(ProxyAck {
                message: None,
                data: serde_json::json!({"success": true, "proxy_order_ref": "REF-1"}),
            })
        }

        async fn verify_payment(
            &self,
            _paypal_order_id: &str,
            _order: &Order,
        ) -> Result<ProxyAck, ProxyError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_verify.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(ProxyAck {
                message: None,
                data: serde_json::json!({"success": true, "status": "COMPLETED"}),
            })
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Test Fixtures
    // ════════════════════════════════════════════════════════════════════════

    fn storefront() -> StorefrontConfig {
        StorefrontConfig {
            site_url: "https://shop.example.com".to_string(),
            currency: "USD".to_string(),
        }
    }

    fn filled_form() -> CheckoutForm {
        let mut form = CheckoutForm::default();
        for (name, value) in [
            ("billing_first_name", "Ada"),
            ("billing_last_name", "Lovelace"),
            ("billing_address_1", "1 Analytical Way"),
            ("billing_city", "London"),
            ("billing_postcode", "E1 6AN"),
            ("billing_country", "GB"),
            ("billing_email", "ada@example.com"),
            ("billing_phone", "020 7946 0000"),
        ] {
            form.fields.insert(name.to_string(), value.to_string());
        }
        form
    }

    async fn session_with_cart(sessions: &SessionStore, session_id: &str) -> String {
        sessions
            .set_cart(
                session_id,
                vec![CartItem {
                    product_id: 1,
                    name: "Widget".to_string(),
                    quantity: 2,
                    unit_price_minor: 500,
                    sku: "W-1".to_string(),
                }],
            )
            .await;
        sessions.issue_token(session_id).await
    }

    struct Fixture {
        store: Arc<InMemoryOrderStore>,
        proxy: Arc<MockProxy>,
        sessions: Arc<SessionStore>,
    }

    impl Fixture {
        fn new(proxy: MockProxy) -> Self {
            Self {
                store: Arc::new(InMemoryOrderStore::new()),
                proxy: Arc::new(proxy),
                sessions: Arc::new(SessionStore::new()),
            }
        }

        fn create_handler(&self) -> CreateOrderHandler {
            CreateOrderHandler::new(
                self.store.clone(),
                self.proxy.clone(),
                self.sessions.clone(),
                storefront(),
            )
        }

        fn complete_handler(&self) -> CompleteOrderHandler {
            CompleteOrderHandler::new(
                self.store.clone(),
                self.proxy.clone(),
                self.sessions.clone(),
                storefront(),
            )
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Validate
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn validate_peeks_token_without_consuming() {
        let sessions = Arc::new(SessionStore::new());
        let token = sessions.issue_token("s1").await;
        let handler = ValidateCheckoutHandler::new(sessions.clone());

        let outcome = handler.handle("s1", &token, &filled_form()).await.unwrap();
        assert!(outcome.valid);

        // Token survives validation and still authorizes create-order.
        assert!(sessions.token_is_valid("s1", &token).await);
    }

    #[tokio::test]
    async fn validate_rejects_unknown_token() {
        let sessions = Arc::new(SessionStore::new());
        let handler = ValidateCheckoutHandler::new(sessions);
        let result = handler.handle("s1", "bogus", &filled_form()).await;
        assert!(matches!(result, Err(CheckoutError::Authentication)));
    }

    #[tokio::test]
    async fn validate_reports_missing_fields() {
        let sessions = Arc::new(SessionStore::new());
        let token = sessions.issue_token("s1").await;
        let handler = ValidateCheckoutHandler::new(sessions);

        let mut form = filled_form();
        form.fields.remove("billing_email");
        let outcome = handler.handle("s1", &token, &form).await.unwrap();
        assert!(!outcome.valid);
        assert!(outcome.errors.contains_key("billing_email"));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Create order
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_order_registers_with_proxy() {
        let fixture = Fixture::new(MockProxy::new());
        let token = session_with_cart(&fixture.sessions, "s1").await;

        let created = fixture
            .create_handler()
            .handle("s1", &token, &filled_form())
            .await
            .unwrap();

        assert_eq!(created.order_id, 1);
        assert!(created.order_key.starts_with("order_"));
        assert_eq!(created.proxy_data["proxy_order_ref"], "REF-1");
        assert_eq!(fixture.proxy.register_calls.load(Ordering::SeqCst), 1);

        let order = fixture
            .store
            .find(OrderId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_minor(), 1000);
        // Line total is quantity times unit price, not the unit price.
        assert_eq!(order.items[0].unit_price_minor, 500);
        assert_eq!(order.items[0].line_total_minor, 1000);
    }

    #[tokio::test]
    async fn create_order_rejects_replayed_token() {
        let fixture = Fixture::new(MockProxy::new());
        let token = session_with_cart(&fixture.sessions, "s1").await;
        let handler = fixture.create_handler();

        handler.handle("s1", &token, &filled_form()).await.unwrap();
        let second = handler.handle("s1", &token, &filled_form()).await;
        assert!(matches!(second, Err(CheckoutError::Authentication)));
        // No second order, no second registration.
        assert!(fixture.store.find(OrderId::new(2)).await.unwrap().is_none());
        assert_eq!(fixture.proxy.register_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_order_rejects_invalid_form_without_order() {
        let fixture = Fixture::new(MockProxy::new());
        let token = session_with_cart(&fixture.sessions, "s1").await;

        let mut form = filled_form();
        form.fields.remove("billing_country");
        let result = fixture.create_handler().handle("s1", &token, &form).await;

        assert!(matches!(result, Err(CheckoutError::Validation { .. })));
        assert!(fixture.store.find(OrderId::new(1)).await.unwrap().is_none());
        assert_eq!(fixture.proxy.register_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_order_rejects_empty_cart() {
        let fixture = Fixture::new(MockProxy::new());
        let token = fixture.sessions.issue_token("s1").await;

        let result = fixture
            .create_handler()
            .handle("s1", &token, &filled_form())
            .await;
        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn create_order_surfaces_proxy_failure_and_keeps_order_pending() {
        let fixture = Fixture::new(MockProxy::failing_register(ProxyError::new(
            ProxyErrorCode::Timeout,
            "register-order timed out after 30s",
        )));
        let token = session_with_cart(&fixture.sessions, "s1").await;

        let result = fixture
            .create_handler()
            .handle("s1", &token, &filled_form())
            .await;
        assert!(matches!(result, Err(CheckoutError::Upstream(_))));

        // Order exists but never advanced.
        let order = fixture
            .store
            .find(OrderId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.paid);
    }

    #[tokio::test]
    async fn create_order_includes_session_shipping_rate() {
        let fixture = Fixture::new(MockProxy::new());
        let token = session_with_cart(&fixture.sessions, "s1").await;
        fixture
            .sessions
            .set_shipping_rate(
                "s1",
                ShippingRate {
                    method_id: "flat_rate".to_string(),
                    method_title: "Flat rate".to_string(),
                    cost_minor: 499,
                },
            )
            .await;

        fixture
            .create_handler()
            .handle("s1", &token, &filled_form())
            .await
            .unwrap();

        let order = fixture
            .store
            .find(OrderId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.shipping_total_minor(), 499);
        assert_eq!(order.total_minor(), 1499);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Complete order
    // ════════════════════════════════════════════════════════════════════════

    async fn created_order(fixture: &Fixture) -> CreatedOrder {
        let token = session_with_cart(&fixture.sessions, "s1").await;
        fixture
            .create_handler()
            .handle("s1", &token, &filled_form())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn complete_order_verifies_marks_paid_and_redirects() {
        let fixture = Fixture::new(MockProxy::new());
        let created = created_order(&fixture).await;
        let token = fixture.sessions.issue_token("s1").await;

        let completed = fixture
            .complete_handler()
            .handle("s1", &token, created.order_id, "PP-123", Some("TXN-9"))
            .await
            .unwrap();

        assert_eq!(
            completed.redirect,
            format!(
                "https://shop.example.com/checkout/order-received/1?key={}",
                created.order_key
            )
        );
        assert_eq!(fixture.proxy.verify_calls.load(Ordering::SeqCst), 1);

        let order = fixture
            .store
            .find(OrderId::new(created.order_id))
            .await
            .unwrap()
            .unwrap();
        assert!(order.paid);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.paypal_order_id.as_deref(), Some("PP-123"));
        assert_eq!(order.transaction_id.as_deref(), Some("TXN-9"));

        // Cart is gone after a successful purchase.
        assert!(fixture.sessions.cart("s1").await.is_empty());
    }

    #[tokio::test]
    async fn complete_order_is_idempotent_for_paid_orders() {
        let fixture = Fixture::new(MockProxy::new());
        let created = created_order(&fixture).await;

        let token = fixture.sessions.issue_token("s1").await;
        fixture
            .complete_handler()
            .handle("s1", &token, created.order_id, "PP-123", None)
            .await
            .unwrap();

        // Repeat with a fresh token: no second verification round trip.
        let token = fixture.sessions.issue_token("s1").await;
        let repeat = fixture
            .complete_handler()
            .handle("s1", &token, created.order_id, "PP-123", None)
            .await
            .unwrap();
        assert!(repeat.redirect.contains("order-received/1"));
        assert_eq!(fixture.proxy.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn complete_order_rejects_verification_failure() {
        let fixture = Fixture::new(MockProxy::failing_verify(ProxyError::rejected(
            "Payment not completed",
        )));
        let created = created_order(&fixture).await;
        let token = fixture.sessions.issue_token("s1").await;

        let result = fixture
            .complete_handler()
            .handle("s1", &token, created.order_id, "PP-123", None)
            .await;
        assert!(matches!(result, Err(CheckoutError::Upstream(_))));

        // Status untouched, nothing marked paid, cart kept.
        let order = fixture
            .store
            .find(OrderId::new(created.order_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.paid);
        assert!(!fixture.sessions.cart("s1").await.is_empty());
    }

    #[tokio::test]
    async fn complete_order_rejects_malformed_identifiers() {
        let fixture = Fixture::new(MockProxy::new());
        let _ = created_order(&fixture).await;

        let token = fixture.sessions.issue_token("s1").await;
        let result = fixture
            .complete_handler()
            .handle("s1", &token, 0, "PP-123", None)
            .await;
        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));

        let token = fixture.sessions.issue_token("s1").await;
        let result = fixture
            .complete_handler()
            .handle("s1", &token, 1, "   ", None)
            .await;
        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));
        assert_eq!(fixture.proxy.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn complete_order_unknown_order_is_not_found() {
        let fixture = Fixture::new(MockProxy::new());
        let token = fixture.sessions.issue_token("s1").await;

        let result = fixture
            .complete_handler()
            .handle("s1", &token, 99, "PP-123", None)
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn complete_order_repairs_missing_shipping_line() {
        let fixture = Fixture::new(MockProxy::new());
        let created = created_order(&fixture).await;

        // Rate chosen after the order was created.
        fixture
            .sessions
            .set_shipping_rate(
                "s1",
                ShippingRate {
                    method_id: "flat_rate".to_string(),
                    method_title: "Flat rate".to_string(),
                    cost_minor: 499,
                },
            )
            .await;

        let token = fixture.sessions.issue_token("s1").await;
        fixture
            .complete_handler()
            .handle("s1", &token, created.order_id, "PP-123", None)
            .await
            .unwrap();

        let order = fixture
            .store
            .find(OrderId::new(created.order_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.shipping_total_minor(), 499);
    }
}
