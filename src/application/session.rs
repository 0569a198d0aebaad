//! Per-visitor checkout session state.
//!
//! Holds the cart snapshot, the chosen shipping rate, and single-use request
//! tokens. Tokens are consumed on use; a replayed token reads as an
//! authentication failure, not a validation error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A cart line as carried in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: u64,
    pub name: String,
    pub quantity: u32,
    /// Unit price in minor units.
    pub unit_price_minor: i64,
    #[serde(default)]
    pub sku: String,
}

impl CartItem {
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor * i64::from(self.quantity)
    }
}

/// The shipping rate chosen for this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub method_id: String,
    pub method_title: String,
    /// Shipping cost in minor units.
    pub cost_minor: i64,
}

#[derive(Debug, Default)]
struct SessionData {
    cart: Vec<CartItem>,
    shipping_rate: Option<ShippingRate>,
    tokens: HashSet<String>,
}

/// In-process session storage keyed by session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_cart(&self, session_id: &str, items: Vec<CartItem>) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().cart = items;
    }

    pub async fn cart(&self, session_id: &str) -> Vec<CartItem> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.cart.clone())
            .unwrap_or_default()
    }

    pub async fn cart_total_minor(&self, session_id: &str) -> i64 {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(session_id) else {
            return 0;
        };
        let items: i64 = session.cart.iter().map(CartItem::line_total_minor).sum();
        let shipping = session
            .shipping_rate
            .as_ref()
            .map(|r| r.cost_minor)
            .unwrap_or(0);
        items + shipping
    }

    pub async fn clear_cart(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.cart.clear();
            session.shipping_rate = None;
        }
    }

    pub async fn set_shipping_rate(&self, session_id: &str, rate: ShippingRate) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .shipping_rate = Some(rate);
    }

    pub async fn shipping_rate(&self, session_id: &str) -> Option<ShippingRate> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.shipping_rate.clone())
    }

    /// Issue a fresh single-use request token for this session.
    pub async fn issue_token(&self, session_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .tokens
            .insert(token.clone());
        token
    }

    /// Check a token without consuming it.
    pub async fn token_is_valid(&self, session_id: &str, token: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.tokens.contains(token))
            .unwrap_or(false)
    }

    /// Consume a token. Returns false if it was never issued or already used.
    pub async fn consume_token(&self, session_id: &str, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(session_id)
            .map(|s| s.tokens.remove(token))
            .unwrap_or(false)
    }
}
