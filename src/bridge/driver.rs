//! Async driver that executes bridge effects.
//!
//! The controller decides, the driver does: round trips go to a
//! [`CheckoutTransport`], messages to an [`IframeChannel`], page mutations to
//! a [`CheckoutPage`]. Each round trip's result is fed straight back into the
//! controller with its request id, and any follow-up effects are executed in
//! turn until the queue drains.

use async_trait::async_trait;

use crate::domain::ValidationOutcome;

use super::controller::{
    CheckoutBridge, CompletionRequest, Effect, OrderCompleted, OrderCreated, RoundTrip,
};
use super::messages::{ParentMessage, PostTarget};

/// Transport error carried back into the bridge as a user-facing message.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

/// The storefront round trips the bridge can start.
#[async_trait]
pub trait CheckoutTransport: Send + Sync {
    async fn validate(&self) -> Result<ValidationOutcome, TransportError>;
    async fn create_order(&self) -> Result<OrderCreated, TransportError>;
    async fn complete_order(
        &self,
        request: &CompletionRequest,
    ) -> Result<OrderCompleted, TransportError>;
}

/// Delivery of messages into the payment iframe.
pub trait IframeChannel: Send + Sync {
    fn post(&self, message: &ParentMessage, target: &PostTarget);
}

/// Mutations of the checkout page itself.
pub trait CheckoutPage: Send + Sync {
    fn navigate(&self, url: &str);
    fn show_field_errors(&self, outcome: &ValidationOutcome);
    fn show_error(&self, message: &str);
    fn clear_errors(&self);
}

/// Executes effects from a [`CheckoutBridge`] against the three seams.
pub struct BridgeDriver<T, C, P> {
    pub bridge: CheckoutBridge,
    pub transport: T,
    pub channel: C,
    pub page: P,
}

impl<T, C, P> BridgeDriver<T, C, P>
where
    T: CheckoutTransport,
    C: IframeChannel,
    P: CheckoutPage,
{
    pub fn new(bridge: CheckoutBridge, transport: T, channel: C, page: P) -> Self {
        Self {
            bridge,
            transport,
            channel,
            page,
        }
    }

    /// Execute effects until none remain, feeding round-trip results back
    /// into the bridge as they finish.
    pub async fn run(&mut self, mut effects: Vec<Effect>) {
        while !effects.is_empty() {
            let mut next = Vec::new();
            for effect in effects {
                match effect {
                    Effect::Validate(id) => {
                        let result = self
                            .transport
                            .validate()
                            .await
                            .map_err(|e| e.to_string());
                        next.extend(self.bridge.handle_response(id, RoundTrip::Validate(result)));
                    }
                    Effect::CreateOrder(id) => {
                        let result = self
                            .transport
                            .create_order()
                            .await
                            .map_err(|e| e.to_string());
                        next.extend(
                            self.bridge.handle_response(id, RoundTrip::CreateOrder(result)),
                        );
                    }
                    Effect::CompleteOrder(id, request) => {
                        let result = self
                            .transport
                            .complete_order(&request)
                            .await
                            .map_err(|e| e.to_string());
                        next.extend(
                            self.bridge
                                .handle_response(id, RoundTrip::CompleteOrder(result)),
                        );
                    }
                    Effect::Post(message) => {
                        let target = self.bridge.post_target().clone();
                        self.channel.post(&message, &target);
                    }
                    Effect::Navigate(url) => self.page.navigate(&url),
                    Effect::ShowFieldErrors(outcome) => self.page.show_field_errors(&outcome),
                    Effect::ShowError(message) => self.page.show_error(&message),
                    Effect::ClearErrors => self.page.clear_errors(),
                }
            }
            effects = next;
        }
    }
}
