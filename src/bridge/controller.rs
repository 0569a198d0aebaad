//! Checkout bridge controller.
//!
//! A pure state machine for the checkout page's side of the delegated
//! payment flow. Inputs are iframe events and completed round trips; outputs
//! are effects for the embedding environment to execute (start a round trip,
//! post a message into the iframe, navigate, touch the page). No I/O happens
//! here, which is what makes the whole protocol testable without a browser.
//!
//! Every round trip is tagged with a `RequestId`. Only the response matching
//! the currently active id is applied; anything else arrived after the
//! attempt was cancelled or superseded and is discarded.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::ValidationOutcome;

use super::messages::{IframeEvent, ParentMessage, PostTarget};
use super::state::{BridgeState, RequestId};

/// A registered order as the bridge sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreated {
    pub order_id: u64,
    pub order_key: String,
    pub proxy_data: Value,
}

/// A completed order as the bridge sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCompleted {
    pub redirect: String,
}

/// What the completion round trip must send to the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub order_id: u64,
    pub paypal_order_id: String,
    pub transaction_id: Option<String>,
}

/// Instructions for the embedding environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the validation round trip.
    Validate(RequestId),

    /// Start the order-creation round trip.
    CreateOrder(RequestId),

    /// Start the completion round trip.
    CompleteOrder(RequestId, CompletionRequest),

    /// Post a message into the payment iframe.
    Post(ParentMessage),

    /// Navigate the top window.
    Navigate(String),

    /// Render per-field validation errors on the form.
    ShowFieldErrors(ValidationOutcome),

    /// Show a page-level error message.
    ShowError(String),

    /// Clear any previously rendered errors.
    ClearErrors,
}

/// A finished round trip, fed back into the bridge with its request id.
#[derive(Debug, Clone)]
pub enum RoundTrip {
    Validate(Result<ValidationOutcome, String>),
    CreateOrder(Result<OrderCreated, String>),
    CompleteOrder(Result<OrderCompleted, String>),
}

/// What the form's submit handler should do.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAction {
    /// Let the form submit normally (payment method is not ours).
    AllowDefault,

    /// Suppress the submit and run these effects instead.
    Suppress(Vec<Effect>),
}

/// The checkout page's bridge to the payment iframe.
#[derive(Debug)]
pub struct CheckoutBridge {
    state: BridgeState,
    button_loaded: bool,
    target: PostTarget,
    next_request: u64,
    active_request: Option<RequestId>,
}

impl CheckoutBridge {
    pub fn new(target: PostTarget) -> Self {
        if target == PostTarget::Wildcard {
            warn!("bridge configured with wildcard post target; any origin can read outbound messages");
        }
        Self {
            state: BridgeState::Idle,
            button_loaded: false,
            target,
            next_request: 0,
            active_request: None,
        }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn button_loaded(&self) -> bool {
        self.button_loaded
    }

    /// The origin outbound messages are restricted to.
    pub fn post_target(&self) -> &PostTarget {
        &self.target
    }

    fn begin_request(&mut self) -> RequestId {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.active_request = Some(id);
        id
    }

    fn reset(&mut self) {
        self.state = BridgeState::Idle;
        self.active_request = None;
    }

    /// Feed a raw postMessage from the page. Messages that fail the origin
    /// or source filters produce no effects.
    pub fn handle_message(&mut self, origin: &str, raw: &Value) -> Vec<Effect> {
        match IframeEvent::parse(origin, &self.target, raw) {
            Some(event) => self.handle_event(event),
            None => Vec::new(),
        }
    }

    /// Feed a parsed iframe event.
    pub fn handle_event(&mut self, event: IframeEvent) -> Vec<Effect> {
        match event {
            IframeEvent::ButtonLoaded => {
                self.button_loaded = true;
                Vec::new()
            }
            IframeEvent::ButtonClicked => self.start_checkout(),
            IframeEvent::OrderApproved(payload) => {
                // Approval is only meaningful while an order is awaiting it.
                let BridgeState::AwaitingApproval { order_id, .. } = &self.state else {
                    warn!(
                        state = self.state.name(),
                        "order_approved outside awaiting_approval; ignoring"
                    );
                    return Vec::new();
                };
                let request = CompletionRequest {
                    order_id: *order_id,
                    paypal_order_id: payload.order_id,
                    transaction_id: payload.transaction_id,
                };
                self.state = BridgeState::Completing {
                    order_id: request.order_id,
                };
                let id = self.begin_request();
                info!(order_id = request.order_id, "payment approved, completing order");
                vec![Effect::CompleteOrder(id, request)]
            }
            IframeEvent::PaymentCancelled => {
                if self.state != BridgeState::Idle {
                    info!(state = self.state.name(), "payment cancelled by shopper");
                    self.reset();
                }
                Vec::new()
            }
            IframeEvent::PaymentError { message } => {
                warn!(message, "payment error reported by iframe");
                self.reset();
                vec![Effect::ShowError(message)]
            }
        }
    }

    /// Start a checkout attempt. Ignored unless the bridge is idle, so a
    /// double click cannot create two orders.
    pub fn start_checkout(&mut self) -> Vec<Effect> {
        if !self.state.can_start_checkout() {
            debug!(state = self.state.name(), "checkout already in flight; ignoring click");
            return Vec::new();
        }
        self.state = BridgeState::Validating;
        let id = self.begin_request();
        vec![Effect::ClearErrors, Effect::Validate(id)]
    }

    /// Feed a finished round trip back into the bridge.
    ///
    /// Responses whose id is not the active one are discarded: the attempt
    /// they belong to was cancelled or superseded while they were in flight.
    pub fn handle_response(&mut self, request: RequestId, response: RoundTrip) -> Vec<Effect> {
        if self.active_request != Some(request) {
            debug!(request = request.0, "discarding stale response");
            return Vec::new();
        }
        self.active_request = None;

        match (std::mem::replace(&mut self.state, BridgeState::Idle), response) {
            (BridgeState::Validating, RoundTrip::Validate(Ok(outcome))) => {
                if !outcome.valid {
                    // Stay idle; the iframe resets its buttons too.
                    return vec![
                        Effect::ShowFieldErrors(outcome),
                        Effect::Post(ParentMessage::OrderCreationFailed {
                            message: "Please fill in all required fields.".to_string(),
                        }),
                    ];
                }
                self.state = BridgeState::CreatingOrder;
                let id = self.begin_request();
                vec![Effect::CreateOrder(id)]
            }
            (BridgeState::Validating, RoundTrip::Validate(Err(message))) => {
                warn!(message, "validation round trip failed");
                vec![
                    Effect::ShowError(message.clone()),
                    Effect::Post(ParentMessage::OrderCreationFailed { message }),
                ]
            }
            (BridgeState::CreatingOrder, RoundTrip::CreateOrder(Ok(created))) => {
                info!(order_id = created.order_id, "order registered, handing to iframe");
                self.state = BridgeState::AwaitingApproval {
                    order_id: created.order_id,
                    order_key: created.order_key.clone(),
                };
                vec![Effect::Post(ParentMessage::CreatePaypalOrder {
                    order_id: created.order_id,
                    order_key: created.order_key,
                    proxy_data: created.proxy_data,
                })]
            }
            (BridgeState::CreatingOrder, RoundTrip::CreateOrder(Err(message))) => {
                warn!(message, "order creation failed");
                vec![
                    Effect::ShowError(message.clone()),
                    Effect::Post(ParentMessage::OrderCreationFailed { message }),
                ]
            }
            (BridgeState::Completing { .. }, RoundTrip::CompleteOrder(Ok(completed))) => {
                vec![Effect::Navigate(completed.redirect)]
            }
            (BridgeState::Completing { order_id }, RoundTrip::CompleteOrder(Err(message))) => {
                warn!(order_id, message, "order completion failed");
                vec![Effect::ShowError(message)]
            }
            (state, response) => {
                // Response kind does not match the state that issued it.
                warn!(
                    state = state.name(),
                    response = match response {
                        RoundTrip::Validate(_) => "validate",
                        RoundTrip::CreateOrder(_) => "create_order",
                        RoundTrip::CompleteOrder(_) => "complete_order",
                    },
                    "mismatched round trip; resetting"
                );
                Vec::new()
            }
        }
    }

    /// Decide what the form's submit handler should do.
    ///
    /// While our payment flow is active the native submit is suppressed; a
    /// loaded PayPal button gets the click forwarded instead.
    pub fn handle_submit(&mut self) -> SubmitAction {
        match self.state {
            BridgeState::AwaitingApproval { .. } | BridgeState::Completing { .. } => {
                SubmitAction::AllowDefault
            }
            _ => {
                let effects = if self.button_loaded {
                    vec![Effect::Post(ParentMessage::TriggerPaypalButton)]
                } else {
                    Vec::new()
                };
                SubmitAction::Suppress(effects)
            }
        }
    }
}
