//! Checkout bridge: the cross-window protocol between the checkout page and
//! the hosted payment iframe, modelled as an explicit state machine.

pub mod controller;
pub mod driver;
pub mod messages;
pub mod state;

pub use controller::{
    CheckoutBridge, CompletionRequest, Effect, OrderCompleted, OrderCreated, RoundTrip,
    SubmitAction,
};
pub use driver::{BridgeDriver, CheckoutPage, CheckoutTransport, IframeChannel, TransportError};
pub use messages::{
    origin_of, ApprovalPayload, IframeEvent, ParentMessage, PostTarget, IFRAME_SOURCE,
    PARENT_SOURCE,
};
pub use state::{BridgeState, RequestId};
