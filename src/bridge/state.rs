//! Checkout bridge states.
//!
//! One checkout attempt moves through these states in order; any failure or
//! cancellation resets to `Idle`. The state makes the old boolean-flag
//! bookkeeping (button loaded, order creating, order created) impossible to
//! hold inconsistently.

/// Where the bridge is in the current checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    /// Nothing in flight. The only state that accepts a new checkout.
    Idle,

    /// Form validation round trip in flight.
    Validating,

    /// Storefront order creation round trip in flight.
    CreatingOrder,

    /// Order registered; waiting for the shopper to approve in the iframe.
    AwaitingApproval { order_id: u64, order_key: String },

    /// Completion round trip in flight after approval.
    Completing { order_id: u64 },
}

impl BridgeState {
    /// A new checkout attempt may only start from `Idle`; re-entrant clicks
    /// while a round trip is in flight are ignored.
    pub fn can_start_checkout(&self) -> bool {
        matches!(self, BridgeState::Idle)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeState::Idle => "idle",
            BridgeState::Validating => "validating",
            BridgeState::CreatingOrder => "creating_order",
            BridgeState::AwaitingApproval { .. } => "awaiting_approval",
            BridgeState::Completing { .. } => "completing",
        }
    }
}

/// Identifier tying an async round trip to the state that started it.
///
/// Responses carrying a stale id (a newer attempt superseded them) are
/// discarded instead of being applied to the wrong attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);
