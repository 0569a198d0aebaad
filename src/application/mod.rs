//! Application layer: checkout orchestration over the ports.

pub mod callback;
pub mod checkout;
pub mod session;

pub use callback::{CallbackError, CallbackHandler, CallbackOutcome, CallbackRequest};
pub use checkout::{
    CheckoutError, CompleteOrderHandler, CompletedOrder, CreateOrderHandler, CreatedOrder,
    ValidateCheckoutHandler,
};
pub use session::{CartItem, SessionStore, ShippingRate};
