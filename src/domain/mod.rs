//! Domain layer: pure types and protocol rules with no I/O.

pub mod checkout;
pub mod order;
pub mod signature;

pub use checkout::{validate_required_fields, CheckoutForm, ValidationOutcome};
pub use order::{
    format_amount, Address, LineItem, Order, OrderError, OrderId, OrderKey, OrderStatus,
    ShippingLine,
};
pub use signature::{hex_decode, hex_encode, RequestSigner};
