//! Ports: trait boundaries between the application core and its adapters.

pub mod order_store;
pub mod payment_proxy;

pub use order_store::{MarkPaidOutcome, NewOrder, OrderStore, PaymentReference, StoreError};
pub use payment_proxy::{PaymentProxy, ProxyAck, ProxyError, ProxyErrorCode};
