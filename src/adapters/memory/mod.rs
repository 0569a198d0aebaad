//! In-memory adapter implementations.

pub mod order_store;

pub use order_store::InMemoryOrderStore;
