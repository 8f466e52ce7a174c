//! # substore-core
//!
//! Domain models and stores for the substore order/payment lifecycle:
//! the cart, the order record store with its status state machine, the
//! pricing/currency resolver, and the key-value storage abstraction they
//! all persist through.

pub mod cart;
pub mod error;
pub mod order;
pub mod pricing;
pub mod storage;

pub use cart::{CartItem, CartStore};
pub use error::{Result, StoreError};
pub use order::{
    Customer, Order, OrderItem, OrderStatus, OrderStore, PaymentDetails, ShippingAddress,
    StorageOrderStore, TransitionOutcome,
};
pub use pricing::{Currency, Totals, TAX_RATE_PERCENT};
pub use storage::{KeyValueStorage, MemoryStorage, CART_KEY, CURRENCY_KEY, ORDER_HISTORY_KEY};
