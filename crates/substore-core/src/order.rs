//! Order Records and Lifecycle
//!
//! An order is a persisted record of a checkout attempt. Its status moves
//! through a small state machine driven by the payment provider (redirect
//! verification or webhook), and the store enforces that machine with a
//! compare-and-set so racing writers cannot downgrade a terminal outcome.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::pricing::{Currency, Totals};
use crate::storage::{KeyValueStorage, ORDER_HISTORY_KEY};

/// Order lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Pending => next != OrderStatus::Pending,
            OrderStatus::Processing => {
                matches!(next, OrderStatus::Completed | OrderStatus::Failed)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer identity captured at checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// One purchased line
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub duration: String,
}

/// Shipping address captured at checkout
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    pub country: String,
}

/// Payment reconciliation data, folded in from the provider's redirect
/// verification or webhook. Absent until a provider response arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,

    #[serde(rename = "paymentMethod")]
    pub payment_method: String,

    #[serde(rename = "paidAmount")]
    pub paid_amount: Decimal,

    pub currency: String,

    #[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(rename = "failedAt", skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    #[serde(rename = "pendingAt", skip_serializing_if = "Option::is_none")]
    pub pending_at: Option<DateTime<Utc>>,

    #[serde(rename = "failureReason", skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// A persisted checkout attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// Time-derived order id, `ORD-XXXXXXXX`
    pub id: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    pub customer: Customer,

    pub items: Vec<OrderItem>,

    pub totals: Totals,

    pub currency: Currency,

    pub status: OrderStatus,

    #[serde(rename = "shippingAddress")]
    pub shipping_address: ShippingAddress,

    #[serde(default)]
    pub notes: String,

    #[serde(
        rename = "paymentDetails",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_details: Option<PaymentDetails>,
}

impl Order {
    /// Generate a time-derived order id from the last 8 digits of the
    /// current epoch milliseconds.
    pub fn generate_id() -> String {
        format!("ORD-{:08}", Utc::now().timestamp_millis() % 100_000_000)
    }
}

/// Outcome of a status transition attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Transition applied and persisted
    Applied,

    /// Order already in the requested state; nothing changed
    AlreadyInState,

    /// The state machine forbids this transition (e.g. a terminal state
    /// would be downgraded); nothing changed
    Rejected { current: OrderStatus },

    /// No order with the given id
    NotFound,
}

/// Order record storage
///
/// Writers go through `transition` so concurrent webhook and verification
/// deliveries cannot overwrite each other: the current status is read and
/// checked against the state machine under the store's lock.
pub trait OrderStore: Send + Sync {
    /// Insert or replace an order by id
    fn save(&self, order: &Order) -> Result<()>;

    /// Get an order by id
    fn get(&self, id: &str) -> Result<Option<Order>>;

    /// All orders, oldest first
    fn list(&self) -> Result<Vec<Order>>;

    /// Compare-and-set status transition.
    ///
    /// Payment details are attached when the transition applies. A repeat
    /// of a terminal state is an `AlreadyInState` no-op that leaves the
    /// stored details untouched; a repeat of a non-terminal state applies
    /// the supplied details (last-writer-wins below terminal states).
    fn transition(
        &self,
        id: &str,
        next: OrderStatus,
        details: Option<PaymentDetails>,
    ) -> Result<TransitionOutcome>;
}

/// Order store persisting the full order history as JSON under a single
/// storage key, with all writes serialized behind one lock.
pub struct StorageOrderStore {
    storage: Arc<dyn KeyValueStorage>,
    write_lock: Mutex<()>,
}

impl StorageOrderStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<Order>> {
        match self.storage.get(ORDER_HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist(&self, orders: &[Order]) -> Result<()> {
        let raw = serde_json::to_string(orders)?;
        self.storage.set(ORDER_HISTORY_KEY, &raw)
    }
}

impl OrderStore for StorageOrderStore {
    fn save(&self, order: &Order) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Storage("order store lock poisoned".into()))?;

        let mut orders = self.load()?;
        if let Some(existing) = orders.iter_mut().find(|o| o.id == order.id) {
            *existing = order.clone();
        } else {
            orders.push(order.clone());
        }
        self.persist(&orders)
    }

    fn get(&self, id: &str) -> Result<Option<Order>> {
        Ok(self.load()?.into_iter().find(|o| o.id == id))
    }

    fn list(&self) -> Result<Vec<Order>> {
        self.load()
    }

    fn transition(
        &self,
        id: &str,
        next: OrderStatus,
        details: Option<PaymentDetails>,
    ) -> Result<TransitionOutcome> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Storage("order store lock poisoned".into()))?;

        let mut orders = self.load()?;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(TransitionOutcome::NotFound);
        };

        let current = order.status;

        if current == next {
            if current.is_terminal() || details.is_none() {
                return Ok(TransitionOutcome::AlreadyInState);
            }
            // Non-terminal states are last-writer-wins for details; only
            // terminal repeats are no-ops.
            order.payment_details = details;
            self.persist(&orders)?;
            return Ok(TransitionOutcome::Applied);
        }

        if !current.can_transition_to(next) {
            tracing::warn!(
                order_id = %id,
                current = %current,
                attempted = %next,
                "Rejected order status transition"
            );
            return Ok(TransitionOutcome::Rejected { current });
        }

        order.status = next;
        if details.is_some() {
            order.payment_details = details;
        }
        self.persist(&orders)?;

        Ok(TransitionOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rust_decimal_macros::dec;

    fn sample_order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            created_at: Utc::now(),
            customer: Customer {
                name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                phone: "+8801700000000".into(),
            },
            items: vec![OrderItem {
                name: "Streaming Plus".into(),
                quantity: 2,
                price: dec!(5.00),
                duration: "1 month".into(),
            }],
            totals: Totals::from_subtotal(dec!(10.00)),
            currency: Currency::Usd,
            status,
            shipping_address: ShippingAddress::default(),
            notes: String::new(),
            payment_details: None,
        }
    }

    fn paid_details(txn: &str) -> PaymentDetails {
        PaymentDetails {
            transaction_id: txn.into(),
            payment_method: "bkash".into(),
            paid_amount: dec!(11.00),
            currency: "USD".into(),
            completed_at: Some(Utc::now()),
            failed_at: None,
            pending_at: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Cancelled));
        assert!(!Processing.can_transition_to(Pending));

        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Processing, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_generated_id_shape() {
        let id = Order::generate_id();
        assert!(id.starts_with("ORD-"));
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_save_and_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let store = StorageOrderStore::new(storage.clone());

        store.save(&sample_order("ORD-1", OrderStatus::Pending)).unwrap();
        store.save(&sample_order("ORD-2", OrderStatus::Pending)).unwrap();

        // A second store over the same storage sees the same records.
        let reopened = StorageOrderStore::new(storage);
        assert_eq!(reopened.list().unwrap().len(), 2);
        assert!(reopened.get("ORD-1").unwrap().is_some());
        assert!(reopened.get("ORD-9").unwrap().is_none());
    }

    #[test]
    fn test_transition_applies_and_attaches_details() {
        let store = StorageOrderStore::new(Arc::new(MemoryStorage::new()));
        store.save(&sample_order("ORD-1", OrderStatus::Pending)).unwrap();

        let outcome = store
            .transition("ORD-1", OrderStatus::Completed, Some(paid_details("TXN-1")))
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let order = store.get("ORD-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(
            order.payment_details.unwrap().transaction_id,
            "TXN-1"
        );
    }

    #[test]
    fn test_repeat_transition_is_idempotent() {
        let store = StorageOrderStore::new(Arc::new(MemoryStorage::new()));
        store.save(&sample_order("ORD-1", OrderStatus::Pending)).unwrap();

        store
            .transition("ORD-1", OrderStatus::Completed, Some(paid_details("TXN-1")))
            .unwrap();
        let second = store
            .transition("ORD-1", OrderStatus::Completed, Some(paid_details("TXN-2")))
            .unwrap();

        assert_eq!(second, TransitionOutcome::AlreadyInState);
        // Original details untouched by the repeat.
        let order = store.get("ORD-1").unwrap().unwrap();
        assert_eq!(order.payment_details.unwrap().transaction_id, "TXN-1");
    }

    #[test]
    fn test_pending_repeat_applies_details() {
        let store = StorageOrderStore::new(Arc::new(MemoryStorage::new()));
        store.save(&sample_order("ORD-1", OrderStatus::Pending)).unwrap();

        let details = PaymentDetails {
            transaction_id: "TXN-1".into(),
            payment_method: "bkash".into(),
            paid_amount: dec!(11.00),
            currency: "USD".into(),
            completed_at: None,
            failed_at: None,
            pending_at: Some(Utc::now()),
            failure_reason: None,
        };

        let outcome = store
            .transition("ORD-1", OrderStatus::Pending, Some(details))
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let order = store.get("ORD-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        let details = order.payment_details.unwrap();
        assert_eq!(details.transaction_id, "TXN-1");
        assert!(details.pending_at.is_some());

        // Without details the repeat is a plain no-op.
        let outcome = store
            .transition("ORD-1", OrderStatus::Pending, None)
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::AlreadyInState);
    }

    #[test]
    fn test_terminal_state_is_never_downgraded() {
        let store = StorageOrderStore::new(Arc::new(MemoryStorage::new()));
        store.save(&sample_order("ORD-1", OrderStatus::Pending)).unwrap();

        store
            .transition("ORD-1", OrderStatus::Completed, Some(paid_details("TXN-1")))
            .unwrap();
        let conflict = store
            .transition("ORD-1", OrderStatus::Failed, None)
            .unwrap();

        assert_eq!(
            conflict,
            TransitionOutcome::Rejected {
                current: OrderStatus::Completed
            }
        );
        let order = store.get("ORD-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_transition_on_missing_order() {
        let store = StorageOrderStore::new(Arc::new(MemoryStorage::new()));
        let outcome = store
            .transition("ORD-404", OrderStatus::Completed, None)
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NotFound);
    }
}
