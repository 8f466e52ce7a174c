//! Checkout Orchestration
//!
//! Ties the cart, catalog, order store and gateway together: validates the
//! submission, computes totals, persists the pending order, clears the
//! cart, and hands the caller the provider redirect URL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use substore_core::{
    CartStore, Currency, Customer, Order, OrderItem, OrderStatus, OrderStore, ShippingAddress,
    Totals,
};

use crate::error::{FieldError, PaymentError, Result};
use crate::gateway::{CreatePayment, LineItem, PaymentGateway, PaymentMetadata};
use crate::notify::Notifier;

/// A sellable product with its primary price tier
#[derive(Clone, Debug)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Primary tier price in USD
    pub price: Decimal,
    /// Primary tier duration, e.g. "1 month"
    pub duration: String,
}

/// Product lookup (the catalog itself is an external collaborator)
pub trait ProductCatalog: Send + Sync {
    fn lookup(&self, product_id: &str) -> Option<Product>;
}

/// Catalog over a fixed product list
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

impl ProductCatalog for StaticCatalog {
    fn lookup(&self, product_id: &str) -> Option<Product> {
        self.products.iter().find(|p| p.id == product_id).cloned()
    }
}

/// Customer-entered checkout details
#[derive(Clone, Debug, Default)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: ShippingAddress,
    pub notes: String,
}

/// Successful checkout submission
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub order_id: String,
    /// Provider URL to redirect the customer to
    pub payment_url: String,
}

/// Checkout orchestrator
pub struct CheckoutOrchestrator {
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutOrchestrator {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            orders,
            gateway,
            notifier,
        }
    }

    /// Submit a checkout.
    ///
    /// Validation failures return field-level errors before any write or
    /// network call. The cart is cleared only once the pending order has
    /// been durably written; a gateway failure after that point leaves
    /// the order in `pending` for later reconciliation.
    pub async fn submit(
        &self,
        cart: &mut CartStore,
        details: CustomerDetails,
        currency: Currency,
    ) -> Result<CheckoutOutcome> {
        self.validate(cart, &details)?;

        if !self.gateway.is_configured() {
            return Err(PaymentError::Config("payment gateway not configured".into()));
        }

        let mut order_items = Vec::new();
        let mut line_items = Vec::new();
        let mut subtotal = Decimal::ZERO;

        for entry in cart.items() {
            // validate() already confirmed every product resolves
            let Some(product) = self.catalog.lookup(&entry.product_id) else {
                continue;
            };

            subtotal += product.price * Decimal::from(entry.quantity);
            order_items.push(OrderItem {
                name: product.name.clone(),
                quantity: entry.quantity,
                price: product.price,
                duration: product.duration.clone(),
            });
            line_items.push(LineItem {
                product_id: product.id,
                name: product.name,
                quantity: entry.quantity,
                price: product.price,
                duration: product.duration,
            });
        }

        let totals = Totals::from_subtotal(subtotal);
        let order_id = Order::generate_id();

        let order = Order {
            id: order_id.clone(),
            created_at: Utc::now(),
            customer: Customer {
                name: details.name.clone(),
                email: details.email.clone(),
                phone: details.phone.clone(),
            },
            items: order_items,
            totals: totals.clone(),
            currency,
            status: OrderStatus::Pending,
            shipping_address: details.shipping_address,
            notes: details.notes,
            payment_details: None,
        };

        self.orders.save(&order)?;
        cart.clear();

        let created = self
            .gateway
            .create_payment(CreatePayment {
                fullname: details.name,
                email: details.email,
                amount: totals.total,
                meta_data: PaymentMetadata {
                    order_id: order_id.clone(),
                    customer_phone: details.phone,
                    items: line_items,
                    currency: currency.as_str().to_string(),
                    timestamp: Utc::now(),
                    extra: HashMap::new(),
                },
            })
            .await?;

        if let Err(e) = self.notifier.order_confirmation(&order).await {
            tracing::warn!(order_id = %order_id, error = %e, "Confirmation notification failed");
        }

        tracing::info!(order_id = %order_id, total = %totals.total, "Checkout submitted");

        Ok(CheckoutOutcome {
            order_id,
            payment_url: created.payment_url,
        })
    }

    fn validate(&self, cart: &CartStore, details: &CustomerDetails) -> Result<()> {
        let mut errors = Vec::new();

        if cart.is_empty() {
            errors.push(FieldError::new("cart", "Cart is empty"));
        }
        if details.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if details.email.trim().is_empty() || !details.email.contains('@') {
            errors.push(FieldError::new("email", "A valid email is required"));
        }
        if details.phone.trim().is_empty() {
            errors.push(FieldError::new("phone", "Phone is required"));
        }

        for entry in cart.items() {
            if self.catalog.lookup(&entry.product_id).is_none() {
                errors.push(FieldError::new(
                    "items",
                    format!("Unknown product: {}", entry.product_id),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use substore_core::{MemoryStorage, StorageOrderStore};

    use crate::mock::MockGateway;
    use crate::notify::LogNotifier;

    fn catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new(vec![Product {
            id: "1".into(),
            name: "Streaming Plus".into(),
            price: dec!(5.00),
            duration: "1 month".into(),
        }]))
    }

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+8801700000000".into(),
            shipping_address: ShippingAddress::default(),
            notes: String::new(),
        }
    }

    fn orchestrator(
        gateway: Arc<MockGateway>,
    ) -> (CheckoutOrchestrator, Arc<StorageOrderStore>) {
        let orders = Arc::new(StorageOrderStore::new(Arc::new(MemoryStorage::new())));
        let orchestrator = CheckoutOrchestrator::new(
            catalog(),
            orders.clone(),
            gateway,
            Arc::new(LogNotifier),
        );
        (orchestrator, orders)
    }

    #[tokio::test]
    async fn test_end_to_end_checkout() {
        let gateway = Arc::new(MockGateway::new());
        let (orchestrator, orders) = orchestrator(gateway.clone());

        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("1", 2);

        let outcome = orchestrator
            .submit(&mut cart, customer(), Currency::Usd)
            .await
            .unwrap();

        assert!(!outcome.payment_url.is_empty());
        assert!(cart.is_empty());

        let order = orders.get(&outcome.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.totals.subtotal, dec!(10.00));
        assert_eq!(order.totals.tax, dec!(1.00));
        assert_eq!(order.totals.shipping, Decimal::ZERO);
        assert_eq!(order.totals.total, dec!(11.00));

        // Gateway received the order id and line items in metadata.
        let created = gateway.created_payments();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].meta_data.order_id, outcome.order_id);
        assert_eq!(created[0].meta_data.items.len(), 1);
        assert_eq!(created[0].amount, dec!(11.00));
    }

    #[tokio::test]
    async fn test_validation_failures_make_no_calls() {
        let gateway = Arc::new(MockGateway::new());
        let (orchestrator, orders) = orchestrator(gateway.clone());

        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        let result = orchestrator
            .submit(&mut cart, CustomerDetails::default(), Currency::Usd)
            .await;

        let Err(PaymentError::Validation(fields)) = result else {
            panic!("expected validation error");
        };
        // cart, name, email, phone
        assert_eq!(fields.len(), 4);
        assert!(gateway.created_payments().is_empty());
        assert!(orders.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_fails_validation() {
        let gateway = Arc::new(MockGateway::new());
        let (orchestrator, _) = orchestrator(gateway);

        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("no-such-product", 1);

        let result = orchestrator
            .submit(&mut cart, customer(), Currency::Usd)
            .await;

        let Err(PaymentError::Validation(fields)) = result else {
            panic!("expected validation error");
        };
        assert!(fields.iter().any(|f| f.message.contains("no-such-product")));
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_writes_nothing() {
        let gateway = Arc::new(MockGateway::unconfigured());
        let (orchestrator, orders) = orchestrator(gateway);

        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("1", 2);

        let result = orchestrator
            .submit(&mut cart, customer(), Currency::Usd)
            .await;

        assert!(matches!(result, Err(PaymentError::Config(_))));
        assert!(orders.list().unwrap().is_empty());
        // Cart survives an aborted submission.
        assert_eq!(cart.items().len(), 1);
    }
}
