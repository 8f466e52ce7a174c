//! # substore-payments
//!
//! Payment gateway integration, webhook handling and checkout
//! orchestration for substore.
//!
//! ## Payment flow
//!
//! The integration follows the RupantorPay hosted-checkout model:
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  Checkout   │────▶│  Provider Hosted │────▶│ success_url │
//! │  (pending)  │     │  Payment Page    │     │  /webhook   │
//! └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! A checkout submission persists a `pending` order and redirects the
//! customer to the provider. The outcome comes back on two racing paths:
//! the asynchronous webhook and the synchronous verification call made
//! after the redirect. Both feed the same status dispatch, and the order
//! store's compare-and-set transition guarantees the first terminal
//! outcome wins while redeliveries stay idempotent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use substore_payments::{CheckoutOrchestrator, RupantorPayClient, LogNotifier};
//!
//! let gateway = Arc::new(RupantorPayClient::from_env());
//!
//! let orchestrator = CheckoutOrchestrator::new(catalog, orders, gateway, notifier);
//! let outcome = orchestrator.submit(&mut cart, details, Currency::Usd).await?;
//!
//! // Redirect user to: outcome.payment_url
//! ```

mod checkout;
mod error;
mod gateway;
mod mock;
mod notify;
mod webhook;

pub use checkout::{
    CheckoutOrchestrator, CheckoutOutcome, CustomerDetails, Product, ProductCatalog, StaticCatalog,
};
pub use error::{FieldError, PaymentError, Result};
pub use gateway::{
    format_amount, CreatePayment, GatewayConfig, LineItem, PaymentCreated, PaymentGateway,
    PaymentMetadata, RupantorPayClient, VerifyResponse,
};
pub use mock::MockGateway;
pub use notify::{LogNotifier, Notifier};
pub use webhook::{WebhookHandler, WebhookOutcome, WebhookPayload};
