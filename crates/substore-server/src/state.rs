//! Application State

use std::sync::Arc;

use substore_core::OrderStore;
use substore_payments::{Notifier, PaymentGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Order record store
    pub orders: Arc<dyn OrderStore>,

    /// Payment gateway client
    pub gateway: Arc<dyn PaymentGateway>,

    /// Confirmation notification sink
    pub notifier: Arc<dyn Notifier>,

    /// Shared secret for webhook signature verification (None = unsigned)
    pub webhook_secret: Option<String>,
}
