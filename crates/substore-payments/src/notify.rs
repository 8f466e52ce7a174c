//! Confirmation Notifications
//!
//! Best-effort order confirmations. Call sites log failures and move on;
//! a broken notifier never fails a checkout or a webhook.

use async_trait::async_trait;

use substore_core::Order;

use crate::error::Result;

/// Notification sink for order confirmations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a purchase confirmation for an order
    async fn order_confirmation(&self, order: &Order) -> Result<()>;
}

/// Notifier that only logs (stand-in for an email sender)
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_confirmation(&self, order: &Order) -> Result<()> {
        tracing::info!(
            order_id = %order.id,
            email = %order.customer.email,
            total = %order.totals.total,
            "Order confirmation sent"
        );
        Ok(())
    }
}
