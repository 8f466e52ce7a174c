//! Webhook Handling
//!
//! Processes provider-initiated payment notifications: verifies the
//! optional HMAC signature over the raw body, then transitions the
//! referenced order through the status state machine. The same dispatch
//! backs synchronous verification results, so whichever arrives first
//! wins and a later conflicting outcome is an ignored anomaly.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use substore_core::{OrderStatus, OrderStore, PaymentDetails, TransitionOutcome};

use crate::error::{FieldError, PaymentError, Result};
use crate::gateway::{PaymentMetadata, VerifyResponse};
use crate::notify::Notifier;

type HmacSha256 = Hmac<Sha256>;

/// Provider webhook payload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub transaction_id: String,

    pub status: String,

    #[serde(default)]
    pub amount: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub fullname: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub meta_data: Option<PaymentMetadata>,

    /// Provider-supplied failure reason, if any
    #[serde(default)]
    pub reason: Option<String>,
}

/// What a webhook delivery did to the referenced order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Status transition applied
    Applied(OrderStatus),

    /// Redelivery of an outcome already recorded; no change
    AlreadyApplied,

    /// Conflicting outcome for an order in a terminal state; logged as an
    /// anomaly and not applied
    ConflictIgnored { current: OrderStatus },

    /// No order matched the metadata's order id; logged and skipped
    OrderNotFound,

    /// Status value the receiver does not act on
    Unhandled,
}

/// Webhook handler
pub struct WebhookHandler {
    orders: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    secret: Option<String>,
}

impl WebhookHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        secret: Option<String>,
    ) -> Self {
        Self {
            orders,
            notifier,
            secret,
        }
    }

    /// Verify the signature header against HMAC-SHA256 over the raw body.
    ///
    /// A no-op when no shared secret is configured. Comparison is
    /// constant-time; a mismatch means no order mutation happens.
    pub fn verify_signature(&self, body: &[u8], header: Option<&str>) -> Result<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };

        let header = header
            .ok_or_else(|| PaymentError::Signature("missing signature header".into()))?;
        let provided = hex::decode(header.trim())
            .map_err(|_| PaymentError::Signature("malformed signature header".into()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PaymentError::Signature("invalid webhook secret".into()))?;
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| PaymentError::Signature("signature mismatch".into()))
    }

    /// Dispatch a webhook payload to the referenced order.
    ///
    /// Every outcome except a validation failure is a success from the
    /// provider's point of view; missing orders and conflicting statuses
    /// are logged, not surfaced, to avoid redelivery storms.
    pub async fn handle(&self, payload: &WebhookPayload) -> Result<WebhookOutcome> {
        let mut missing = Vec::new();
        if payload.transaction_id.is_empty() {
            missing.push(FieldError::new("transaction_id", "Transaction ID is required"));
        }
        if payload.status.is_empty() {
            missing.push(FieldError::new("status", "Status is required"));
        }
        if !missing.is_empty() {
            return Err(PaymentError::Validation(missing));
        }

        let status = payload.status.to_uppercase();
        let now = chrono::Utc::now();

        let mut details = PaymentDetails {
            transaction_id: payload.transaction_id.clone(),
            payment_method: payload.payment_method.clone().unwrap_or_default(),
            paid_amount: payload
                .amount
                .as_deref()
                .and_then(|a| a.parse::<Decimal>().ok())
                .unwrap_or(Decimal::ZERO),
            currency: payload.currency.clone().unwrap_or_default(),
            completed_at: None,
            failed_at: None,
            pending_at: None,
            failure_reason: None,
        };

        let next = match status.as_str() {
            "COMPLETED" => {
                details.completed_at = Some(now);
                OrderStatus::Completed
            }
            "FAILED" | "ERROR" => {
                details.failed_at = Some(now);
                details.failure_reason = Some(
                    payload
                        .reason
                        .clone()
                        .unwrap_or_else(|| "Payment failed".into()),
                );
                OrderStatus::Failed
            }
            "PENDING" => {
                details.pending_at = Some(now);
                OrderStatus::Pending
            }
            other => {
                tracing::debug!(
                    transaction_id = %payload.transaction_id,
                    status = %other,
                    "Unhandled webhook status"
                );
                return Ok(WebhookOutcome::Unhandled);
            }
        };

        let Some(order_id) = payload
            .meta_data
            .as_ref()
            .map(|m| m.order_id.clone())
            .filter(|id| !id.is_empty())
        else {
            tracing::warn!(
                transaction_id = %payload.transaction_id,
                "Webhook carries no order id, skipping"
            );
            return Ok(WebhookOutcome::OrderNotFound);
        };

        match self.orders.transition(&order_id, next, Some(details))? {
            TransitionOutcome::Applied => {
                tracing::info!(order_id = %order_id, status = %next, "Order updated from webhook");

                if next == OrderStatus::Completed {
                    self.notify_confirmation(&order_id).await;
                }

                Ok(WebhookOutcome::Applied(next))
            }
            TransitionOutcome::AlreadyInState => {
                tracing::info!(
                    order_id = %order_id,
                    status = %next,
                    "Webhook redelivery, order already in state"
                );
                Ok(WebhookOutcome::AlreadyApplied)
            }
            TransitionOutcome::Rejected { current } => {
                tracing::warn!(
                    order_id = %order_id,
                    current = %current,
                    attempted = %next,
                    "Webhook outcome conflicts with recorded terminal state, ignoring"
                );
                Ok(WebhookOutcome::ConflictIgnored { current })
            }
            TransitionOutcome::NotFound => {
                tracing::warn!(
                    order_id = %order_id,
                    transaction_id = %payload.transaction_id,
                    "Webhook references unknown order"
                );
                Ok(WebhookOutcome::OrderNotFound)
            }
        }
    }

    /// Apply a synchronous verification result through the same dispatch
    /// as a webhook delivery.
    pub async fn apply_verification(&self, verified: &VerifyResponse) -> Result<WebhookOutcome> {
        let payload = WebhookPayload {
            transaction_id: verified.transaction_id.clone(),
            status: verified.status.clone(),
            amount: Some(verified.amount.clone()),
            currency: Some(verified.currency.clone()),
            payment_method: Some(verified.payment_method.clone()),
            fullname: Some(verified.fullname.clone()),
            email: Some(verified.email.clone()),
            meta_data: verified.meta_data.clone(),
            reason: None,
        };

        self.handle(&payload).await
    }

    async fn notify_confirmation(&self, order_id: &str) {
        let order = match self.orders.get(order_id) {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Could not load order for confirmation");
                return;
            }
        };

        if let Err(e) = self.notifier.order_confirmation(&order).await {
            tracing::warn!(order_id = %order_id, error = %e, "Confirmation notification failed");
        }
    }
}
