//! Payment Gateway Integration
//!
//! Implements the RupantorPay hosted-checkout flow: create a payment to
//! obtain a redirect URL, then confirm the outcome through a webhook or a
//! synchronous verification call.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, PaymentError, Result};

/// One purchasable line carried in requests and provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub duration: String,
}

/// Typed metadata attached to every payment so the webhook can locate the
/// order later. Provider-specific extras ride in the open `extra` map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(rename = "orderId")]
    pub order_id: String,

    #[serde(rename = "customerPhone")]
    pub customer_phone: String,

    pub items: Vec<LineItem>,

    pub currency: String,

    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Domain-level request to create a payment
#[derive(Clone, Debug)]
pub struct CreatePayment {
    pub fullname: String,
    pub email: String,
    pub amount: Decimal,
    pub meta_data: PaymentMetadata,
}

/// Result of creating a payment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentCreated {
    /// URL to redirect the customer to
    pub payment_url: String,

    /// Provider message
    pub message: String,
}

/// Full verification payload from the provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: String,
    pub fullname: String,
    pub email: String,
    pub amount: String,
    pub transaction_id: String,
    pub trx_id: String,
    pub currency: String,
    pub payment_method: String,
    #[serde(default)]
    pub meta_data: Option<PaymentMetadata>,
}

/// Payment gateway trait (Strategy pattern)
///
/// Implement this per provider; tests use [`crate::mock::MockGateway`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// True iff a provider credential is present. All network calls
    /// short-circuit with a configuration error when false.
    fn is_configured(&self) -> bool;

    /// Create a payment and return the redirect URL
    async fn create_payment(&self, request: CreatePayment) -> Result<PaymentCreated>;

    /// Verify a payment by transaction id; the authoritative check when
    /// the provider does not deliver a webhook
    async fn verify_payment(&self, transaction_id: &str) -> Result<VerifyResponse>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Render an amount per provider rules: whole numbers without decimals,
/// fractional amounts with them.
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Gateway configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub webhook_url: String,
    pub client_host: String,
}

impl GatewayConfig {
    /// Build from environment variables. A missing API key leaves the
    /// gateway unconfigured rather than failing construction.
    pub fn from_env() -> Self {
        let public_base =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        Self {
            api_key: std::env::var("RUPANTORPAY_API_KEY").unwrap_or_default(),
            base_url: std::env::var("RUPANTORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://payment.rupantorpay.com".into()),
            success_url: format!("{public_base}/payment/success"),
            cancel_url: format!("{public_base}/payment/cancel"),
            webhook_url: format!("{public_base}/api/payment/webhook"),
            client_host: std::env::var("CLIENT_HOST").unwrap_or_else(|_| "localhost".into()),
        }
    }
}

/// Wire request for `POST /api/payment/checkout`
#[derive(Debug, Serialize)]
struct CheckoutPayload<'a> {
    fullname: &'a str,
    email: &'a str,
    amount: String,
    success_url: &'a str,
    cancel_url: &'a str,
    webhook_url: &'a str,
    meta_data: &'a PaymentMetadata,
}

/// Wire response from payment creation
#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    payment_url: Option<String>,
}

/// RupantorPay client wrapper
pub struct RupantorPayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl RupantorPayClient {
    /// Create a new client
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::new(GatewayConfig::from_env())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn require_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(PaymentError::Config(
                "RUPANTORPAY_API_KEY not set".into(),
            ))
        }
    }
}

#[async_trait]
impl PaymentGateway for RupantorPayClient {
    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn create_payment(&self, request: CreatePayment) -> Result<PaymentCreated> {
        self.require_configured()?;

        let payload = CheckoutPayload {
            fullname: &request.fullname,
            email: &request.email,
            amount: format_amount(request.amount),
            success_url: &self.config.success_url,
            cancel_url: &self.config.cancel_url,
            webhook_url: &self.config.webhook_url,
            meta_data: &request.meta_data,
        };

        let response = self
            .http
            .post(format!("{}/api/payment/checkout", self.config.base_url))
            .header("X-API-KEY", &self.config.api_key)
            .header("X-CLIENT", &self.config.client_host)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Payment creation request failed");
                PaymentError::Transport("payment provider unreachable".into())
            })?;

        let body: CheckoutResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Unreadable payment creation response");
            PaymentError::Transport("invalid response from payment provider".into())
        })?;

        if !body.status {
            return Err(PaymentError::Provider(body.message));
        }

        let payment_url = body
            .payment_url
            .ok_or_else(|| PaymentError::Provider("No payment URL returned".into()))?;

        Ok(PaymentCreated {
            payment_url,
            message: body.message,
        })
    }

    async fn verify_payment(&self, transaction_id: &str) -> Result<VerifyResponse> {
        if transaction_id.is_empty() {
            return Err(PaymentError::Validation(vec![FieldError::new(
                "transaction_id",
                "Transaction ID is required",
            )]));
        }

        self.require_configured()?;

        let response = self
            .http
            .post(format!(
                "{}/api/payment/verify-payment",
                self.config.base_url
            ))
            .header("X-API-KEY", &self.config.api_key)
            .json(&serde_json::json!({ "transaction_id": transaction_id }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Payment verification request failed");
                PaymentError::Transport("payment provider unreachable".into())
            })?;

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Unreadable payment verification response");
            PaymentError::Transport("invalid response from payment provider".into())
        })
    }

    fn name(&self) -> &str {
        "rupantorpay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn unconfigured_client() -> RupantorPayClient {
        RupantorPayClient::new(GatewayConfig {
            api_key: String::new(),
            base_url: "https://payment.rupantorpay.com".into(),
            success_url: "http://localhost:3000/payment/success".into(),
            cancel_url: "http://localhost:3000/payment/cancel".into(),
            webhook_url: "http://localhost:3000/api/payment/webhook".into(),
            client_host: "localhost".into(),
        })
    }

    #[test]
    fn test_format_amount_strips_trailing_zeros() {
        assert_eq!(format_amount(dec!(20)), "20");
        assert_eq!(format_amount(dec!(20.00)), "20");
        assert_eq!(format_amount(dec!(19.99)), "19.99");
        assert_eq!(format_amount(dec!(0.50)), "0.5");
    }

    #[tokio::test]
    async fn test_create_short_circuits_when_unconfigured() {
        let client = unconfigured_client();
        assert!(!client.is_configured());

        let result = client
            .create_payment(CreatePayment {
                fullname: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                amount: dec!(11.00),
                meta_data: PaymentMetadata {
                    order_id: "ORD-1".into(),
                    customer_phone: "+8801700000000".into(),
                    items: vec![],
                    currency: "USD".into(),
                    timestamp: Utc::now(),
                    extra: HashMap::new(),
                },
            })
            .await;

        assert!(matches!(result, Err(PaymentError::Config(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_transaction_id() {
        let client = unconfigured_client();
        let result = client.verify_payment("").await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_metadata_extra_fields_round_trip() {
        let mut extra = HashMap::new();
        extra.insert("campaign".to_string(), serde_json::json!("spring-sale"));

        let meta = PaymentMetadata {
            order_id: "ORD-1".into(),
            customer_phone: "+880".into(),
            items: vec![],
            currency: "USD".into(),
            timestamp: Utc::now(),
            extra,
        };

        let raw = serde_json::to_string(&meta).unwrap();
        assert!(raw.contains("\"orderId\":\"ORD-1\""));
        assert!(raw.contains("\"campaign\":\"spring-sale\""));

        let back: PaymentMetadata = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.extra.get("campaign").unwrap(), "spring-sale");
    }
}
