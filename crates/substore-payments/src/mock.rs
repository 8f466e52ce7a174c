//! Mock Payment Gateway
//!
//! For testing and demo purposes. Hands out deterministic redirect URLs
//! and verification payloads without touching the network.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{FieldError, PaymentError, Result};
use crate::gateway::{CreatePayment, PaymentCreated, PaymentGateway, VerifyResponse, format_amount};

/// Mock gateway with canned responses
pub struct MockGateway {
    configured: bool,
    verify_status: String,
    /// Requests seen by `create_payment`, for assertions
    created: Mutex<Vec<CreatePayment>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            configured: true,
            verify_status: "COMPLETED".into(),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Create a gateway that reports itself unconfigured
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Set the status `verify_payment` reports
    pub fn with_verify_status(mut self, status: impl Into<String>) -> Self {
        self.verify_status = status.into();
        self
    }

    /// Requests captured by `create_payment`
    pub fn created_payments(&self) -> Vec<CreatePayment> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create_payment(&self, request: CreatePayment) -> Result<PaymentCreated> {
        if !self.configured {
            return Err(PaymentError::Config("mock gateway unconfigured".into()));
        }

        let url = format!(
            "https://pay.example.com/checkout/{}?amount={}",
            request.meta_data.order_id,
            format_amount(request.amount)
        );

        if let Ok(mut created) = self.created.lock() {
            created.push(request);
        }

        Ok(PaymentCreated {
            payment_url: url,
            message: "Payment URL generated successfully".into(),
        })
    }

    async fn verify_payment(&self, transaction_id: &str) -> Result<VerifyResponse> {
        if transaction_id.is_empty() {
            return Err(PaymentError::Validation(vec![FieldError::new(
                "transaction_id",
                "Transaction ID is required",
            )]));
        }
        if !self.configured {
            return Err(PaymentError::Config("mock gateway unconfigured".into()));
        }

        let meta_data = self
            .created
            .lock()
            .ok()
            .and_then(|created| created.last().map(|c| c.meta_data.clone()));

        Ok(VerifyResponse {
            status: self.verify_status.clone(),
            fullname: "Mock Customer".into(),
            email: "customer@example.com".into(),
            amount: "0".into(),
            transaction_id: transaction_id.to_string(),
            trx_id: transaction_id.to_string(),
            currency: "USD".into(),
            payment_method: "MockPayment".into(),
            meta_data,
        })
    }

    fn name(&self) -> &str {
        "MockGateway"
    }
}
