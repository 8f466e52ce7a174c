//! HTTP Handlers
//!
//! The payment API surface: create, verify, webhook, plus GET descriptor
//! variants and a health check. Request/response shapes follow the
//! storefront's existing wire contract.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use substore_core::{
    Currency, Customer, Order, OrderItem, OrderStatus, OrderStore, ShippingAddress, Totals,
};
use substore_payments::{
    CreatePayment, LineItem, PaymentError, PaymentGateway, PaymentMetadata, VerifyResponse,
    WebhookHandler, WebhookPayload,
};

use crate::state::AppState;

/// Header carrying the webhook HMAC signature
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway_configured: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_url: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub data: VerifyResponse,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn payment_error_response(e: &PaymentError) -> HandlerError {
    let status = match e {
        PaymentError::Validation(_) | PaymentError::Provider(_) => StatusCode::BAD_REQUEST,
        PaymentError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Transport(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Signature(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.user_message())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway_configured: state.gateway.is_configured(),
    })
}

/// `POST /api/payment/create`
///
/// Persists a pending order record so the webhook can locate it later,
/// then asks the gateway for a redirect URL.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, HandlerError> {
    let name = payload.customer_name.unwrap_or_default();
    let email = payload.customer_email.unwrap_or_default();

    if name.is_empty()
        || email.is_empty()
        || payload.total_amount.is_none()
        || payload.items.is_empty()
    {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: customerName, customerEmail, totalAmount, items",
        ));
    }
    let total_amount = payload.total_amount.unwrap_or_default();

    if !state.gateway.is_configured() {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Payment gateway not configured",
        ));
    }

    let order_id = payload
        .order_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(Order::generate_id);

    let currency = match payload.currency.as_deref() {
        Some("BDT") => Currency::Bdt,
        _ => Currency::Usd,
    };

    let phone = payload.customer_phone.unwrap_or_default();

    let subtotal: Decimal = payload
        .items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum();

    let order = Order {
        id: order_id.clone(),
        created_at: Utc::now(),
        customer: Customer {
            name: name.clone(),
            email: email.clone(),
            phone: phone.clone(),
        },
        items: payload
            .items
            .iter()
            .map(|i| OrderItem {
                name: i.name.clone(),
                quantity: i.quantity,
                price: i.price,
                duration: i.duration.clone(),
            })
            .collect(),
        totals: Totals::from_subtotal(subtotal),
        currency,
        status: OrderStatus::Pending,
        shipping_address: ShippingAddress::default(),
        notes: String::new(),
        payment_details: None,
    };

    state.orders.save(&order).map_err(|e| {
        tracing::error!(order_id = %order_id, error = %e, "Failed to persist order");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    let created = state
        .gateway
        .create_payment(CreatePayment {
            fullname: name,
            email,
            amount: total_amount,
            meta_data: PaymentMetadata {
                order_id: order_id.clone(),
                customer_phone: phone,
                items: payload.items,
                currency: currency.as_str().to_string(),
                timestamp: Utc::now(),
                extra: HashMap::new(),
            },
        })
        .await
        .map_err(|e| {
            tracing::error!(order_id = %order_id, error = %e, "Payment creation failed");
            payment_error_response(&e)
        })?;

    Ok(Json(CreatePaymentResponse {
        success: true,
        payment_url: created.payment_url,
        message: created.message,
    }))
}

/// `GET /api/payment/create`: capability descriptor, no side effects
pub async fn create_payment_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Payment creation endpoint",
        "configured": state.gateway.is_configured(),
        "usage": {
            "method": "POST",
            "body": {
                "customerName": "string",
                "customerEmail": "string",
                "customerPhone": "string",
                "items": [{
                    "productId": "string",
                    "name": "string",
                    "quantity": "number",
                    "price": "number",
                    "duration": "string"
                }],
                "totalAmount": "number",
                "currency": "string",
                "orderId": "string"
            }
        }
    }))
}

/// `POST /api/payment/verify`
///
/// Queries the provider for the authoritative payment state and applies
/// it to the referenced order through the same dispatch as a webhook.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, HandlerError> {
    let transaction_id = payload.transaction_id.unwrap_or_default();
    if transaction_id.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Transaction ID is required",
        ));
    }

    if !state.gateway.is_configured() {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Payment gateway not configured",
        ));
    }

    let data = state
        .gateway
        .verify_payment(&transaction_id)
        .await
        .map_err(|e| {
            tracing::error!(transaction_id = %transaction_id, error = %e, "Verification failed");
            payment_error_response(&e)
        })?;

    // Reconcile the order with the verified status; the response to the
    // caller carries the provider data either way.
    let handler = WebhookHandler::new(state.orders.clone(), state.notifier.clone(), None);
    match handler.apply_verification(&data).await {
        Ok(outcome) => {
            tracing::info!(transaction_id = %transaction_id, ?outcome, "Verification reconciled")
        }
        Err(e) => {
            tracing::warn!(transaction_id = %transaction_id, error = %e, "Verification reconciliation failed")
        }
    }

    Ok(Json(VerifyPaymentResponse {
        success: true,
        data,
    }))
}

/// `GET /api/payment/verify`: capability descriptor, no side effects
pub async fn verify_payment_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Payment verification endpoint",
        "configured": state.gateway.is_configured(),
        "usage": {
            "method": "POST",
            "body": {
                "transaction_id": "string"
            }
        }
    }))
}

/// `POST /api/payment/webhook`
///
/// Signature check first, then structural validation, then dispatch.
/// Once the payload is structurally valid the response is 200 regardless
/// of whether a matching order was found, to prevent redelivery storms.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, HandlerError> {
    let handler = WebhookHandler::new(
        state.orders.clone(),
        state.notifier.clone(),
        state.webhook_secret.clone(),
    );

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    handler
        .verify_signature(body.as_bytes(), signature)
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook signature rejected");
            error_response(StatusCode::UNAUTHORIZED, "Invalid signature")
        })?;

    let payload: WebhookPayload = serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(error = %e, "Unparseable webhook payload");
        error_response(StatusCode::BAD_REQUEST, "Invalid webhook payload")
    })?;

    match handler.handle(&payload).await {
        Ok(outcome) => {
            tracing::info!(transaction_id = %payload.transaction_id, ?outcome, "Webhook processed");
            Ok(Json(WebhookResponse { success: true }))
        }
        Err(e @ PaymentError::Validation(_)) => Err(payment_error_response(&e)),
        Err(e) => {
            tracing::error!(error = %e, "Webhook processing error");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook processing failed",
            ))
        }
    }
}

/// `GET /api/payment/webhook`: capability descriptor, no side effects
pub async fn payment_webhook_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Payment webhook endpoint",
        "configured": state.gateway.is_configured(),
        "signed": state.webhook_secret.is_some(),
    }))
}
