//! substore HTTP Server
//!
//! Axum-based server exposing the payment API: checkout creation,
//! verification, and the provider webhook.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use substore_core::{MemoryStorage, StorageOrderStore};
use substore_payments::{LogNotifier, PaymentGateway, RupantorPayClient};

use crate::handlers::{
    create_payment, create_payment_info, health_check, payment_webhook, payment_webhook_info,
    verify_payment, verify_payment_info,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Order records persist through the storage abstraction; swap in a
    // real datastore backend for production deployments.
    let storage = Arc::new(MemoryStorage::new());
    let orders = Arc::new(StorageOrderStore::new(storage));

    // Payment gateway
    let gateway = Arc::new(RupantorPayClient::from_env());
    if gateway.is_configured() {
        tracing::info!("✓ Payment gateway configured");
    } else {
        tracing::warn!("⚠ Payment gateway not configured - payments disabled");
        tracing::warn!("  Set RUPANTORPAY_API_KEY in .env");
    }

    let webhook_secret = std::env::var("RUPANTORPAY_WEBHOOK_SECRET").ok();
    if webhook_secret.is_some() {
        tracing::info!("✓ Webhook signature verification enabled");
    } else {
        tracing::warn!("⚠ RUPANTORPAY_WEBHOOK_SECRET not set - webhooks accepted unsigned");
    }

    // Build application state
    let state = AppState {
        orders,
        gateway,
        notifier: Arc::new(LogNotifier),
        webhook_secret,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/health", get(health_check))
        // Payment API
        .route("/api/payment/create", post(create_payment).get(create_payment_info))
        .route("/api/payment/verify", post(verify_payment).get(verify_payment_info))
        .route(
            "/api/payment/webhook",
            post(payment_webhook).get(payment_webhook_info),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 substore server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  POST /api/payment/create   - Create payment, get redirect URL");
    tracing::info!("  POST /api/payment/verify   - Verify a transaction");
    tracing::info!("  POST /api/payment/webhook  - Provider webhook");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
