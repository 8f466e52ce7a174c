//! Payment Error Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// A validation failure on a single input field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Required input missing or malformed; no side effects occurred
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    /// Gateway credential absent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider unreachable or returned an unreadable response.
    /// Raw transport detail is logged, never surfaced to callers.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// Provider rejected the request with a structured message
    #[error("Gateway rejected request: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    Signature(String),

    /// Order storage error
    #[error("Store error: {0}")]
    Store(#[from] substore_core::StoreError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Transport(_) | PaymentError::Store(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Validation(_) => "Please check the highlighted fields.".into(),
            PaymentError::Config(_) => "Payments are not available right now.".into(),
            PaymentError::Transport(_) => "Payment processing failed. Please try again.".into(),
            PaymentError::Provider(msg) => msg.clone(),
            PaymentError::Signature(_) => "Request could not be authenticated.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}
