//! Error Types

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Durable storage unavailable or rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Order not found by id
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}
