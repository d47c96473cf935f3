// Error types for notification delivery

use thiserror::Error;

/// Result type alias for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors surfaced by the notification service.
///
/// Live-push failures are not represented here; see [`crate::DeliveryMiss`].
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Invalid input (empty message, malformed identity). Not retryable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced user or notification does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failure. The caller may retry the whole operation.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NotifyError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        NotifyError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        NotifyError::NotFound(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        NotifyError::Store(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, NotifyError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NotifyError::NotFound(_))
    }
}
