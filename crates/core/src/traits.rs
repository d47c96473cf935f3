// Core traits for pluggable backends
//
// These traits keep the notification service storage-agnostic:
// - In-memory implementations for tests and dev mode
// - Database implementations for production

use async_trait::async_trait;

use crate::error::Result;
use crate::notification::{NewNotification, Notification, NotificationId, Page, UserId};

// ============================================================================
// NotificationStore - Durable notification rows
// ============================================================================

/// Trait for persisting and querying notifications
///
/// The store is the durability source of truth. Implementations report
/// failures as [`crate::NotifyError::Store`].
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new unread notification and return it with its assigned id
    async fn create(&self, input: NewNotification) -> Result<Notification>;

    /// List a user's notifications, most recent first
    async fn list_by_user(&self, user_id: UserId, page: Page) -> Result<Vec<Notification>>;

    /// Set the read flag on a single notification.
    /// Returns false when no such notification exists.
    async fn set_read(&self, id: NotificationId) -> Result<bool>;

    /// Set the read flag on every unread notification of a user.
    /// Returns the number of rows that changed.
    async fn set_all_read_for_user(&self, user_id: UserId) -> Result<u64>;

    /// Count a user's unread notifications
    async fn count_unread(&self, user_id: UserId) -> Result<u64> {
        let rows = self.list_by_user(user_id, Page::all()).await?;
        Ok(rows.iter().filter(|n| !n.is_read).count() as u64)
    }

    /// List every notification, most recent first
    async fn list_all(&self) -> Result<Vec<Notification>>;
}

// ============================================================================
// UserDirectory - Identity existence checks
// ============================================================================

/// Trait for resolving user identities
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether the user exists
    async fn exists(&self, user_id: UserId) -> Result<bool>;

    /// Every known user identity
    async fn list_user_ids(&self) -> Result<Vec<UserId>>;
}
