// Notification domain types
//
// These types represent the persisted Notification entity.
// Used by the service layer, storage backends and the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Identity of a user in the user directory.
pub type UserId = i64;

/// Identity of a persisted notification, assigned by the store.
pub type NotificationId = i64;

/// Type tag used when the caller does not supply one.
pub const DEFAULT_NOTIFICATION_TYPE: &str = "general";

/// Notification - a user-directed message persisted by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Notification {
    /// Unique identifier, monotonically assigned by the store.
    pub id: NotificationId,
    /// ID of the user this notification belongs to.
    pub user_id: UserId,
    /// Human-readable text.
    pub message: String,
    /// Free-form classification tag (e.g., "general", "info", "approval").
    #[serde(rename = "type")]
    pub notification_type: String,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// Timestamp when the notification was created.
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a new notification.
///
/// Rows are always created unread; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub notification_type: String,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn new(
        user_id: UserId,
        message: impl Into<String>,
        notification_type: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            message: message.into(),
            notification_type: notification_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Materialize the row the store persisted under `id`.
    pub fn into_notification(self, id: NotificationId) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            message: self.message,
            notification_type: self.notification_type,
            is_read: false,
            created_at: self.created_at,
        }
    }
}

/// Resolve the type tag for a new notification.
pub fn normalize_type(notification_type: Option<&str>) -> String {
    match notification_type.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_NOTIFICATION_TYPE.to_string(),
    }
}

/// Pagination for pull listings. A `None` or zero limit means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: Option<usize>, offset: usize) -> Self {
        Self {
            limit: limit.filter(|l| *l > 0),
            offset,
        }
    }

    /// Effective row cap; a zero limit set directly on the field is unbounded too
    pub fn max_rows(&self) -> Option<usize> {
        self.limit.filter(|l| *l > 0)
    }

    pub fn all() -> Self {
        Self::default()
    }
}

/// Outcome of a bulk broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BroadcastSummary {
    /// Users for whom a notification was persisted.
    pub success_count: usize,
    /// Users for whom creation failed.
    pub error_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_defaults_to_general() {
        assert_eq!(normalize_type(None), "general");
        assert_eq!(normalize_type(Some("")), "general");
        assert_eq!(normalize_type(Some("   ")), "general");
        assert_eq!(normalize_type(Some("info")), "info");
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        assert_eq!(Page::new(Some(0), 3), Page::new(None, 3));
        assert_eq!(Page::new(Some(5), 0).max_rows(), Some(5));

        let raw = Page {
            limit: Some(0),
            offset: 0,
        };
        assert_eq!(raw.max_rows(), None);
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let notification = NewNotification::new(7, "Club approved", "approval").into_notification(1);

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["type"], "approval");
        assert_eq!(json["is_read"], false);
        assert!(json.get("notification_type").is_none());
    }
}
