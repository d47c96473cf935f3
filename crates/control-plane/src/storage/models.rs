// Database models (internal, may differ from public DTOs)

use campus_notify_core::{NewNotification, Notification};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

// ============================================
// Users (owned by the surrounding system)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ============================================
// Notifications
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub notification_type: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotificationRow {
    pub user_id: i64,
    pub message: String,
    pub notification_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<NewNotification> for CreateNotificationRow {
    fn from(input: NewNotification) -> Self {
        Self {
            user_id: input.user_id,
            message: input.message,
            notification_type: input.notification_type,
            created_at: input.created_at,
        }
    }
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            message: row.message,
            notification_type: row.notification_type,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}
