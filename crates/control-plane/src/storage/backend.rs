// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage, and
// implements the core NotificationStore and UserDirectory traits for both.

use anyhow::Result;
use async_trait::async_trait;
use campus_notify_core::memory::{InMemoryNotificationStore, InMemoryUserDirectory};
use campus_notify_core::{
    NewNotification, Notification, NotificationId, NotificationStore, NotifyError, Page,
    UserDirectory, UserId,
};
use std::sync::Arc;

use super::models::CreateNotificationRow;
use super::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory storage (dev mode)
    InMemory {
        notifications: Arc<InMemoryNotificationStore>,
        users: Arc<InMemoryUserDirectory>,
    },
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL and apply migrations
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.migrate().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory {
            notifications: Arc::new(InMemoryNotificationStore::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
        }
    }

    /// Create an in-memory backend with users `1..=count` already present
    pub fn in_memory_seeded(count: i64) -> Self {
        let backend = Self::in_memory();
        if let Self::InMemory { users, .. } = &backend {
            for id in 1..=count {
                users.add_user(id, format!("Dev User {id}"));
            }
        }
        backend
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory { .. })
    }
}

fn store_error(e: anyhow::Error) -> NotifyError {
    NotifyError::store(format!("{e:#}"))
}

fn page_bounds(page: Page) -> (Option<i64>, i64) {
    let limit = page.max_rows().map(|l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);
    (limit, offset)
}

#[async_trait]
impl NotificationStore for StorageBackend {
    async fn create(&self, input: NewNotification) -> campus_notify_core::Result<Notification> {
        match self {
            Self::Postgres(db) => db
                .create_notification(CreateNotificationRow::from(input))
                .await
                .map(Notification::from)
                .map_err(store_error),
            Self::InMemory { notifications, .. } => notifications.create(input).await,
        }
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> campus_notify_core::Result<Vec<Notification>> {
        match self {
            Self::Postgres(db) => {
                let (limit, offset) = page_bounds(page);
                let rows = db
                    .list_notifications_by_user(user_id, limit, offset)
                    .await
                    .map_err(store_error)?;
                Ok(rows.into_iter().map(Notification::from).collect())
            }
            Self::InMemory { notifications, .. } => {
                notifications.list_by_user(user_id, page).await
            }
        }
    }

    async fn set_read(&self, id: NotificationId) -> campus_notify_core::Result<bool> {
        match self {
            Self::Postgres(db) => db.mark_notification_read(id).await.map_err(store_error),
            Self::InMemory { notifications, .. } => notifications.set_read(id).await,
        }
    }

    async fn set_all_read_for_user(&self, user_id: UserId) -> campus_notify_core::Result<u64> {
        match self {
            Self::Postgres(db) => db
                .mark_all_notifications_read(user_id)
                .await
                .map_err(store_error),
            Self::InMemory { notifications, .. } => {
                notifications.set_all_read_for_user(user_id).await
            }
        }
    }

    async fn count_unread(&self, user_id: UserId) -> campus_notify_core::Result<u64> {
        match self {
            Self::Postgres(db) => db
                .count_unread_notifications(user_id)
                .await
                .map_err(store_error),
            Self::InMemory { notifications, .. } => notifications.count_unread(user_id).await,
        }
    }

    async fn list_all(&self) -> campus_notify_core::Result<Vec<Notification>> {
        match self {
            Self::Postgres(db) => {
                let rows = db.list_notifications().await.map_err(store_error)?;
                Ok(rows.into_iter().map(Notification::from).collect())
            }
            Self::InMemory { notifications, .. } => notifications.list_all().await,
        }
    }
}

#[async_trait]
impl UserDirectory for StorageBackend {
    async fn exists(&self, user_id: UserId) -> campus_notify_core::Result<bool> {
        match self {
            Self::Postgres(db) => db
                .get_user(user_id)
                .await
                .map(|row| row.is_some())
                .map_err(store_error),
            Self::InMemory { users, .. } => users.exists(user_id).await,
        }
    }

    async fn list_user_ids(&self) -> campus_notify_core::Result<Vec<UserId>> {
        match self {
            Self::Postgres(db) => db.list_user_ids().await.map_err(store_error),
            Self::InMemory { users, .. } => users.list_user_ids().await,
        }
    }
}
