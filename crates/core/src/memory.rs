// In-memory implementations for tests and dev mode
//
// These implementations keep all data in memory, making them suitable for:
// - Unit and integration tests
// - Running the control plane without a database (dev mode)
//
// Decision: Use parking_lot for thread-safe access (no lock is held across an await)

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{NotifyError, Result};
use crate::notification::{NewNotification, Notification, NotificationId, Page, UserId};
use crate::traits::{NotificationStore, UserDirectory};
use crate::user::User;

// ============================================================================
// InMemoryNotificationStore
// ============================================================================

#[derive(Debug, Default)]
struct StoreInner {
    rows: BTreeMap<NotificationId, Notification>,
    last_id: NotificationId,
}

/// In-memory notification store
///
/// Ids are assigned from a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    inner: RwLock<StoreInner>,
    fail_writes: AtomicBool,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail with a store error (for tests)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted rows
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sorted_newest_first(mut rows: Vec<Notification>) -> Vec<Notification> {
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, input: NewNotification) -> Result<Notification> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(NotifyError::store("failed to create notification: store unavailable"));
        }

        let mut inner = self.inner.write();
        inner.last_id += 1;
        let row = input.into_notification(inner.last_id);
        inner.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_by_user(&self, user_id: UserId, page: Page) -> Result<Vec<Notification>> {
        let rows: Vec<_> = self
            .inner
            .read()
            .rows
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();

        let rows = Self::sorted_newest_first(rows)
            .into_iter()
            .skip(page.offset)
            .take(page.max_rows().unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }

    async fn set_read(&self, id: NotificationId) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.rows.get_mut(&id) {
            Some(row) => {
                row.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_all_read_for_user(&self, user_id: UserId) -> Result<u64> {
        let mut inner = self.inner.write();
        let mut affected = 0;
        for row in inner
            .rows
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            row.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn count_unread(&self, user_id: UserId) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .rows
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn list_all(&self) -> Result<Vec<Notification>> {
        let rows = self.inner.read().rows.values().cloned().collect();
        Ok(Self::sorted_newest_first(rows))
    }
}

// ============================================================================
// InMemoryUserDirectory
// ============================================================================

/// In-memory user directory
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<UserId, User>>,
    /// Ids reported by `list_user_ids` without being resolvable (for tests)
    phantom_ids: RwLock<BTreeSet<UserId>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with the given user ids
    pub fn with_users(ids: impl IntoIterator<Item = UserId>) -> Self {
        let directory = Self::new();
        for id in ids {
            directory.add_user(id, format!("user-{id}"));
        }
        directory
    }

    pub fn add_user(&self, id: UserId, name: impl Into<String>) -> User {
        let user = User {
            id,
            name: name.into(),
            created_at: Utc::now(),
        };
        self.users.write().insert(id, user.clone());
        user
    }

    pub fn remove_user(&self, id: UserId) -> bool {
        self.users.write().remove(&id).is_some()
    }

    /// Enumerate an id that does not resolve on lookup, simulating a stale
    /// directory listing
    pub fn add_phantom_id(&self, id: UserId) {
        self.phantom_ids.write().insert(id);
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.read().get(&id).cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self.users.read().contains_key(&user_id))
    }

    async fn list_user_ids(&self) -> Result<Vec<UserId>> {
        let mut ids: BTreeSet<UserId> = self.users.read().keys().copied().collect();
        ids.extend(self.phantom_ids.read().iter().copied());
        Ok(ids.into_iter().collect())
    }
}
