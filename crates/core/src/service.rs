// Notification service
//
// The single entry point the rest of the system calls into. Composes the
// record store, the user directory, the client registry and the broadcaster.
// Persistence is the only hard failure path for a valid trigger; live push is
// best effort and never surfaces an error.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::broadcaster::Broadcaster;
use crate::config::NotifyConfig;
use crate::delivery::{DeliveryOutcome, FrameSink, SessionDeliveryLoop};
use crate::error::{NotifyError, Result};
use crate::notification::{
    normalize_type, BroadcastSummary, NewNotification, Notification, NotificationId, Page, UserId,
};
use crate::registry::{ClientRegistry, SessionId, SessionQueue};
use crate::traits::{NotificationStore, UserDirectory};

/// A freshly registered session, ready to be driven by a delivery loop
#[derive(Debug)]
pub struct SessionSubscription {
    pub session_id: SessionId,
    pub queue: SessionQueue,
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    config: NotifyConfig,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        config: NotifyConfig,
    ) -> Self {
        let registry = Arc::new(ClientRegistry::new(config.queue_capacity));
        Self {
            store,
            users,
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    // ============================================
    // Creation and broadcast
    // ============================================

    /// Persist a notification for `user_id` and push it to the user's live sessions.
    ///
    /// An empty `notification_type` defaults to `"general"`.
    pub async fn create_and_notify(
        &self,
        user_id: UserId,
        message: &str,
        notification_type: &str,
    ) -> Result<Notification> {
        validate_user_id(user_id)?;
        if message.is_empty() {
            return Err(NotifyError::validation("message cannot be empty"));
        }
        let notification_type = normalize_type(Some(notification_type));

        self.ensure_user_exists(user_id).await?;

        let notification = self
            .store
            .create(NewNotification::new(user_id, message, notification_type))
            .await?;

        let report = self.broadcaster.push(user_id, notification.clone());
        tracing::info!(
            user_id,
            notification_id = notification.id,
            notification_type = %notification.notification_type,
            live_sessions = report.sessions,
            delivered = report.delivered,
            "Notification created"
        );

        Ok(notification)
    }

    /// Create the same notification for every known user.
    ///
    /// Per-user failures are counted, not raised. Only an invalid message or a
    /// failure to enumerate users fails the whole call.
    pub async fn broadcast_to_all_users(
        &self,
        message: &str,
        notification_type: &str,
    ) -> Result<BroadcastSummary> {
        if message.is_empty() {
            return Err(NotifyError::validation("message cannot be empty"));
        }

        let user_ids = self.users.list_user_ids().await?;
        Ok(self
            .broadcast_to_users(&user_ids, message, notification_type)
            .await)
    }

    /// Create the same notification for each of `user_ids`, isolating failures
    pub async fn broadcast_to_users(
        &self,
        user_ids: &[UserId],
        message: &str,
        notification_type: &str,
    ) -> BroadcastSummary {
        let mut summary = BroadcastSummary::default();

        for &user_id in user_ids {
            match self
                .create_and_notify(user_id, message, notification_type)
                .await
            {
                Ok(_) => summary.success_count += 1,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Failed to create notification for user");
                    summary.error_count += 1;
                }
            }
        }

        tracing::info!(
            success_count = summary.success_count,
            error_count = summary.error_count,
            "Broadcast notification completed"
        );
        summary
    }

    // ============================================
    // Read state
    // ============================================

    /// Mark one notification read. Marking an already-read row succeeds.
    pub async fn mark_read(&self, notification_id: NotificationId) -> Result<()> {
        if notification_id <= 0 {
            return Err(NotifyError::validation("invalid notification id"));
        }

        if !self.store.set_read(notification_id).await? {
            return Err(NotifyError::not_found(format!(
                "notification with ID {notification_id} not found"
            )));
        }
        Ok(())
    }

    /// Mark every unread notification of a user read; returns rows changed
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        validate_user_id(user_id)?;
        self.ensure_user_exists(user_id).await?;

        let affected = self.store.set_all_read_for_user(user_id).await?;
        tracing::info!(user_id, affected, "Marked notifications as read");
        Ok(affected)
    }

    // ============================================
    // Pull recovery
    // ============================================

    /// A user's notifications, most recent first
    pub async fn list_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Notification>> {
        validate_user_id(user_id)?;
        self.store.list_by_user(user_id, page).await
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<u64> {
        validate_user_id(user_id)?;
        self.store.count_unread(user_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Notification>> {
        self.store.list_all().await
    }

    // ============================================
    // Live sessions
    // ============================================

    /// Register a live session for an existing user
    pub async fn open_session(&self, user_id: UserId) -> Result<SessionSubscription> {
        validate_user_id(user_id)?;
        self.ensure_user_exists(user_id).await?;

        let (session_id, queue) = self.registry.register(user_id);
        Ok(SessionSubscription { session_id, queue })
    }

    /// Drive a subscription on its own task until the transport closes
    pub fn spawn_delivery<S>(
        &self,
        subscription: SessionSubscription,
        sink: S,
    ) -> JoinHandle<DeliveryOutcome>
    where
        S: FrameSink + 'static,
    {
        SessionDeliveryLoop::new(
            subscription.queue,
            self.registry.clone(),
            self.config.heartbeat_interval,
        )
        .spawn(sink)
    }

    /// Unregister a session. Unknown ids are ignored.
    pub fn close_session(&self, session_id: &SessionId) -> bool {
        self.registry.unregister(session_id)
    }

    pub fn live_sessions(&self, user_id: UserId) -> usize {
        self.registry.user_session_count(user_id)
    }

    /// Release every live session so delivery loops terminate
    pub fn shutdown(&self) -> usize {
        let released = self.registry.clear();
        tracing::info!(released, "Notification service shut down");
        released
    }

    async fn ensure_user_exists(&self, user_id: UserId) -> Result<()> {
        if !self.users.exists(user_id).await? {
            return Err(NotifyError::not_found(format!(
                "user with ID {user_id} not found"
            )));
        }
        Ok(())
    }
}

fn validate_user_id(user_id: UserId) -> Result<()> {
    if user_id <= 0 {
        return Err(NotifyError::validation(format!("invalid user id: {user_id}")));
    }
    Ok(())
}
