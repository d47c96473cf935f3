// Client registry
//
// Authoritative table of live delivery sessions. Each session belongs to one
// user and owns a bounded FIFO queue. Registration and deregistration take the
// write lock; lookups for broadcast take the read lock so concurrent pushes
// never serialize against each other.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::broadcaster::DeliveryMiss;
use crate::config::DEFAULT_QUEUE_CAPACITY;
use crate::notification::{Notification, UserId};

/// Payload carried by session queues. Shared between all of a user's sessions.
pub type Payload = Arc<Notification>;

/// Identity of a live session: the owning user plus a registration nonce.
///
/// Nonces come from a per-registry monotonic counter, so ids are never reused
/// while the process lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId {
    user_id: UserId,
    nonce: u64,
}

impl SessionId {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user_id, self.nonce)
    }
}

/// Receiving half of a session's queue, owned by the session's delivery loop.
#[derive(Debug)]
pub struct SessionQueue {
    session_id: SessionId,
    rx: mpsc::Receiver<Payload>,
}

impl SessionQueue {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Wait for the next payload. Returns `None` once the session has been
    /// released by the registry and the queue is drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Take a pending payload without waiting
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }

    /// Refuse further writes. Payloads already queued stay readable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Sending half of a session's queue, as handed out by lookups.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<Payload>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Enqueue without waiting. A full or closed queue is reported, not awaited.
    pub fn try_deliver(&self, payload: &Payload) -> Result<(), DeliveryMiss> {
        match self.tx.try_send(Arc::clone(payload)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryMiss::QueueFull),
            Err(TrySendError::Closed(_)) => Err(DeliveryMiss::SessionClosed),
        }
    }
}

/// Concurrently-safe table of live sessions
pub struct ClientRegistry {
    sessions: RwLock<HashMap<SessionId, mpsc::Sender<Payload>>>,
    next_nonce: AtomicU64,
    queue_capacity: usize,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl ClientRegistry {
    /// Create a registry whose sessions buffer at most `queue_capacity` payloads
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_nonce: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Register a new session for `user_id`.
    ///
    /// The caller is responsible for having verified that the user exists.
    pub fn register(&self, user_id: UserId) -> (SessionId, SessionQueue) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let session_id = SessionId {
            user_id,
            nonce: self.next_nonce.fetch_add(1, Ordering::Relaxed),
        };

        let live = {
            let mut sessions = self.sessions.write();
            sessions.insert(session_id, tx);
            sessions.len()
        };

        tracing::info!(session_id = %session_id, user_id, live, "Client registered");
        (session_id, SessionQueue { session_id, rx })
    }

    /// Remove a session and release its queue.
    ///
    /// Returns false if the session was not registered; that is not an error,
    /// since transport close and explicit client requests may race.
    pub fn unregister(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(session_id);
        match removed {
            Some(tx) => {
                drop(tx);
                tracing::info!(session_id = %session_id, "Client unregistered");
                true
            }
            None => {
                tracing::debug!(session_id = %session_id, "Unregister for unknown session ignored");
                false
            }
        }
    }

    /// Snapshot of every live session belonging to `user_id`
    pub fn sessions_for_user(&self, user_id: UserId) -> Vec<SessionHandle> {
        self.sessions
            .read()
            .iter()
            .filter(|(id, _)| id.user_id == user_id)
            .map(|(id, tx)| SessionHandle {
                session_id: *id,
                tx: tx.clone(),
            })
            .collect()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Number of live sessions across all users
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Number of live sessions for one user
    pub fn user_session_count(&self, user_id: UserId) -> usize {
        self.sessions
            .read()
            .keys()
            .filter(|id| id.user_id == user_id)
            .count()
    }

    /// Release every session. Delivery loops observe their queues terminate.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.sessions.write().drain().collect();
        let count = drained.len();
        drop(drained);
        tracing::info!(released = count, "Client registry cleared");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NewNotification;

    fn payload(user_id: UserId, message: &str) -> Payload {
        Arc::new(NewNotification::new(user_id, message, "general").into_notification(1))
    }

    #[test]
    fn test_register_generates_unique_ids() {
        let registry = ClientRegistry::default();

        let (a, _qa) = registry.register(42);
        let (b, _qb) = registry.register(42);

        assert_ne!(a, b);
        assert_eq!(a.user_id(), 42);
        assert!(a.to_string().starts_with("42_"));
        assert_eq!(registry.user_session_count(42), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ClientRegistry::default();
        let (a, _qa) = registry.register(1);
        let (b, _qb) = registry.register(1);

        assert!(registry.unregister(&a));
        assert!(!registry.unregister(&a));
        assert!(registry.contains(&b));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_unregister_unknown_session_does_not_affect_others() {
        let registry = ClientRegistry::default();
        let other = ClientRegistry::default();
        let (foreign, _q) = other.register(5);
        let (mine, _qm) = registry.register(5);

        assert!(!registry.unregister(&foreign));
        assert!(registry.contains(&mine));
    }

    #[test]
    fn test_sessions_for_user_filters_by_user() {
        let registry = ClientRegistry::default();
        let (a, _qa) = registry.register(1);
        let (_b, _qb) = registry.register(2);

        let handles = registry.sessions_for_user(1);
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].session_id(), a);
        assert!(registry.sessions_for_user(3).is_empty());
    }

    #[tokio::test]
    async fn test_unregister_terminates_queue_after_drain() {
        let registry = ClientRegistry::default();
        let (id, mut queue) = registry.register(9);

        let handle = registry.sessions_for_user(9).pop().unwrap();
        handle.try_deliver(&payload(9, "pending")).unwrap();
        drop(handle);

        registry.unregister(&id);

        assert_eq!(queue.recv().await.unwrap().message, "pending");
        assert!(queue.recv().await.is_none());
    }

    #[test]
    fn test_try_deliver_reports_full_and_closed() {
        let registry = ClientRegistry::new(1);
        let (_id, mut queue) = registry.register(3);
        let handle = registry.sessions_for_user(3).pop().unwrap();

        assert!(handle.try_deliver(&payload(3, "one")).is_ok());
        assert_eq!(
            handle.try_deliver(&payload(3, "two")),
            Err(DeliveryMiss::QueueFull)
        );

        queue.close();
        assert_eq!(
            handle.try_deliver(&payload(3, "three")),
            Err(DeliveryMiss::SessionClosed)
        );
    }

    #[tokio::test]
    async fn test_clear_releases_every_session() {
        let registry = ClientRegistry::default();
        let (_a, mut qa) = registry.register(1);
        let (_b, mut qb) = registry.register(2);

        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.session_count(), 0);
        assert!(qa.recv().await.is_none());
        assert!(qb.recv().await.is_none());
    }
}
