// Delivery broadcaster
//
// Offers a persisted notification to every live session of its owner.
// Enqueue is strictly non-blocking: a full queue drops the payload for that
// session only. The record store remains the source of truth, so a dropped
// push is recovered on the client's next pull.

use std::fmt;
use std::sync::Arc;

use crate::notification::{Notification, UserId};
use crate::registry::{ClientRegistry, Payload};

/// Why a push did not reach a particular session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMiss {
    /// The session's queue was at capacity
    QueueFull,
    /// The session's reader was already gone
    SessionClosed,
}

impl fmt::Display for DeliveryMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMiss::QueueFull => write!(f, "queue full"),
            DeliveryMiss::SessionClosed => write!(f, "session closed"),
        }
    }
}

/// Per-push accounting, used for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Sessions registered for the user at push time
    pub sessions: usize,
    /// Sessions whose queue accepted the payload
    pub delivered: usize,
    /// Sessions that missed the payload
    pub dropped: usize,
    /// Sessions found with no reader and removed from the registry
    pub pruned: usize,
}

/// Fans notifications out to live sessions
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Push `notification` to every live session of `user_id`.
    ///
    /// Never waits and never fails; misses are logged and counted.
    pub fn push(&self, user_id: UserId, notification: Notification) -> DeliveryReport {
        let payload: Payload = Arc::new(notification);
        let handles = self.registry.sessions_for_user(user_id);

        let mut report = DeliveryReport {
            sessions: handles.len(),
            ..Default::default()
        };

        if handles.is_empty() {
            tracing::debug!(
                user_id,
                notification_id = payload.id,
                "No live sessions for user; notification available on next pull"
            );
            return report;
        }

        for handle in &handles {
            match handle.try_deliver(&payload) {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!(
                        session_id = %handle.session_id(),
                        notification_id = payload.id,
                        "Notification queued for session"
                    );
                }
                Err(miss) => {
                    report.dropped += 1;
                    tracing::info!(
                        session_id = %handle.session_id(),
                        notification_id = payload.id,
                        reason = %miss,
                        "Delivery miss; skipping session"
                    );
                    // Nobody will ever read this queue again
                    if miss == DeliveryMiss::SessionClosed
                        && self.registry.unregister(&handle.session_id())
                    {
                        report.pruned += 1;
                    }
                }
            }
        }

        report
    }
}
