// Session delivery loop
//
// One task per open connection. The loop waits on three sources at once:
// the session queue, a heartbeat timer and the transport reporting closure.
// Whichever becomes ready first wins; there is no polling.
//
// State machine: Open -> Closing -> Closed. Closing unregisters the session
// exactly once; Closed is terminal.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::notification::Notification;
use crate::registry::{ClientRegistry, SessionId, SessionQueue};

/// SSE event name for notification frames
pub const NOTIFICATION_EVENT: &str = "notification";

/// SSE event name for heartbeat frames
pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// A serialized frame ready to be handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: &'static str,
    pub data: String,
}

impl Frame {
    pub fn notification(notification: &Notification) -> serde_json::Result<Self> {
        Ok(Self {
            event: NOTIFICATION_EVENT,
            data: serde_json::to_string(notification)?,
        })
    }

    pub fn heartbeat() -> Self {
        Self {
            event: HEARTBEAT_EVENT,
            data: r#"{"type":"heartbeat"}"#.to_string(),
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        self.event == HEARTBEAT_EVENT
    }
}

/// The transport is gone; no further frames can be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

// ============================================================================
// FrameSink - Transport abstraction
// ============================================================================

/// Where a delivery loop writes frames.
///
/// Implementations wrap the actual network connection (SSE response body,
/// websocket, test channel).
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Hand a frame to the transport
    async fn send(&self, frame: Frame) -> Result<(), SinkClosed>;

    /// Resolves once the remote end has gone away
    async fn closed(&self);
}

/// Sink backed by a bounded channel whose receiver feeds the transport
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver the transport should drain
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&self, frame: Frame) -> Result<(), SinkClosed> {
        self.tx.send(frame).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

// ============================================================================
// SessionDeliveryLoop
// ============================================================================

/// Lifecycle of a delivery session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// What ended a delivery session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client disconnected or the transport rejected a frame
    TransportClosed,
    /// The registry released the session (explicit close or server shutdown)
    QueueReleased,
}

/// Summary returned when a delivery loop finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub session_id: SessionId,
    pub reason: CloseReason,
    pub state: SessionState,
    pub notifications_sent: usize,
    pub heartbeats_sent: usize,
}

/// Drains one session's queue into its transport
pub struct SessionDeliveryLoop {
    session_id: SessionId,
    queue: SessionQueue,
    registry: Arc<ClientRegistry>,
    heartbeat_interval: Duration,
    state: SessionState,
    notifications_sent: usize,
    heartbeats_sent: usize,
}

impl SessionDeliveryLoop {
    pub fn new(
        queue: SessionQueue,
        registry: Arc<ClientRegistry>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            session_id: queue.session_id(),
            queue,
            registry,
            // interval_at rejects a zero period
            heartbeat_interval: heartbeat_interval.max(Duration::from_millis(1)),
            state: SessionState::Open,
            notifications_sent: 0,
            heartbeats_sent: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the loop on a dedicated task
    pub fn spawn<S>(self, sink: S) -> JoinHandle<DeliveryOutcome>
    where
        S: FrameSink + 'static,
    {
        tokio::spawn(self.run(sink))
    }

    /// Deliver until the transport closes or the session is released
    pub async fn run<S: FrameSink>(mut self, sink: S) -> DeliveryOutcome {
        let mut heartbeat = interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(session_id = %self.session_id, "Delivery loop started");

        let reason = loop {
            tokio::select! {
                payload = self.queue.recv() => {
                    let Some(notification) = payload else {
                        break CloseReason::QueueReleased;
                    };
                    let frame = match Frame::notification(&notification) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(
                                session_id = %self.session_id,
                                notification_id = notification.id,
                                error = %e,
                                "Failed to serialize notification; skipping"
                            );
                            continue;
                        }
                    };
                    if sink.send(frame).await.is_err() {
                        break CloseReason::TransportClosed;
                    }
                    self.notifications_sent += 1;
                }
                _ = heartbeat.tick() => {
                    if sink.send(Frame::heartbeat()).await.is_err() {
                        break CloseReason::TransportClosed;
                    }
                    self.heartbeats_sent += 1;
                }
                _ = sink.closed() => {
                    break CloseReason::TransportClosed;
                }
            }
        };

        self.close(reason)
    }

    fn close(mut self, reason: CloseReason) -> DeliveryOutcome {
        self.state = SessionState::Closing;
        self.queue.close();
        self.registry.unregister(&self.session_id);
        self.state = SessionState::Closed;

        tracing::info!(
            session_id = %self.session_id,
            reason = ?reason,
            notifications_sent = self.notifications_sent,
            heartbeats_sent = self.heartbeats_sent,
            "Delivery session closed"
        );

        DeliveryOutcome {
            session_id: self.session_id,
            reason,
            state: self.state,
            notifications_sent: self.notifications_sent,
            heartbeats_sent: self.heartbeats_sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::Broadcaster;
    use crate::notification::NewNotification;

    fn setup(user_id: i64) -> (Arc<ClientRegistry>, SessionDeliveryLoop) {
        let registry = Arc::new(ClientRegistry::default());
        let (_id, queue) = registry.register(user_id);
        let delivery = SessionDeliveryLoop::new(queue, registry.clone(), Duration::from_secs(30));
        (registry, delivery)
    }

    #[tokio::test]
    async fn test_forwards_queued_notifications_in_order() {
        let (registry, delivery) = setup(1);
        let broadcaster = Broadcaster::new(registry.clone());
        let (sink, mut frames) = ChannelSink::channel(8);
        let handle = delivery.spawn(sink);

        for (i, msg) in ["first", "second"].iter().enumerate() {
            let n = NewNotification::new(1, *msg, "info").into_notification(i as i64 + 1);
            broadcaster.push(1, n);
        }

        for expected in ["first", "second"] {
            let frame = frames.recv().await.unwrap();
            assert_eq!(frame.event, NOTIFICATION_EVENT);
            let value: serde_json::Value = serde_json::from_str(&frame.data).unwrap();
            assert_eq!(value["message"], expected);
            assert_eq!(value["type"], "info");
        }

        drop(frames);
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.reason, CloseReason::TransportClosed);
        assert_eq!(outcome.notifications_sent, 2);
    }

    #[tokio::test]
    async fn test_transport_close_unregisters_once() {
        let (registry, delivery) = setup(2);
        let session_id = delivery.session_id();
        assert_eq!(delivery.state(), SessionState::Open);

        let (sink, frames) = ChannelSink::channel(1);
        drop(frames);

        let outcome = delivery.run(sink).await;
        assert_eq!(outcome.state, SessionState::Closed);
        assert_eq!(outcome.reason, CloseReason::TransportClosed);
        assert!(!registry.contains(&session_id));
        assert!(!registry.unregister(&session_id));
    }

    #[tokio::test]
    async fn test_registry_release_ends_loop() {
        let (registry, delivery) = setup(3);
        let (sink, _frames) = ChannelSink::channel(1);
        let handle = delivery.spawn(sink);

        registry.clear();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.reason, CloseReason::QueueReleased);
        assert_eq!(outcome.state, SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_sends_heartbeat() {
        let (_registry, delivery) = setup(4);
        let (sink, mut frames) = ChannelSink::channel(4);
        let _handle = delivery.spawn(sink);

        let started = Instant::now();
        let frame = frames.recv().await.unwrap();

        assert!(frame.is_heartbeat());
        assert_eq!(frame.data, r#"{"type":"heartbeat"}"#);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
