// Notification Delivery Core
//
// This crate provides a storage-agnostic implementation of real-time
// notification delivery: persist a notification, then push it to every live
// session of its owner, falling back to pull-based retrieval.
//
// Key design decisions:
// - Uses traits (NotificationStore, UserDirectory) for pluggable backends
// - The client registry is the only shared mutable state (RwLock split read/write)
// - Fan-out is non-blocking: a full session queue drops the push for that session
// - One delivery loop task per open session, multiplexing queue, heartbeat and close
// - The service is constructed explicitly and shared via Arc (no global instance)

// Domain entity types
pub mod notification;
pub mod user;

pub mod broadcaster;
pub mod config;
pub mod delivery;
pub mod error;
pub mod registry;
pub mod service;
pub mod traits;

// Telemetry (tracing subscriber with optional OTLP export)
pub mod telemetry;

// In-memory implementations for tests and dev mode
pub mod memory;

// Re-exports for convenience
pub use broadcaster::{Broadcaster, DeliveryMiss, DeliveryReport};
pub use config::NotifyConfig;
pub use delivery::{
    ChannelSink, CloseReason, DeliveryOutcome, Frame, FrameSink, SessionDeliveryLoop,
    SessionState, SinkClosed,
};
pub use error::{NotifyError, Result};
pub use notification::{
    BroadcastSummary, NewNotification, Notification, NotificationId, Page, UserId,
    DEFAULT_NOTIFICATION_TYPE,
};
pub use registry::{ClientRegistry, Payload, SessionHandle, SessionId, SessionQueue};
pub use service::{NotificationService, SessionSubscription};
pub use traits::{NotificationStore, UserDirectory};
pub use user::User;
