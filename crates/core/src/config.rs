// Delivery configuration

use std::time::Duration;

/// Default number of pending notifications a session may buffer.
/// Kept small so an abandoned session cannot hide a disconnect.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default heartbeat cadence for open sessions.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Tunables for live delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Capacity of each session's outbound queue
    pub queue_capacity: usize,
    /// Interval between heartbeat frames on an idle session
    pub heartbeat_interval: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl NotifyConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `NOTIFY_QUEUE_CAPACITY`: per-session queue slots (default: 10)
    /// - `NOTIFY_HEARTBEAT_SECS`: heartbeat interval in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_capacity: std::env::var("NOTIFY_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.queue_capacity),
            heartbeat_interval: std::env::var("NOTIFY_HEARTBEAT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}
