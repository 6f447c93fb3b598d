//! Polling monitors: snapshot diffing, the shared monitor registry, per-key poll
//! loops, and the time-boxed feed cache the loops write into.

pub mod cache;
pub mod diff;
pub mod event;
pub mod poller;
pub mod registry;

use std::time::Duration;

pub use cache::{CacheEntry, FeedCache};
pub use diff::{dedupe, diff, SnapshotDiff};
pub use event::{ChangeEvent, ChannelListener, FeedListener, ListenerError, ListenerFailure, ListenerSet};
pub use poller::{run_monitor, spawn_monitor, PollSchedule, PollTarget};
pub use registry::{MonitorRegistry, MonitorTicket};

/// Timing shared by a controller's cache and its monitors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    /// Sleep per active monitor between poll cycles
    pub base_delay: Duration,
    /// How long a cached snapshot is served before a read refetches
    pub freshness: Duration,
}

impl MonitorSettings {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1500);
    pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(15);
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            base_delay: Self::DEFAULT_BASE_DELAY,
            freshness: Self::DEFAULT_FRESHNESS,
        }
    }
}
